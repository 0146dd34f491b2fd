use smallvec::SmallVec;

use crate::holder::{HolderId, ItemBounds};

/// How a holder takes part in the transition computed by a pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// New on screen with no known origin.
    Added { holder: HolderId },
    /// New on screen, sliding in from where the pre-layout placed it.
    Appearing {
        holder: HolderId,
        from: ItemBounds,
        to: ItemBounds,
    },
    /// Leaving the screen in place.
    Removed { holder: HolderId },
    /// Leaving the screen while sliding to where the final layout put it.
    Disappearing {
        holder: HolderId,
        from: ItemBounds,
        to: ItemBounds,
    },
    Moved {
        holder: HolderId,
        from: ItemBounds,
        to: ItemBounds,
    },
    /// On screen before and after, same place. No animation is requested.
    Persistent { holder: HolderId },
    /// Content changed; `old` hands over to `new`, if the item is still laid out.
    Changed {
        old: HolderId,
        new: Option<HolderId>,
    },
}

impl Disposition {
    pub fn holders(&self) -> SmallVec<[HolderId; 2]> {
        let mut holders = SmallVec::new();
        match *self {
            Disposition::Added { holder }
            | Disposition::Appearing { holder, .. }
            | Disposition::Removed { holder }
            | Disposition::Disappearing { holder, .. }
            | Disposition::Moved { holder, .. }
            | Disposition::Persistent { holder } => holders.push(holder),
            Disposition::Changed { old, new } => {
                holders.push(old);
                holders.extend(new);
            }
        }
        holders
    }
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub dispositions: Vec<Disposition>,
    /// Holders rebound in place after the final layout.
    pub rebound: Vec<HolderId>,
    pub ran_simple_animations: bool,
    pub ran_predictive_animations: bool,
}

impl LayoutReport {
    pub fn disposition_of(&self, id: HolderId) -> Option<&Disposition> {
        self.dispositions
            .iter()
            .find(|disposition| disposition.holders().contains(&id))
    }

    /// Number of dispositions mentioning `id`.
    pub fn count_for(&self, id: HolderId) -> usize {
        self.dispositions
            .iter()
            .filter(|disposition| disposition.holders().contains(&id))
            .count()
    }
}
