//! Holders detached for the duration of one reconciliation pass.
//!
//! Scrap is where the arrangement policy parks everything it detached before
//! laying out again. Unchanged holders can be handed back for the same
//! position without rebinding; changed holders are kept apart so the old
//! content survives for a change animation while a replacement is bound.

use crate::holder::HolderId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScrapGroup {
    Unchanged,
    Changed,
}

#[derive(Debug, Default, Clone)]
pub struct ScrapSet {
    unchanged: Vec<HolderId>,
    changed: Vec<HolderId>,
}

impl ScrapSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(&self, group: ScrapGroup) -> &[HolderId] {
        match group {
            ScrapGroup::Unchanged => &self.unchanged,
            ScrapGroup::Changed => &self.changed,
        }
    }

    pub fn unchanged(&self) -> &[HolderId] {
        &self.unchanged
    }

    pub fn changed(&self) -> &[HolderId] {
        &self.changed
    }

    pub fn len(&self) -> usize {
        self.unchanged.len() + self.changed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unchanged.is_empty() && self.changed.is_empty()
    }

    pub fn contains(&self, id: HolderId) -> bool {
        self.unchanged.contains(&id) || self.changed.contains(&id)
    }

    pub(crate) fn push(&mut self, id: HolderId, group: ScrapGroup) {
        self.group_mut(group).push(id);
    }

    pub(crate) fn remove(&mut self, id: HolderId, group: ScrapGroup) -> bool {
        let entries = self.group_mut(group);
        match entries.iter().position(|entry| *entry == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_group(&mut self, group: ScrapGroup) -> Vec<HolderId> {
        std::mem::take(self.group_mut(group))
    }

    fn group_mut(&mut self, group: ScrapGroup) -> &mut Vec<HolderId> {
        match group {
            ScrapGroup::Unchanged => &mut self.unchanged,
            ScrapGroup::Changed => &mut self.changed,
        }
    }
}
