//! Per-pass state shared between the recycler and the arrangement policy.

use crate::collections::map::HashMap;
use crate::holder::{HolderId, ItemBounds};

/// Where a reconciliation pass currently is.
///
/// `Idle -> PreLayout -> Draining -> FinalLayout -> Dispatch -> Idle`; passes
/// without a predictive pre-layout skip straight to `Draining`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LayoutPhase {
    #[default]
    Idle,
    /// Arrangement runs against the pre-edit coordinate space.
    PreLayout,
    /// Postponed edits are being applied.
    Draining,
    /// Arrangement runs against the post-edit coordinate space.
    FinalLayout,
    /// Dispositions are being classified and handed to the animator.
    Dispatch,
}

/// Insertion-ordered map from holder to the bounds it had when captured.
#[derive(Debug, Default)]
pub(crate) struct HolderInfoMap {
    order: Vec<HolderId>,
    bounds: HashMap<HolderId, ItemBounds>,
}

impl HolderInfoMap {
    pub(crate) fn insert(&mut self, id: HolderId, bounds: ItemBounds) {
        if self.bounds.insert(id, bounds).is_none() {
            self.order.push(id);
        }
    }

    pub(crate) fn remove(&mut self, id: HolderId) -> Option<ItemBounds> {
        let bounds = self.bounds.remove(&id)?;
        self.order.retain(|entry| *entry != id);
        Some(bounds)
    }

    pub(crate) fn get(&self, id: HolderId) -> Option<ItemBounds> {
        self.bounds.get(&id).copied()
    }

    pub(crate) fn contains(&self, id: HolderId) -> bool {
        self.bounds.contains_key(&id)
    }

    pub(crate) fn ids(&self) -> &[HolderId] {
        &self.order
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.bounds.clear();
    }
}

/// Snapshot of a pass handed to the arrangement policy.
#[derive(Debug, Default)]
pub struct LayoutState {
    pub(crate) phase: LayoutPhase,
    pub(crate) item_count: usize,
    pub(crate) previous_layout_item_count: usize,
    pub(crate) deleted_invisible_item_count: usize,
    pub(crate) structure_changed: bool,
    pub(crate) run_simple_animations: bool,
    pub(crate) run_predictive_animations: bool,
    pub(crate) target_position: Option<usize>,
    pub(crate) pre_layout: HolderInfoMap,
    pub(crate) post_layout: HolderInfoMap,
}

impl LayoutState {
    pub fn phase(&self) -> LayoutPhase {
        self.phase
    }

    pub fn is_pre_layout(&self) -> bool {
        self.phase == LayoutPhase::PreLayout
    }

    pub fn is_running(&self) -> bool {
        self.phase != LayoutPhase::Idle
    }

    /// Number of items the arrangement may lay out in the current phase.
    ///
    /// During pre-layout this is the previous count minus the items removed
    /// without ever being displayed, which keeps pre-layout positions aligned
    /// with the old arrangement.
    pub fn item_count(&self) -> usize {
        if self.is_pre_layout() {
            self.previous_layout_item_count
                .saturating_sub(self.deleted_invisible_item_count)
        } else {
            self.item_count
        }
    }

    pub fn did_structure_change(&self) -> bool {
        self.structure_changed
    }

    pub fn will_run_simple_animations(&self) -> bool {
        self.run_simple_animations
    }

    pub fn will_run_predictive_animations(&self) -> bool {
        self.run_predictive_animations
    }

    /// Position the arrangement was asked to bring into view, if any.
    pub fn target_scroll_position(&self) -> Option<usize> {
        self.target_position
    }

    pub(crate) fn remove_from_layout_maps(&mut self, id: HolderId) {
        self.pre_layout.remove(id);
        self.post_layout.remove(id);
    }
}
