use crate::error::RecyclerError;
use crate::scope::LayoutScope;
use crate::update_op::UpdateOp;

/// Positions holders inside the viewport.
///
/// The policy only ever sees a [`LayoutScope`], which exposes holder
/// resolution and attachment but no way to post new edits while a pass runs.
pub trait ArrangementPolicy<V> {
    /// Lays out the children for the current phase. Called once during the
    /// predictive pre-layout, if any, and once for the final layout.
    fn on_layout_children(&mut self, scope: &mut LayoutScope<'_, V>) -> Result<(), RecyclerError>;

    fn supports_predictive_item_animations(&self) -> bool {
        false
    }

    /// An edit is now reflected in holder positions.
    fn on_update_dispatched(&mut self, op: UpdateOp) {
        let _ = op;
    }

    /// The whole data set was reported as changed.
    fn on_items_changed(&mut self) {}

    fn on_data_source_changed(&mut self) {}
}
