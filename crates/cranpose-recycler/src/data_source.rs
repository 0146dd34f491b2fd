use crate::holder::{Holder, ViewType};

/// Supplies items and builds their display objects.
///
/// Methods take `&self`; the data source is passed to each recycler call that
/// needs it and is never retained.
pub trait DataSource<V> {
    fn item_count(&self) -> usize;

    fn view_type(&self, position: usize) -> ViewType {
        let _ = position;
        0
    }

    /// Whether `stable_id` identifies items across data-set changes.
    fn has_stable_ids(&self) -> bool {
        false
    }

    fn stable_id(&self, position: usize) -> Option<u64> {
        let _ = position;
        None
    }

    fn create_view(&self, view_type: ViewType) -> V;

    /// Writes the item at `position` into `holder`. Position, stable id and
    /// the bound flag are already updated when this runs.
    fn bind(&self, holder: &mut Holder<V>, position: usize);

    /// Called right before a holder enters the pool.
    fn on_view_recycled(&self, holder: &mut Holder<V>) {
        let _ = holder;
    }
}
