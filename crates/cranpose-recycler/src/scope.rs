use crate::animator::ItemAnimator;
use crate::batcher::UpdateBatcher;
use crate::data_source::DataSource;
use crate::error::RecyclerError;
use crate::holder::{Holder, HolderId, ItemBounds};
use crate::recycler::Recycler;
use crate::state::LayoutState;

/// What the arrangement policy can do while it lays out one phase.
///
/// The scope borrows the recycler together with the collaborators of the
/// running pass, so everything the policy resolves is bound against the same
/// data source and coordinate space.
pub struct LayoutScope<'a, V> {
    recycler: &'a mut Recycler<V>,
    data: &'a dyn DataSource<V>,
    updates: &'a UpdateBatcher,
    animator: Option<&'a mut dyn ItemAnimator<V>>,
}

impl<'a, V> LayoutScope<'a, V> {
    pub(crate) fn new(
        recycler: &'a mut Recycler<V>,
        data: &'a dyn DataSource<V>,
        updates: &'a UpdateBatcher,
        animator: Option<&'a mut dyn ItemAnimator<V>>,
    ) -> Self {
        Self {
            recycler,
            data,
            updates,
            animator,
        }
    }

    pub fn state(&self) -> &LayoutState {
        self.recycler.state()
    }

    pub fn is_pre_layout(&self) -> bool {
        self.recycler.state().is_pre_layout()
    }

    /// Item count valid for the running phase.
    pub fn item_count(&self) -> usize {
        self.recycler.state().item_count()
    }

    pub fn holder(&self, id: HolderId) -> Option<&Holder<V>> {
        self.recycler.holder(id)
    }

    pub fn view_mut(&mut self, id: HolderId) -> Option<&mut V> {
        self.recycler.holder_mut(id).map(Holder::view_mut)
    }

    /// Displayed holders in child order.
    pub fn attached(&self) -> &[HolderId] {
        self.recycler.attached()
    }

    pub fn scrap_list(&self) -> &[HolderId] {
        self.recycler.scrap().unchanged()
    }

    pub fn find_holder_for_position(&self, position: usize) -> Option<HolderId> {
        self.recycler.find_holder_for_position(position)
    }

    pub fn find_holder_for_item_id(&self, item_id: u64) -> Option<HolderId> {
        self.recycler.find_holder_for_item_id(item_id)
    }

    /// Returns a holder bound to `position`, ready to be attached.
    pub fn resolve(&mut self, position: usize) -> Result<HolderId, RecyclerError> {
        self.recycler.resolve(
            position,
            false,
            self.data,
            self.updates,
            self.animator.as_deref_mut(),
        )
    }

    /// Like [`resolve`](Self::resolve) but leaves scrap and cache untouched.
    pub fn peek(&mut self, position: usize) -> Result<HolderId, RecyclerError> {
        self.recycler
            .resolve(position, true, self.data, self.updates, None)
    }

    pub fn bind_to_position(&mut self, id: HolderId, position: usize) -> Result<(), RecyclerError> {
        self.recycler
            .bind_to_position(id, position, self.data, self.updates)
    }

    pub fn add_view(&mut self, id: HolderId) -> Result<(), RecyclerError> {
        self.recycler.add_view(id, None, false)
    }

    pub fn add_view_at(&mut self, id: HolderId, index: usize) -> Result<(), RecyclerError> {
        self.recycler.add_view(id, Some(index), false)
    }

    /// Attaches a holder that is only laid out so it can animate away.
    pub fn add_disappearing_view(&mut self, id: HolderId) -> Result<(), RecyclerError> {
        self.recycler.add_view(id, None, true)
    }

    pub fn layout(&mut self, id: HolderId, bounds: ItemBounds) -> Result<(), RecyclerError> {
        self.recycler.set_bounds(id, bounds)
    }

    pub fn detach_and_scrap_attached(&mut self) -> Result<(), RecyclerError> {
        self.recycler.detach_and_scrap_attached(self.data)
    }

    pub fn detach_and_scrap(&mut self, id: HolderId) -> Result<(), RecyclerError> {
        self.recycler.scrap_holder(id, self.data)
    }

    pub fn remove_and_recycle(&mut self, id: HolderId) -> Result<(), RecyclerError> {
        self.recycler.remove_and_recycle(id, self.data)
    }

    /// Recycles a resolved holder that was never attached.
    pub fn recycle(&mut self, id: HolderId) -> Result<(), RecyclerError> {
        self.recycler.recycle(id, self.data)
    }

    pub fn ignore(&mut self, id: HolderId) -> Result<(), RecyclerError> {
        self.recycler.ignore(id)
    }

    pub fn stop_ignoring(&mut self, id: HolderId) -> Result<(), RecyclerError> {
        self.recycler.stop_ignoring(id)
    }
}
