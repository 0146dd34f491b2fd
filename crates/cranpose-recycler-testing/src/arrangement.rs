use cranpose_recycler::{
    ArrangementPolicy, Holder, HolderId, ItemBounds, LayoutPhase, LayoutScope, RecyclerError,
    UpdateOp,
};

/// Vertical list of equally tall items.
///
/// Lays out items from `first_visible` until the viewport is filled. During a
/// predictive pre-layout, removed items are laid out at their old place but do
/// not use up viewport space, so the items that will scroll in are laid out
/// too. After a predictive final layout, items still in scrap are laid out
/// below or above the viewport as disappearing views.
#[derive(Debug)]
pub struct LinearArrangement {
    item_extent: i32,
    viewport_extent: i32,
    width: i32,
    first_visible: usize,
    predictive: bool,
    phases: Vec<LayoutPhase>,
    dispatched: Vec<UpdateOp>,
    items_changed: usize,
}

impl LinearArrangement {
    pub fn new(item_extent: i32, viewport_extent: i32) -> Self {
        Self {
            item_extent,
            viewport_extent,
            width: 100,
            first_visible: 0,
            predictive: true,
            phases: Vec::new(),
            dispatched: Vec::new(),
            items_changed: 0,
        }
    }

    pub fn without_predictive_animations(mut self) -> Self {
        self.predictive = false;
        self
    }

    pub fn first_visible(&self) -> usize {
        self.first_visible
    }

    pub fn set_first_visible(&mut self, position: usize) {
        self.first_visible = position;
    }

    /// Phases this arrangement was asked to lay out, oldest first.
    pub fn phases(&self) -> &[LayoutPhase] {
        &self.phases
    }

    /// Ops reported through `on_update_dispatched`, oldest first.
    pub fn dispatched(&self) -> &[UpdateOp] {
        &self.dispatched
    }

    pub fn items_changed_count(&self) -> usize {
        self.items_changed
    }

    /// Bounds of the slot `offset` items below the first visible one.
    pub fn slot(&self, offset: i32) -> ItemBounds {
        let top = offset * self.item_extent;
        ItemBounds::new(0, top, self.width, top + self.item_extent)
    }

    fn fill<V>(&mut self, scope: &mut LayoutScope<'_, V>) -> Result<(), RecyclerError> {
        let in_pre_layout = scope.is_pre_layout();
        let item_count = scope.item_count();
        let mut position = self.first_visible;
        let mut offset = 0;
        let mut consumed = 0;
        while consumed < self.viewport_extent && position < item_count {
            let id = scope.resolve(position)?;
            scope.add_view(id)?;
            scope.layout(id, self.slot(offset))?;
            let removed = scope.holder(id).is_some_and(Holder::is_removed);
            if !(in_pre_layout && removed) {
                consumed += self.item_extent;
            }
            offset += 1;
            position += 1;
        }
        Ok(())
    }

    fn layout_disappearing<V>(&mut self, scope: &mut LayoutScope<'_, V>) -> Result<(), RecyclerError> {
        let mut leftovers: Vec<(usize, HolderId)> = scope
            .scrap_list()
            .iter()
            .filter_map(|id| {
                let holder = scope.holder(*id)?;
                if holder.is_removed() {
                    return None;
                }
                Some((holder.position()?, *id))
            })
            .collect();
        leftovers.sort_unstable();
        for (position, id) in leftovers {
            let offset = position as i32 - self.first_visible as i32;
            scope.add_disappearing_view(id)?;
            scope.layout(id, self.slot(offset))?;
        }
        Ok(())
    }
}

impl<V> ArrangementPolicy<V> for LinearArrangement {
    fn on_layout_children(&mut self, scope: &mut LayoutScope<'_, V>) -> Result<(), RecyclerError> {
        self.phases.push(scope.state().phase());
        if let Some(target) = scope.state().target_scroll_position() {
            self.first_visible = target;
        }
        let item_count = scope.item_count();
        if self.first_visible >= item_count {
            self.first_visible = item_count.saturating_sub(1);
        }
        log::debug!(
            "linear layout {:?} from {} of {item_count}",
            scope.state().phase(),
            self.first_visible
        );

        scope.detach_and_scrap_attached()?;
        self.fill(scope)?;
        if !scope.is_pre_layout() && scope.state().will_run_predictive_animations() {
            self.layout_disappearing(scope)?;
        }
        Ok(())
    }

    fn supports_predictive_item_animations(&self) -> bool {
        self.predictive
    }

    fn on_update_dispatched(&mut self, op: UpdateOp) {
        self.dispatched.push(op);
    }

    fn on_items_changed(&mut self) {
        self.items_changed += 1;
    }

    fn on_data_source_changed(&mut self) {
        self.first_visible = 0;
    }
}
