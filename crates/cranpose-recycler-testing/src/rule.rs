use cranpose_recycler::{
    Holder, HolderId, ItemAnimator, ItemBounds, LayoutReport, RecyclerConfig, RecyclerError,
    RecyclerHost, SharedPool,
};

use crate::animator::RecordingAnimator;
use crate::arrangement::LinearArrangement;
use crate::data::{TestDataSource, TestView};

/// Headless harness for driving a [`RecyclerHost`] in tests.
///
/// The rule owns a host together with its collaborators: a
/// [`TestDataSource`], a [`LinearArrangement`] and optionally a
/// [`RecordingAnimator`]. Edit helpers change the data and notify the host in
/// one step; [`layout`](Self::layout) runs a pass.
pub struct RecyclerTestRule {
    host: RecyclerHost<TestView>,
    data: TestDataSource,
    arrangement: LinearArrangement,
    animator: Option<RecordingAnimator>,
}

impl RecyclerTestRule {
    /// `count` items, 10 units tall, in a viewport showing five of them.
    pub fn new(count: usize) -> Self {
        Self::with_parts(
            TestDataSource::new(count),
            LinearArrangement::new(10, 50),
            RecyclerConfig::default(),
            SharedPool::default(),
        )
    }

    pub fn with_parts(
        data: TestDataSource,
        arrangement: LinearArrangement,
        config: RecyclerConfig,
        pool: SharedPool<TestView>,
    ) -> Self {
        Self {
            host: RecyclerHost::new(config, pool),
            data,
            arrangement,
            animator: None,
        }
    }

    pub fn with_animator(mut self, animator: RecordingAnimator) -> Self {
        self.animator = Some(animator);
        self
    }

    pub fn host(&self) -> &RecyclerHost<TestView> {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut RecyclerHost<TestView> {
        &mut self.host
    }

    pub fn data(&self) -> &TestDataSource {
        &self.data
    }

    pub fn arrangement(&self) -> &LinearArrangement {
        &self.arrangement
    }

    pub fn arrangement_mut(&mut self) -> &mut LinearArrangement {
        &mut self.arrangement
    }

    pub fn animator(&self) -> Option<&RecordingAnimator> {
        self.animator.as_ref()
    }

    pub fn animator_mut(&mut self) -> Option<&mut RecordingAnimator> {
        self.animator.as_mut()
    }

    /// Runs one reconciliation pass.
    pub fn layout(&mut self) -> Result<LayoutReport, RecyclerError> {
        let animator = self
            .animator
            .as_mut()
            .map(|animator| animator as &mut dyn ItemAnimator<TestView>);
        let report = self
            .host
            .dispatch_layout(&self.data, &mut self.arrangement, animator)?;
        log::debug!(
            "pass classified {} holders, rebound {}",
            report.dispositions.len(),
            report.rebound.len()
        );
        Ok(report)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Edits
    // ─────────────────────────────────────────────────────────────────────

    pub fn insert(&mut self, position: usize, count: usize) -> Result<Vec<u64>, RecyclerError> {
        let ids = self.data.insert(position, count);
        self.host.notify_item_range_inserted(position, count)?;
        Ok(ids)
    }

    pub fn remove(&mut self, position: usize, count: usize) -> Result<(), RecyclerError> {
        self.data.remove(position, count);
        self.host.notify_item_range_removed(position, count)?;
        Ok(())
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), RecyclerError> {
        self.data.move_item(from, to);
        self.host.notify_item_moved(from, to)?;
        Ok(())
    }

    pub fn change(&mut self, position: usize, count: usize) -> Result<(), RecyclerError> {
        self.data.change(position, count);
        self.host.notify_item_range_changed(position, count)?;
        Ok(())
    }

    /// Applies `edit` to the data and reports a full data-set change.
    pub fn reset(&mut self, edit: impl FnOnce(&mut TestDataSource)) -> Result<(), RecyclerError> {
        edit(&mut self.data);
        self.host.notify_data_set_changed()?;
        Ok(())
    }

    /// Swaps in a new data source. Holders bound to the old one are recycled
    /// through it first.
    pub fn replace_data(&mut self, data: TestDataSource) -> Result<TestDataSource, RecyclerError> {
        let animator = self
            .animator
            .as_mut()
            .map(|animator| animator as &mut dyn ItemAnimator<TestView>);
        self.host
            .on_data_source_changed(&self.data, &mut self.arrangement, animator)?;
        Ok(std::mem::replace(&mut self.data, data))
    }

    pub fn scroll_to(&mut self, position: usize) -> Result<(), RecyclerError> {
        self.host.scroll_to_position(position)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Animations
    // ─────────────────────────────────────────────────────────────────────

    /// Ends and acknowledges every running animation.
    pub fn finish_animations(&mut self) {
        if let Some(animator) = self.animator.as_mut() {
            self.host.end_animations(animator, &self.data);
        }
    }

    /// Ends and acknowledges the animation running on `id`, if any.
    pub fn finish_animation(&mut self, id: HolderId) -> Result<bool, RecyclerError> {
        match self.animator.as_mut() {
            Some(animator) => self.host.end_animation(id, animator, &self.data),
            None => Ok(false),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    pub fn holder(&self, id: HolderId) -> Option<&Holder<TestView>> {
        self.host.recycler().holder(id)
    }

    /// Labels of the attached holders in child order. Unbound holders show
    /// as `"?"`.
    pub fn attached_labels(&self) -> Vec<String> {
        self.host
            .recycler()
            .attached()
            .iter()
            .map(|id| {
                self.holder(*id)
                    .and_then(|holder| holder.view().label())
                    .unwrap_or_else(|| "?".to_string())
            })
            .collect()
    }

    /// Attached holder currently showing the item with `item_id`.
    pub fn holder_for_item(&self, item_id: u64) -> Option<HolderId> {
        let recycler = self.host.recycler();
        recycler.attached().iter().copied().find(|id| {
            recycler
                .holder(*id)
                .and_then(|holder| holder.view().bound.as_ref())
                .is_some_and(|item| item.id == item_id)
        })
    }

    pub fn bounds_of(&self, id: HolderId) -> Option<ItemBounds> {
        self.holder(id).map(Holder::bounds)
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `RecyclerTestRule` over `count` items.
pub fn run_test_recycler<R>(count: usize, f: impl FnOnce(&mut RecyclerTestRule) -> R) -> R {
    let mut rule = RecyclerTestRule::new(count);
    f(&mut rule)
}

#[cfg(test)]
#[path = "tests/rule_tests.rs"]
mod tests;
