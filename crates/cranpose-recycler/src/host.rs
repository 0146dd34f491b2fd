//! Reconciliation passes for one display surface.
//!
//! # Architecture
//!
//! [`RecyclerHost`] owns the [`Recycler`] and the [`UpdateBatcher`] of a
//! surface. Edits are queued through the `notify_*` methods and take effect
//! in [`RecyclerHost::dispatch_layout`], which runs one pass:
//!
//! 1. Decide whether the pass animates, and whether it runs a predictive
//!    pre-layout.
//! 2. Snapshot the bounds of every displayed holder.
//! 3. Predictive passes apply edits the pre-layout may see, run the
//!    arrangement against the old coordinate space and then drain the
//!    postponed edits. Other passes apply every edit at once.
//! 4. Run the arrangement against the new coordinate space.
//! 5. Snapshot the bounds again and classify every holder into one
//!    [`Disposition`], asking the animator for the matching animation.
//! 6. Rebind stale holders and recycle what is left in scrap.
//!
//! Collaborators are borrowed for the duration of a call only.

use crate::animator::{AnimationKind, ItemAnimator};
use crate::arrangement::ArrangementPolicy;
use crate::batcher::UpdateBatcher;
use crate::collections::map::{HashMap, HashSet};
use crate::collections::IdBuffer;
use crate::config::RecyclerConfig;
use crate::data_source::DataSource;
use crate::disposition::{Disposition, LayoutReport};
use crate::error::RecyclerError;
use crate::holder::{Container, HolderFlags, HolderId, ItemBounds};
use crate::pool::SharedPool;
use crate::recycler::Recycler;
use crate::scope::LayoutScope;
use crate::scrap::ScrapGroup;
use crate::state::LayoutPhase;
use crate::update_op::{UpdateKind, UpdateOp};

/// Identity used to pair a changed holder with its replacement.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum ChangeKey {
    StableId(u64),
    Position(usize),
}

enum Consume {
    PreProcess,
    Postponed,
    OnePass,
}

pub struct RecyclerHost<V> {
    recycler: Recycler<V>,
    updates: UpdateBatcher,
    config: RecyclerConfig,
    data_set_changed: bool,
    first_layout_complete: bool,
}

impl<V> Default for RecyclerHost<V> {
    fn default() -> Self {
        Self::new(RecyclerConfig::default(), SharedPool::default())
    }
}

impl<V> RecyclerHost<V> {
    pub fn new(config: RecyclerConfig, pool: SharedPool<V>) -> Self {
        Self {
            recycler: Recycler::with_cache_size(pool, config.cache_size),
            updates: UpdateBatcher::new(),
            config,
            data_set_changed: false,
            first_layout_complete: false,
        }
    }

    pub fn recycler(&self) -> &Recycler<V> {
        &self.recycler
    }

    pub fn recycler_mut(&mut self) -> &mut Recycler<V> {
        &mut self.recycler
    }

    pub fn updates(&self) -> &UpdateBatcher {
        &self.updates
    }

    pub fn config(&self) -> &RecyclerConfig {
        &self.config
    }

    pub fn is_layout_running(&self) -> bool {
        self.recycler.state.is_running()
    }

    /// Whether the next pass has work to do.
    pub fn needs_layout(&self) -> bool {
        !self.first_layout_complete || self.data_set_changed || self.updates.has_pending_updates()
    }

    fn assert_not_in_layout(&self, reason: &'static str) -> Result<(), RecyclerError> {
        if self.is_layout_running() {
            return Err(RecyclerError::invalid_state(reason));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observer notifications
    // ─────────────────────────────────────────────────────────────────────

    /// Reports that nothing about the data set can be trusted anymore.
    /// Pending edits are dropped at the next pass.
    pub fn notify_data_set_changed(&mut self) -> Result<bool, RecyclerError> {
        self.assert_not_in_layout("cannot reset the data set while a layout pass is running")?;
        self.data_set_changed = true;
        self.recycler.state.structure_changed = true;
        Ok(true)
    }

    /// Each `notify_*` method returns whether the caller should schedule a pass.
    pub fn notify_item_range_inserted(&mut self, start: usize, count: usize) -> Result<bool, RecyclerError> {
        self.assert_not_in_layout("cannot insert items while a layout pass is running")?;
        Ok(self.updates.on_item_range_inserted(start, count))
    }

    pub fn notify_item_range_removed(&mut self, start: usize, count: usize) -> Result<bool, RecyclerError> {
        self.assert_not_in_layout("cannot remove items while a layout pass is running")?;
        Ok(self.updates.on_item_range_removed(start, count))
    }

    pub fn notify_item_range_changed(&mut self, start: usize, count: usize) -> Result<bool, RecyclerError> {
        self.assert_not_in_layout("cannot change items while a layout pass is running")?;
        Ok(self.updates.on_item_range_changed(start, count))
    }

    pub fn notify_item_moved(&mut self, from: usize, to: usize) -> Result<bool, RecyclerError> {
        self.assert_not_in_layout("cannot move items while a layout pass is running")?;
        Ok(self.updates.on_item_moved(from, to))
    }

    /// Asks the arrangement to bring `position` into view on the next pass.
    pub fn scroll_to_position(&mut self, position: usize) -> Result<(), RecyclerError> {
        self.assert_not_in_layout("cannot request a scroll while a layout pass is running")?;
        self.recycler.state.target_position = Some(position);
        Ok(())
    }

    pub fn set_cache_size(&mut self, max: usize, data: &dyn DataSource<V>) {
        self.config.cache_size = max;
        self.recycler.set_cache_size(max, data);
    }

    /// Replaces the data source.
    ///
    /// `data` is the outgoing data source; every holder bound against it is
    /// recycled through it before the arrangement and pool are told.
    pub fn on_data_source_changed(
        &mut self,
        data: &dyn DataSource<V>,
        arrangement: &mut dyn ArrangementPolicy<V>,
        animator: Option<&mut (dyn ItemAnimator<V> + '_)>,
    ) -> Result<(), RecyclerError> {
        self.assert_not_in_layout("cannot swap the data source while a layout pass is running")?;
        if let Some(animator) = animator {
            self.end_animations(animator, data);
        }
        self.recycler.remove_and_recycle_all(data);
        self.updates.reset();
        arrangement.on_data_source_changed();
        self.recycler
            .pool()
            .with_mut(|pool| pool.on_data_source_changed());
        self.recycler.mark_known_views_invalid(data);
        self.recycler.state.structure_changed = true;
        self.data_set_changed = true;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Animation acknowledgements
    // ─────────────────────────────────────────────────────────────────────

    /// Acknowledges the end of an animation requested by a pass.
    pub fn on_animation_finished(
        &mut self,
        id: HolderId,
        kind: AnimationKind,
        data: &dyn DataSource<V>,
    ) -> Result<(), RecyclerError> {
        self.recycler.finish_animation(id, kind, data)
    }

    /// Forces the animation of `id` to its end. Returns whether one was running.
    pub fn end_animation(
        &mut self,
        id: HolderId,
        animator: &mut (dyn ItemAnimator<V> + '_),
        data: &dyn DataSource<V>,
    ) -> Result<bool, RecyclerError> {
        match animator.end_animation(id) {
            Some(kind) => {
                self.recycler.finish_animation(id, kind, data)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn end_animations(&mut self, animator: &mut (dyn ItemAnimator<V> + '_), data: &dyn DataSource<V>) {
        for (id, kind) in animator.end_animations() {
            if let Err(err) = self.recycler.finish_animation(id, kind, data) {
                log::warn!("{err}");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reconciliation pass
    // ─────────────────────────────────────────────────────────────────────

    /// Runs one reconciliation pass.
    pub fn dispatch_layout(
        &mut self,
        data: &dyn DataSource<V>,
        arrangement: &mut dyn ArrangementPolicy<V>,
        animator: Option<&mut (dyn ItemAnimator<V> + '_)>,
    ) -> Result<LayoutReport, RecyclerError> {
        self.assert_not_in_layout("a layout pass is already running")?;
        let result = self.run_layout(data, arrangement, animator);
        if result.is_err() {
            self.recycler.state.phase = LayoutPhase::Idle;
            self.recycler.remove_and_recycle_scrap(data);
            self.recycler.state.pre_layout.clear();
            self.recycler.state.post_layout.clear();
            self.recycler.disappearing.clear();
        }
        result
    }

    fn run_layout(
        &mut self,
        data: &dyn DataSource<V>,
        arrangement: &mut dyn ArrangementPolicy<V>,
        mut animator: Option<&mut (dyn ItemAnimator<V> + '_)>,
    ) -> Result<LayoutReport, RecyclerError> {
        self.recycler.disappearing.clear();
        let supports_change_animations = animator
            .as_deref()
            .is_some_and(|animator| animator.supports_change_animations());
        self.recycler.supports_change_animations = supports_change_animations;
        let has_stable_ids = data.has_stable_ids();

        let pending = self.updates.pending();
        let items_added_or_removed = pending.iter().any(UpdateOp::is_structural);
        let items_changed = pending.iter().any(|op| op.kind() == UpdateKind::Update);
        let animation_type_supported =
            items_added_or_removed || (items_changed && supports_change_animations);
        let data_set_changed = self.data_set_changed;

        let run_simple = self.first_layout_complete
            && animator.is_some()
            && (data_set_changed || animation_type_supported)
            && (!data_set_changed || has_stable_ids);
        let run_predictive = run_simple
            && !data_set_changed
            && animation_type_supported
            && self.config.predictive_animations
            && arrangement.supports_predictive_item_animations();
        let track_changes = run_simple && items_changed && supports_change_animations;
        log::debug!(
            "layout pass: simple={run_simple} predictive={run_predictive} reset={data_set_changed}"
        );

        let state = &mut self.recycler.state;
        state.run_simple_animations = run_simple;
        state.run_predictive_animations = run_predictive;
        state.item_count = data.item_count();

        if data_set_changed {
            self.updates.reset();
            self.recycler.mark_known_views_invalid(data);
            arrangement.on_items_changed();
        }

        if run_simple {
            for id in self.recycler.attached().to_vec() {
                let Some(holder) = self.recycler.holder(id) else {
                    continue;
                };
                if holder.should_ignore() || (holder.is_invalid() && !has_stable_ids) {
                    continue;
                }
                let bounds = holder.bounds();
                self.recycler.state.pre_layout.insert(id, bounds);
            }
        }

        let mut old_changed = Vec::new();
        let mut appearing_origins: HashMap<HolderId, ItemBounds> = HashMap::default();
        if run_predictive {
            self.recycler.save_old_positions();
            self.consume_updates(Consume::PreProcess, data, arrangement);
            if track_changes {
                old_changed = self.collect_changed_holders(has_stable_ids);
            }

            self.recycler.state.phase = LayoutPhase::PreLayout;
            let structure_changed = self.recycler.state.structure_changed;
            self.recycler.state.structure_changed = false;
            {
                let mut scope = LayoutScope::new(
                    &mut self.recycler,
                    data,
                    &self.updates,
                    animator
                        .as_deref_mut()
                        .map(|animator| animator as &mut dyn ItemAnimator<V>),
                );
                arrangement.on_layout_children(&mut scope)?;
            }
            self.recycler.state.structure_changed = structure_changed;

            for &id in self.recycler.attached() {
                let Some(holder) = self.recycler.holder(id) else {
                    continue;
                };
                if !holder.should_ignore() && !self.recycler.state.pre_layout.contains(id) {
                    appearing_origins.insert(id, holder.bounds());
                }
            }

            self.recycler.state.phase = LayoutPhase::Draining;
            self.recycler.clear_old_positions();
            self.consume_updates(Consume::Postponed, data, arrangement);
        } else {
            self.recycler.state.phase = LayoutPhase::Draining;
            self.consume_updates(Consume::OnePass, data, arrangement);
            self.recycler.clear_old_positions();
            if track_changes {
                old_changed = self.collect_changed_holders(has_stable_ids);
            }
        }

        let state = &mut self.recycler.state;
        state.item_count = data.item_count();
        state.deleted_invisible_item_count = 0;
        state.phase = LayoutPhase::FinalLayout;
        {
            let mut scope = LayoutScope::new(
                &mut self.recycler,
                data,
                &self.updates,
                animator
                    .as_deref_mut()
                    .map(|animator| animator as &mut dyn ItemAnimator<V>),
            );
            arrangement.on_layout_children(&mut scope)?;
        }
        self.recycler.state.structure_changed = false;
        // Nothing can stay displayed once the data source is empty.
        if self.recycler.state.item_count == 0 && !self.recycler.attached().is_empty() {
            self.recycler.detach_and_scrap_attached(data)?;
        }

        let mut report = LayoutReport {
            ran_simple_animations: run_simple,
            ran_predictive_animations: run_predictive,
            ..LayoutReport::default()
        };

        match animator.as_deref_mut() {
            Some(animator) if run_simple => {
                self.recycler.state.phase = LayoutPhase::Dispatch;
                self.dispatch_animations(
                    animator,
                    &old_changed,
                    &appearing_origins,
                    has_stable_ids,
                    track_changes,
                    &mut report,
                );
            }
            _ => self.recycle_disappearing(data),
        }

        report.rebound = self.recycler.rebind_updated_holders(data);
        self.recycler.remove_and_recycle_scrap(data);
        self.clear_stale_change_flags();

        let state = &mut self.recycler.state;
        state.pre_layout.clear();
        state.post_layout.clear();
        state.previous_layout_item_count = state.item_count;
        state.deleted_invisible_item_count = 0;
        state.run_simple_animations = false;
        state.run_predictive_animations = false;
        state.target_position = None;
        state.phase = LayoutPhase::Idle;
        self.recycler.disappearing.clear();
        self.data_set_changed = false;
        self.first_layout_complete = true;
        Ok(report)
    }

    fn consume_updates(
        &mut self,
        mode: Consume,
        data: &dyn DataSource<V>,
        arrangement: &mut dyn ArrangementPolicy<V>,
    ) {
        let mut target = self.recycler.update_target(data);
        match mode {
            Consume::PreProcess => self.updates.pre_process(&mut target),
            Consume::Postponed => self.updates.consume_postponed(&mut target),
            Consume::OnePass => self.updates.consume_in_one_pass(&mut target),
        }
        for op in target.dispatched {
            arrangement.on_update_dispatched(op);
        }
    }

    fn change_key(has_stable_ids: bool, stable_id: Option<u64>, position: Option<usize>) -> Option<ChangeKey> {
        match (has_stable_ids, stable_id) {
            (true, Some(id)) => Some(ChangeKey::StableId(id)),
            _ => position.map(ChangeKey::Position),
        }
    }

    /// Displayed holders whose content changed. They leave the pre-layout
    /// snapshot so the change path classifies them instead.
    fn collect_changed_holders(&mut self, has_stable_ids: bool) -> Vec<(ChangeKey, HolderId)> {
        let mut changed = Vec::new();
        for id in self.recycler.attached().to_vec() {
            let Some(holder) = self.recycler.holder(id) else {
                continue;
            };
            if !holder.is_changed() || holder.is_removed() || holder.should_ignore() {
                continue;
            }
            let Some(key) = Self::change_key(has_stable_ids, holder.stable_id(), holder.position())
            else {
                continue;
            };
            changed.push((key, id));
            self.recycler.state.pre_layout.remove(id);
        }
        changed
    }

    fn dispatch_animations(
        &mut self,
        animator: &mut (dyn ItemAnimator<V> + '_),
        old_changed: &[(ChangeKey, HolderId)],
        appearing_origins: &HashMap<HolderId, ItemBounds>,
        has_stable_ids: bool,
        track_changes: bool,
        report: &mut LayoutReport,
    ) {
        let old_keys: HashSet<ChangeKey> = old_changed.iter().map(|(key, _)| *key).collect();
        let disappearing = std::mem::take(&mut self.recycler.disappearing);
        let mut new_changed: HashMap<ChangeKey, HolderId> = HashMap::default();
        for id in self.recycler.attached().to_vec() {
            let Some(holder) = self.recycler.holder(id) else {
                continue;
            };
            if holder.should_ignore() || disappearing.contains(&id) {
                continue;
            }
            let key = Self::change_key(has_stable_ids, holder.stable_id(), holder.position());
            match key {
                Some(key) if track_changes && old_keys.contains(&key) => {
                    new_changed.insert(key, id);
                }
                _ => {
                    let bounds = holder.bounds();
                    self.recycler.state.post_layout.insert(id, bounds);
                }
            }
        }

        let mut needs_run = false;

        // Holders laid out only so they can animate away.
        for id in disappearing {
            let Some(holder) = self.recycler.holder(id) else {
                continue;
            };
            let current = holder.bounds();
            let before = self.recycler.state.pre_layout.remove(id).unwrap_or(current);
            needs_run |= self.animate_disappearance(id, before, animator, report);
        }

        let pre_ids: IdBuffer = self.recycler.state.pre_layout.ids().iter().rev().copied().collect();
        for id in pre_ids {
            if self.recycler.state.post_layout.contains(id) {
                continue;
            }
            if let Some(before) = self.recycler.state.pre_layout.remove(id) {
                needs_run |= self.animate_disappearance(id, before, animator, report);
            }
        }

        let post_ids: IdBuffer = self.recycler.state.post_layout.ids().iter().rev().copied().collect();
        for id in post_ids {
            if self.recycler.state.pre_layout.contains(id) {
                continue;
            }
            self.recycler.state.post_layout.remove(id);
            needs_run |= self.animate_appearance(id, appearing_origins.get(&id).copied(), animator, report);
        }

        let persistent: IdBuffer = self.recycler.state.post_layout.ids().iter().copied().collect();
        for id in persistent {
            let state = &self.recycler.state;
            let (Some(from), Some(to)) = (state.pre_layout.get(id), state.post_layout.get(id)) else {
                continue;
            };
            let Some(holder) = self.recycler.holder_mut(id) else {
                continue;
            };
            if from.origin_differs(&to) {
                log::debug!("holder {id} moved from {from:?} to {to:?}");
                holder.set_is_recyclable(false);
                needs_run |= animator.animate_move(holder, from, to);
                report.dispositions.push(Disposition::Moved { holder: id, from, to });
            } else {
                report.dispositions.push(Disposition::Persistent { holder: id });
            }
        }

        let mut paired: HashSet<HolderId> = HashSet::default();
        for &(key, old) in old_changed {
            let eligible = self.recycler.holder(old).is_some_and(|h| {
                !h.should_ignore() && h.container() == Container::Scrap(ScrapGroup::Changed)
            });
            if !eligible {
                continue;
            }
            self.recycler.add_animating(old);
            let new = new_changed.get(&key).copied();
            if let Some(holder) = self.recycler.holder_mut(old) {
                holder.set_is_recyclable(false);
                holder.shadowing = new;
            }
            if let Some(new) = new {
                paired.insert(new);
                if let Some(holder) = self.recycler.holder_mut(new) {
                    holder.set_is_recyclable(false);
                    holder.shadowed = Some(old);
                }
            }
            log::debug!("holder {old} changed; replacement {new:?}");
            if let Some(old_holder) = self.recycler.holder(old) {
                let new_holder = new.and_then(|new| self.recycler.holder(new));
                needs_run |= animator.animate_change(old_holder, new_holder);
            }
            report.dispositions.push(Disposition::Changed { old, new });
        }
        // Replacements whose old holder could not animate are simply rebound in place.
        for (_, id) in new_changed {
            if !paired.contains(&id) {
                report.dispositions.push(Disposition::Persistent { holder: id });
            }
        }

        self.recycler.state.pre_layout.clear();
        self.recycler.state.post_layout.clear();
        if needs_run {
            animator.run_pending_animations();
        }
    }

    fn animate_disappearance(
        &mut self,
        id: HolderId,
        before: ItemBounds,
        animator: &mut (dyn ItemAnimator<V> + '_),
        report: &mut LayoutReport,
    ) -> bool {
        self.recycler.add_animating(id);
        let Some(holder) = self.recycler.holder_mut(id) else {
            return false;
        };
        let after = holder.bounds();
        holder.set_is_recyclable(false);
        if !holder.is_removed() && before.origin_differs(&after) {
            log::debug!("holder {id} disappearing from {before:?} to {after:?}");
            report.dispositions.push(Disposition::Disappearing {
                holder: id,
                from: before,
                to: after,
            });
            animator.animate_move(holder, before, after)
        } else {
            log::debug!("holder {id} removed");
            report.dispositions.push(Disposition::Removed { holder: id });
            animator.animate_remove(holder)
        }
    }

    fn animate_appearance(
        &mut self,
        id: HolderId,
        origin: Option<ItemBounds>,
        animator: &mut (dyn ItemAnimator<V> + '_),
        report: &mut LayoutReport,
    ) -> bool {
        let Some(holder) = self.recycler.holder_mut(id) else {
            return false;
        };
        let after = holder.bounds();
        holder.set_is_recyclable(false);
        match origin {
            Some(before) if !holder.is_removed() && before.origin_differs(&after) => {
                log::debug!("holder {id} appearing from {before:?} to {after:?}");
                report.dispositions.push(Disposition::Appearing {
                    holder: id,
                    from: before,
                    to: after,
                });
                animator.animate_move(holder, before, after)
            }
            _ => {
                log::debug!("holder {id} added");
                report.dispositions.push(Disposition::Added { holder: id });
                animator.animate_add(holder)
            }
        }
    }

    /// Without animations, holders attached only to disappear go straight back.
    fn recycle_disappearing(&mut self, data: &dyn DataSource<V>) {
        for id in std::mem::take(&mut self.recycler.disappearing) {
            if self
                .recycler
                .holder(id)
                .is_some_and(|h| h.container() == Container::Attached)
            {
                if let Err(err) = self.recycler.remove_and_recycle(id, data) {
                    log::warn!("{err}");
                }
            }
        }
    }

    fn clear_stale_change_flags(&mut self) {
        for id in self.recycler.attached().to_vec() {
            if let Some(holder) = self.recycler.holder_mut(id) {
                if holder.shadowed.is_none() && holder.shadowing.is_none() {
                    holder.clear_flags(HolderFlags::CHANGED);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod tests;
