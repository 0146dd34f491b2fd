//! Queue of structural edits waiting for the next reconciliation pass.
//!
//! # Architecture
//!
//! Notifications are appended to `pending`, merging with the previous op when
//! the two describe one contiguous edit. When a pass starts the queue is
//! consumed in one of two ways:
//!
//! - [`consume_in_one_pass`](UpdateBatcher::consume_in_one_pass) applies every
//!   op to holder positions and forwards it to the target in order.
//! - [`pre_process`](UpdateBatcher::pre_process) splits the queue for a
//!   predictive pass. Moves are first pushed behind the removals and updates
//!   that follow them. Removals and updates of items nobody displays are then
//!   pulled in front of everything postponed so far, rewritten into the old
//!   coordinate space and dispatched immediately. Everything else is applied
//!   to the post-layout positions only and postponed until
//!   [`consume_postponed`](UpdateBatcher::consume_postponed), so the
//!   pre-layout still sees the old arrangement. While postponed ops remain,
//!   [`find_position_offset`](UpdateBatcher::find_position_offset) maps a
//!   pre-layout position to the data source's current index.

use smallvec::SmallVec;

use crate::update_op::UpdateOp;

/// Receiver of consumed ops. The recycler implements this to move its holders.
pub trait UpdateTarget {
    /// Whether any displayed, non-removed holder sits in `[start, start + count)`.
    fn has_attached_holder_in_range(&self, start: usize, count: usize) -> bool;

    fn offset_positions_for_insert(&mut self, start: usize, count: usize);

    /// Removes `[start, start + count)` from holder positions. With
    /// `pre_layout_start`, the same items sit at that index in the old
    /// coordinate space and are removed from it too.
    fn offset_positions_for_remove(&mut self, start: usize, count: usize, pre_layout_start: Option<usize>);

    fn offset_positions_for_move(&mut self, from: usize, to: usize);

    fn mark_range_updated(&mut self, start: usize, count: usize);

    /// The op is now reflected in holder positions; forward it to the arrangement.
    fn dispatch(&mut self, op: UpdateOp);
}

enum Coalesced {
    Merged(UpdateOp),
    Absorbed,
}

fn coalesce(last: UpdateOp, next: UpdateOp) -> Option<Coalesced> {
    match (last, next) {
        (
            UpdateOp::Insert { start, count },
            UpdateOp::Insert {
                start: next_start,
                count: next_count,
            },
        ) if start <= next_start && next_start <= start + count => {
            Some(Coalesced::Merged(UpdateOp::Insert {
                start,
                count: count + next_count,
            }))
        }
        (
            UpdateOp::Remove { start, count },
            UpdateOp::Remove {
                start: next_start,
                count: next_count,
            },
        ) => {
            if next_start == start {
                Some(Coalesced::Merged(UpdateOp::Remove {
                    start,
                    count: count + next_count,
                }))
            } else if next_start + next_count == start {
                Some(Coalesced::Merged(UpdateOp::Remove {
                    start: next_start,
                    count: count + next_count,
                }))
            } else {
                None
            }
        }
        (
            UpdateOp::Update { start, count },
            UpdateOp::Update {
                start: next_start,
                count: next_count,
            },
        ) if next_start <= start + count && start <= next_start + next_count => {
            let merged_start = start.min(next_start);
            let merged_end = (start + count).max(next_start + next_count);
            Some(Coalesced::Merged(UpdateOp::Update {
                start: merged_start,
                count: merged_end - merged_start,
            }))
        }
        // Freshly inserted items are bound from scratch anyway.
        (
            UpdateOp::Insert { start, count },
            UpdateOp::Update {
                start: next_start,
                count: next_count,
            },
        ) if start <= next_start && next_start + next_count <= start + count => {
            Some(Coalesced::Absorbed)
        }
        _ => None,
    }
}

type Runs = SmallVec<[(usize, usize); 2]>;

/// Appends one item at `position` to `runs`, growing the last run when
/// `extends(run_start, run_count)` holds.
fn push_run(runs: &mut Runs, position: usize, extends: impl Fn(usize, usize) -> bool) {
    match runs.last_mut() {
        Some((start, count)) if extends(*start, *count) => *count += 1,
        _ => runs.push((position, 1)),
    }
}

/// Moves the removal of the item at `position` behind `ops` in front of
/// them and rewrites them to match. Returns the item's index ahead of `ops`.
fn pull_removal(ops: &mut [UpdateOp], position: usize) -> usize {
    let mut after = position;
    for op in ops.iter_mut().rev() {
        let before = op.unmap_position(after).unwrap_or(after);
        *op = op.without_item(before, after);
        after = before;
    }
    after
}

/// Rewrites `first, second` as ops with the same combined effect that apply
/// `second` ahead of the move.
fn swap_move(first: UpdateOp, second: UpdateOp) -> SmallVec<[UpdateOp; 3]> {
    let mut moved = first;
    let mut ops: SmallVec<[UpdateOp; 3]> = SmallVec::new();
    match second {
        UpdateOp::Remove { start, count } => {
            let mut runs = Runs::new();
            for _ in 0..count {
                let before = pull_removal(std::slice::from_mut(&mut moved), start);
                push_run(&mut runs, before, |run_start, _| run_start == before);
            }
            ops.extend(runs.into_iter().map(|(start, count)| UpdateOp::Remove { start, count }));
        }
        UpdateOp::Update { start, count } => {
            let mut runs = Runs::new();
            for position in start..start + count {
                let before = moved.unmap_position(position).unwrap_or(position);
                push_run(&mut runs, before, |run_start, run_count| run_start + run_count == before);
            }
            ops.extend(runs.into_iter().map(|(start, count)| UpdateOp::Update { start, count }));
        }
        _ => {
            ops.push(first);
            ops.push(second);
            return ops;
        }
    }
    if !moved.is_noop() {
        ops.push(moved);
    }
    ops
}

/// Pushes every move behind the removals and updates queued after it.
fn reorder_moves(ops: &mut Vec<UpdateOp>) {
    while let Some(index) = ops.windows(2).rposition(|pair| {
        matches!(pair[0], UpdateOp::Move { .. })
            && matches!(pair[1], UpdateOp::Remove { .. } | UpdateOp::Update { .. })
    }) {
        let swapped = swap_move(ops[index], ops[index + 1]);
        ops.splice(index..index + 2, swapped);
    }
}

#[derive(Debug, Default)]
pub struct UpdateBatcher {
    pending: Vec<UpdateOp>,
    postponed: Vec<UpdateOp>,
}

impl UpdateBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ops waiting for the next pass, in arrival order.
    pub fn pending(&self) -> &[UpdateOp] {
        &self.pending
    }

    pub fn postponed(&self) -> &[UpdateOp] {
        &self.postponed
    }

    pub fn has_pending_updates(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns `true` when the op is the first one queued, meaning the caller
    /// should schedule a pass.
    pub fn on_item_range_inserted(&mut self, start: usize, count: usize) -> bool {
        count > 0 && self.push(UpdateOp::Insert { start, count })
    }

    pub fn on_item_range_removed(&mut self, start: usize, count: usize) -> bool {
        count > 0 && self.push(UpdateOp::Remove { start, count })
    }

    pub fn on_item_range_changed(&mut self, start: usize, count: usize) -> bool {
        count > 0 && self.push(UpdateOp::Update { start, count })
    }

    pub fn on_item_moved(&mut self, from: usize, to: usize) -> bool {
        from != to && self.push(UpdateOp::Move { from, to })
    }

    fn push(&mut self, op: UpdateOp) -> bool {
        if let Some(last) = self.pending.last_mut() {
            match coalesce(*last, op) {
                Some(Coalesced::Merged(merged)) => {
                    *last = merged;
                    return false;
                }
                Some(Coalesced::Absorbed) => return false,
                None => {}
            }
        }
        self.pending.push(op);
        self.pending.len() == 1
    }

    /// Drops every queued and postponed op. Used on full data-set resets.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.postponed.clear();
    }

    /// Splits the pending queue for a predictive pass.
    pub fn pre_process(&mut self, target: &mut impl UpdateTarget) {
        let mut ops = std::mem::take(&mut self.pending);
        reorder_moves(&mut ops);
        for op in ops {
            match op {
                UpdateOp::Insert { start, count } => {
                    target.offset_positions_for_insert(start, count);
                    self.postponed.push(op);
                }
                UpdateOp::Move { from, to } => {
                    target.offset_positions_for_move(from, to);
                    self.postponed.push(op);
                }
                UpdateOp::Remove { start, count } => {
                    // Right to left, so each run keeps the start it had in the op.
                    for (start, count, eager) in self.eager_runs(target, start, count).into_iter().rev() {
                        if eager {
                            self.dispatch_removal_first(target, start, count);
                        } else {
                            target.offset_positions_for_remove(start, count, None);
                            self.postponed.push(UpdateOp::Remove { start, count });
                        }
                    }
                }
                UpdateOp::Update { start, count } => {
                    target.mark_range_updated(start, count);
                    for (start, count, eager) in self.eager_runs(target, start, count) {
                        if eager {
                            self.dispatch_update_first(target, start, count);
                        } else {
                            self.postponed.push(UpdateOp::Update { start, count });
                        }
                    }
                }
            }
        }
    }

    /// Splits `[start, start + count)` into maximal runs of items that can and
    /// cannot be dispatched ahead of the postponed ops, as `(start, count, eager)`.
    /// An item qualifies when nobody displays it and it existed before the
    /// postponed ops.
    fn eager_runs(
        &self,
        target: &impl UpdateTarget,
        start: usize,
        count: usize,
    ) -> SmallVec<[(usize, usize, bool); 4]> {
        let mut runs: SmallVec<[(usize, usize, bool); 4]> = SmallVec::new();
        for position in start..start + count {
            let eager = !target.has_attached_holder_in_range(position, 1)
                && self.pre_layout_position(position).is_some();
            match runs.last_mut() {
                Some((_, run_count, run_eager)) if *run_eager == eager => *run_count += 1,
                _ => runs.push((position, 1, eager)),
            }
        }
        runs
    }

    /// Index of the item now at `position` before the postponed ops.
    fn pre_layout_position(&self, position: usize) -> Option<usize> {
        self.postponed
            .iter()
            .rev()
            .try_fold(position, |position, op| op.unmap_position(position))
    }

    fn dispatch_removal_first(&mut self, target: &mut impl UpdateTarget, start: usize, count: usize) {
        let mut runs = Runs::new();
        for _ in 0..count {
            let before = pull_removal(&mut self.postponed, start);
            push_run(&mut runs, before, |run_start, _| run_start == before);
        }
        self.postponed.retain(|op| !op.is_noop());
        for (before, count) in runs {
            log::trace!("removal of {count} unseen items at {start} dispatched at {before}");
            target.offset_positions_for_remove(start, count, Some(before));
            target.dispatch(UpdateOp::Remove { start: before, count });
        }
    }

    fn dispatch_update_first(&mut self, target: &mut impl UpdateTarget, start: usize, count: usize) {
        let mut runs = Runs::new();
        for position in start..start + count {
            let before = self.pre_layout_position(position).unwrap_or(position);
            push_run(&mut runs, before, |run_start, run_count| run_start + run_count == before);
        }
        for (before, count) in runs {
            target.dispatch(UpdateOp::Update { start: before, count });
        }
    }

    /// Forwards the ops held back by [`pre_process`](Self::pre_process).
    pub fn consume_postponed(&mut self, target: &mut impl UpdateTarget) {
        for op in self.postponed.drain(..) {
            target.dispatch(op);
        }
    }

    /// Applies every pending op without a pre-layout.
    pub fn consume_in_one_pass(&mut self, target: &mut impl UpdateTarget) {
        self.consume_postponed(target);
        for op in std::mem::take(&mut self.pending) {
            match op {
                UpdateOp::Insert { start, count } => {
                    target.offset_positions_for_insert(start, count)
                }
                UpdateOp::Remove { start, count } => {
                    target.offset_positions_for_remove(start, count, None)
                }
                UpdateOp::Update { start, count } => target.mark_range_updated(start, count),
                UpdateOp::Move { from, to } => target.offset_positions_for_move(from, to),
            }
            target.dispatch(op);
        }
    }

    /// Maps a pre-layout position through the postponed ops. `None` means the
    /// item was removed by one of them.
    pub fn find_position_offset(&self, position: usize) -> Option<usize> {
        self.postponed
            .iter()
            .try_fold(position, |position, op| op.map_position(position))
    }
}

#[cfg(test)]
#[path = "tests/batcher_tests.rs"]
mod tests;
