//! Animator collaborator.
//!
//! The recycler classifies every holder at the end of a pass and asks the
//! animator to run one animation per classified holder. Each request is
//! acknowledged later through `RecyclerHost::on_animation_finished` with the
//! same holder id and [`AnimationKind`], which releases the pin taken for it.

use crate::holder::{Holder, HolderId, ItemBounds};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnimationKind {
    Add,
    Remove,
    Move,
    Change,
}

pub trait ItemAnimator<V> {
    /// Whether content changes animate from the old holder to a freshly bound
    /// replacement. When `false`, changed items are simply rebound in place.
    fn supports_change_animations(&self) -> bool {
        true
    }

    /// Each `animate_*` method returns whether `run_pending_animations`
    /// should be called once the pass has queued everything.
    fn animate_add(&mut self, holder: &Holder<V>) -> bool;

    fn animate_remove(&mut self, holder: &Holder<V>) -> bool;

    fn animate_move(&mut self, holder: &Holder<V>, from: ItemBounds, to: ItemBounds) -> bool;

    /// `new` is `None` when the changed item is no longer laid out.
    fn animate_change(&mut self, old: &Holder<V>, new: Option<&Holder<V>>) -> bool;

    fn run_pending_animations(&mut self) {}

    /// Jumps the animation of `id` to its end state. Returns the kind of the
    /// animation that was running so the caller can acknowledge it; the
    /// animator must not acknowledge it again.
    fn end_animation(&mut self, id: HolderId) -> Option<AnimationKind>;

    /// Ends every running animation, returning what was running.
    fn end_animations(&mut self) -> Vec<(HolderId, AnimationKind)>;
}
