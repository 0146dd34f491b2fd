//! Item holders and their flag state machine.
//!
//! A [`Holder`] wraps one display object built by the data source together
//! with the bookkeeping the recycler needs to decide whether it can be reused
//! for a given position: where it was, where it is now, which item it shows,
//! and whether that binding can still be trusted.

use bitflags::bitflags;

use crate::scrap::ScrapGroup;

/// Opaque item kind reported by the data source.
pub type ViewType = i32;

/// Stable handle to a holder living in a recycler arena.
///
/// Ids are never reused by the same recycler. A holder that goes to the pool
/// loses its id and receives a fresh one when it is handed out again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HolderId(u64);

impl HolderId {
    pub(crate) const UNASSIGNED: HolderId = HolderId(u64::MAX);

    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Status bits of a holder.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct HolderFlags: u16 {
        /// Bound to the item at `position`.
        const BOUND = 1 << 0;
        /// The item's content changed; bound data is stale but position and type hold.
        const NEEDS_REBIND = 1 << 1;
        /// Position, type and id can no longer be trusted. Needs a full rebind.
        const INVALID = 1 << 2;
        /// The item was removed from the data set. Kept only for outgoing animation.
        const REMOVED = 1 << 3;
        /// Pinned by an ongoing animation.
        const NOT_RECYCLABLE = 1 << 4;
        /// Already handed out from scrap during the current pass.
        const RETURNED_FROM_SCRAP = 1 << 5;
        /// Content changed and a change animation pairs it with a replacement.
        const CHANGED = 1 << 6;
        /// Managed by the arrangement policy; the recycler leaves it alone.
        const IGNORED = 1 << 7;
    }
}

/// Which recycler container currently owns a holder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Container {
    /// Not in any list: freshly created, resolved but not yet attached, or on its way to the pool.
    Free,
    /// Displayed and visible to the arrangement policy.
    Attached,
    /// Displayed only for an outgoing animation.
    Hidden,
    Scrap(ScrapGroup),
    Cache,
}

/// Bounds assigned by the arrangement policy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ItemBounds {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Whether the top-left corner moved, which is what move animations track.
    pub fn origin_differs(&self, other: &ItemBounds) -> bool {
        self.left != other.left || self.top != other.top
    }
}

/// A reusable item representation.
pub struct Holder<V> {
    view: V,
    pub(crate) id: HolderId,
    pub(crate) position: Option<usize>,
    pub(crate) old_position: Option<usize>,
    pub(crate) pre_layout_position: Option<usize>,
    pub(crate) stable_id: Option<u64>,
    pub(crate) view_type: ViewType,
    pub(crate) flags: HolderFlags,
    pub(crate) container: Container,
    pub(crate) bounds: ItemBounds,
    pub(crate) shadowed: Option<HolderId>,
    pub(crate) shadowing: Option<HolderId>,
    recyclable_count: i32,
    pinned: bool,
}

impl<V> Holder<V> {
    pub fn new(view: V, view_type: ViewType) -> Self {
        Self {
            view,
            id: HolderId::UNASSIGNED,
            position: None,
            old_position: None,
            pre_layout_position: None,
            stable_id: None,
            view_type,
            flags: HolderFlags::empty(),
            container: Container::Free,
            bounds: ItemBounds::default(),
            shadowed: None,
            shadowing: None,
            recyclable_count: 0,
            pinned: false,
        }
    }

    pub fn id(&self) -> HolderId {
        self.id
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// Position in the post-edit coordinate space.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn old_position(&self) -> Option<usize> {
        self.old_position
    }

    pub fn pre_layout_position(&self) -> Option<usize> {
        self.pre_layout_position
    }

    /// Position the arrangement should use for this holder in the running pass.
    pub fn layout_position(&self, in_pre_layout: bool) -> Option<usize> {
        if in_pre_layout {
            self.pre_layout_position.or(self.position)
        } else {
            self.position
        }
    }

    pub fn stable_id(&self) -> Option<u64> {
        self.stable_id
    }

    pub fn view_type(&self) -> ViewType {
        self.view_type
    }

    pub fn flags(&self) -> HolderFlags {
        self.flags
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn bounds(&self) -> ItemBounds {
        self.bounds
    }

    /// The old holder this one replaces during a change animation.
    pub fn shadowed(&self) -> Option<HolderId> {
        self.shadowed
    }

    /// The new holder that replaces this one during a change animation.
    pub fn shadowing(&self) -> Option<HolderId> {
        self.shadowing
    }

    pub fn is_bound(&self) -> bool {
        self.flags.contains(HolderFlags::BOUND)
    }

    pub fn needs_update(&self) -> bool {
        self.flags.contains(HolderFlags::NEEDS_REBIND)
    }

    pub fn is_invalid(&self) -> bool {
        self.flags.contains(HolderFlags::INVALID)
    }

    pub fn is_removed(&self) -> bool {
        self.flags.contains(HolderFlags::REMOVED)
    }

    pub fn is_changed(&self) -> bool {
        self.flags.contains(HolderFlags::CHANGED)
    }

    pub fn should_ignore(&self) -> bool {
        self.flags.contains(HolderFlags::IGNORED)
    }

    pub fn was_returned_from_scrap(&self) -> bool {
        self.flags.contains(HolderFlags::RETURNED_FROM_SCRAP)
    }

    pub fn is_scrap(&self) -> bool {
        matches!(self.container, Container::Scrap(_))
    }

    /// Whether an external condition (for example a transient visual state)
    /// keeps the holder out of the recycling tiers.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    pub fn is_recyclable(&self) -> bool {
        !self.flags.contains(HolderFlags::NOT_RECYCLABLE) && !self.pinned
    }

    pub(crate) fn add_flags(&mut self, flags: HolderFlags) {
        self.flags.insert(flags);
    }

    pub(crate) fn clear_flags(&mut self, flags: HolderFlags) {
        self.flags.remove(flags);
    }

    /// Replaces the bits selected by `mask` with the matching bits of `flags`.
    pub(crate) fn set_flags(&mut self, flags: HolderFlags, mask: HolderFlags) {
        self.flags = (self.flags & !mask) | (flags & mask);
    }

    /// Shifts the holder by `delta` positions.
    ///
    /// The first shift of a batch records the pre-edit position in both
    /// `old_position` and `pre_layout_position`. The pre-layout position only
    /// follows the shift when `apply_to_pre_layout` is set, which is the case
    /// for edits the predictive pre-pass must already see.
    pub(crate) fn offset_position(&mut self, delta: isize, apply_to_pre_layout: bool) {
        let Some(position) = self.position else {
            return;
        };
        if self.old_position.is_none() {
            self.old_position = Some(position);
        }
        let pre_layout = self.pre_layout_position.unwrap_or(position);
        self.pre_layout_position = Some(if apply_to_pre_layout {
            pre_layout.saturating_add_signed(delta)
        } else {
            pre_layout
        });
        self.position = Some(position.saturating_add_signed(delta));
    }

    /// Shifts the pre-layout position alone, for items removed ahead of this
    /// one in the old coordinate space.
    pub(crate) fn offset_pre_layout_position(&mut self, delta: isize) {
        let Some(position) = self.position else {
            return;
        };
        if self.old_position.is_none() {
            self.old_position = Some(position);
        }
        let pre_layout = self.pre_layout_position.unwrap_or(position);
        self.pre_layout_position = Some(pre_layout.saturating_add_signed(delta));
    }

    pub(crate) fn save_old_position(&mut self) {
        if self.old_position.is_none() {
            self.old_position = self.position;
        }
    }

    pub(crate) fn clear_old_position(&mut self) {
        self.old_position = None;
        self.pre_layout_position = None;
    }

    /// Forgets everything tied to the previous item. The display object and
    /// its view type survive so the holder can be rebound.
    pub(crate) fn reset_internal(&mut self) {
        self.flags = HolderFlags::empty();
        self.position = None;
        self.old_position = None;
        self.pre_layout_position = None;
        self.stable_id = None;
        self.recyclable_count = 0;
        self.shadowed = None;
        self.shadowing = None;
    }

    /// Nested pin counter. Every `set_is_recyclable(false)` must be matched by
    /// a `set_is_recyclable(true)` before the holder can be recycled again.
    pub fn set_is_recyclable(&mut self, recyclable: bool) {
        self.recyclable_count = if recyclable {
            self.recyclable_count - 1
        } else {
            self.recyclable_count + 1
        };
        if self.recyclable_count < 0 {
            self.recyclable_count = 0;
            log::error!(
                "set_is_recyclable(true) called more often than set_is_recyclable(false) on {:?}",
                self
            );
        } else if !recyclable && self.recyclable_count == 1 {
            self.flags.insert(HolderFlags::NOT_RECYCLABLE);
        } else if recyclable && self.recyclable_count == 0 {
            self.flags.remove(HolderFlags::NOT_RECYCLABLE);
        }
    }

    #[cfg(test)]
    pub(crate) fn recyclable_count(&self) -> i32 {
        self.recyclable_count
    }
}

impl<V> std::fmt::Debug for Holder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Holder")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("old_position", &self.old_position)
            .field("pre_layout_position", &self.pre_layout_position)
            .field("stable_id", &self.stable_id)
            .field("view_type", &self.view_type)
            .field("flags", &self.flags)
            .field("container", &self.container)
            .field("recyclable_count", &self.recyclable_count)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/holder_tests.rs"]
mod tests;
