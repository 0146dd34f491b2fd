use super::*;

fn bound_holder(position: usize) -> Holder<&'static str> {
    let mut holder = Holder::new("item", 0);
    holder.position = Some(position);
    holder.add_flags(HolderFlags::BOUND);
    holder
}

#[test]
fn first_offset_records_old_and_pre_layout_positions() {
    let mut holder = bound_holder(2);
    holder.offset_position(-1, false);
    assert_eq!(holder.position(), Some(1));
    assert_eq!(holder.old_position(), Some(2));
    assert_eq!(holder.pre_layout_position(), Some(2));

    holder.offset_position(3, false);
    assert_eq!(holder.position(), Some(4));
    assert_eq!(holder.old_position(), Some(2));
    assert_eq!(holder.pre_layout_position(), Some(2));
}

#[test]
fn offset_applied_to_pre_layout_moves_both_positions() {
    let mut holder = bound_holder(5);
    holder.offset_position(-2, true);
    assert_eq!(holder.position(), Some(3));
    assert_eq!(holder.pre_layout_position(), Some(3));
    assert_eq!(holder.old_position(), Some(5));
}

#[test]
fn layout_position_prefers_pre_layout_only_during_pre_pass() {
    let mut holder = bound_holder(2);
    holder.offset_position(1, false);
    assert_eq!(holder.layout_position(true), Some(2));
    assert_eq!(holder.layout_position(false), Some(3));

    holder.clear_old_position();
    assert_eq!(holder.layout_position(true), Some(3));
    assert_eq!(holder.old_position(), None);
}

#[test]
fn offset_without_position_is_ignored() {
    let mut holder: Holder<()> = Holder::new((), 0);
    holder.offset_position(4, true);
    assert_eq!(holder.position(), None);
    assert_eq!(holder.old_position(), None);
}

#[test]
fn offset_saturates_at_zero() {
    let mut holder = bound_holder(1);
    holder.offset_position(-3, false);
    assert_eq!(holder.position(), Some(0));
}

#[test]
fn recyclable_counter_nests() {
    let mut holder = bound_holder(0);
    holder.set_is_recyclable(false);
    holder.set_is_recyclable(false);
    assert!(!holder.is_recyclable());
    holder.set_is_recyclable(true);
    assert!(!holder.is_recyclable());
    holder.set_is_recyclable(true);
    assert!(holder.is_recyclable());
}

#[test]
fn recyclable_counter_clamps_on_underflow() {
    let mut holder = bound_holder(0);
    holder.set_is_recyclable(true);
    assert_eq!(holder.recyclable_count(), 0);
    assert!(holder.is_recyclable());

    holder.set_is_recyclable(false);
    assert!(!holder.is_recyclable());
}

#[test]
fn pinned_holder_is_not_recyclable() {
    let mut holder = bound_holder(0);
    holder.set_pinned(true);
    assert!(!holder.is_recyclable());
    holder.set_pinned(false);
    assert!(holder.is_recyclable());
}

#[test]
fn reset_internal_keeps_view_and_type() {
    let mut holder = Holder::new("row", 7);
    holder.position = Some(3);
    holder.stable_id = Some(42);
    holder.add_flags(HolderFlags::BOUND | HolderFlags::CHANGED);
    holder.set_is_recyclable(false);

    holder.reset_internal();

    assert_eq!(*holder.view(), "row");
    assert_eq!(holder.view_type(), 7);
    assert_eq!(holder.position(), None);
    assert_eq!(holder.stable_id(), None);
    assert_eq!(holder.flags(), HolderFlags::empty());
    assert!(holder.is_recyclable());
}

#[test]
fn set_flags_only_touches_masked_bits() {
    let mut holder = bound_holder(0);
    holder.add_flags(HolderFlags::INVALID | HolderFlags::REMOVED);
    holder.set_flags(
        HolderFlags::NEEDS_REBIND,
        HolderFlags::NEEDS_REBIND | HolderFlags::INVALID | HolderFlags::REMOVED,
    );
    assert_eq!(
        holder.flags(),
        HolderFlags::BOUND | HolderFlags::NEEDS_REBIND
    );
}

#[test]
fn origin_comparison_ignores_size() {
    let a = ItemBounds::new(0, 10, 100, 20);
    let b = ItemBounds::new(0, 10, 100, 40);
    let c = ItemBounds::new(0, 20, 100, 30);
    assert!(!a.origin_differs(&b));
    assert!(a.origin_differs(&c));
}
