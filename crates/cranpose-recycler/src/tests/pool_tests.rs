use super::*;
use crate::holder::HolderFlags;

fn holder(name: &'static str, view_type: ViewType) -> Holder<&'static str> {
    let mut holder = Holder::new(name, view_type);
    holder.position = Some(3);
    holder.stable_id = Some(9);
    holder.add_flags(HolderFlags::BOUND);
    holder
}

#[test]
fn acquire_is_lifo_per_type() {
    let mut pool = RecycledPool::new();
    assert!(pool.release(holder("a", 1)).is_none());
    assert!(pool.release(holder("b", 1)).is_none());
    assert!(pool.release(holder("x", 2)).is_none());

    assert_eq!(pool.acquire(1).map(|h| *h.view()), Some("b"));
    assert_eq!(pool.acquire(1).map(|h| *h.view()), Some("a"));
    assert!(pool.acquire(1).is_none());
    assert_eq!(pool.acquire(2).map(|h| *h.view()), Some("x"));
}

#[test]
fn released_holder_is_reset() {
    let mut pool = RecycledPool::new();
    pool.release(holder("a", 1));
    let pooled = pool.acquire(1).expect("pooled holder");
    assert_eq!(pooled.position(), None);
    assert_eq!(pooled.stable_id(), None);
    assert_eq!(pooled.flags(), HolderFlags::empty());
    assert_eq!(pooled.view_type(), 1);
}

#[test]
fn capacity_one_keeps_most_recent_release() {
    let mut pool = RecycledPool::new();
    pool.set_capacity(4, 1);
    assert!(pool.release(holder("first", 4)).is_none());
    let evicted = pool.release(holder("second", 4));

    assert_eq!(evicted.map(|h| *h.view()), Some("first"));
    assert_eq!(pool.count(4), 1);
    assert_eq!(pool.acquire(4).map(|h| *h.view()), Some("second"));
}

#[test]
fn zero_capacity_returns_incoming_holder() {
    let mut pool = RecycledPool::new();
    pool.set_capacity(1, 0);
    let rejected = pool.release(holder("a", 1));
    assert_eq!(rejected.map(|h| *h.view()), Some("a"));
    assert_eq!(pool.size(), 0);
}

#[test]
fn default_capacity_is_five() {
    let mut pool = RecycledPool::new();
    for name in ["a", "b", "c", "d", "e"] {
        assert!(pool.release(holder(name, 0)).is_none());
    }
    assert_eq!(pool.capacity(0), DEFAULT_MAX_SCRAP);
    assert_eq!(pool.release(holder("f", 0)).map(|h| *h.view()), Some("a"));
    assert_eq!(pool.count(0), 5);
}

#[test]
fn shrinking_capacity_drops_oldest_first() {
    let mut pool = RecycledPool::new();
    for name in ["a", "b", "c"] {
        pool.release(holder(name, 0));
    }
    let dropped: Vec<_> = pool.set_capacity(0, 1).into_iter().map(|h| *h.view()).collect();
    assert_eq!(dropped, vec!["a", "b"]);
    assert_eq!(pool.acquire(0).map(|h| *h.view()), Some("c"));
}

#[test]
fn data_source_change_clears_only_for_single_consumer() {
    let mut pool = RecycledPool::new();
    pool.attach();
    pool.attach();
    pool.release(holder("a", 0));

    pool.on_data_source_changed();
    assert_eq!(pool.size(), 1);

    pool.detach();
    pool.on_data_source_changed();
    assert!(pool.is_empty());
}

#[test]
fn detach_without_attach_is_harmless() {
    let mut pool: RecycledPool<()> = RecycledPool::new();
    pool.detach();
    assert_eq!(pool.attach_count(), 0);
}

#[test]
fn shared_handles_point_at_same_pool() {
    let pool: SharedPool<&'static str> = SharedPool::default();
    let other = pool.clone();
    other.with_mut(|p| p.release(holder("a", 0)));
    assert_eq!(pool.with(|p| p.size()), 1);
    assert!(pool.ptr_eq(&other));
}
