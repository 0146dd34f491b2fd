use std::cell::{Cell, RefCell};

use super::*;
use crate::pool::RecycledPool;

#[derive(Debug, Default)]
struct Row {
    item: Option<u64>,
}

#[derive(Clone, Copy)]
struct Item {
    id: u64,
    view_type: ViewType,
}

#[derive(Default)]
struct Items {
    items: RefCell<Vec<Item>>,
    stable_ids: bool,
    created: Cell<usize>,
    binds: Cell<usize>,
    recycled: Cell<usize>,
}

impl Items {
    fn new(count: u64) -> Self {
        let items = (0..count).map(|id| Item { id, view_type: 0 }).collect();
        Self {
            items: RefCell::new(items),
            ..Self::default()
        }
    }

    fn with_stable_ids(mut self) -> Self {
        self.stable_ids = true;
        self
    }
}

impl DataSource<Row> for Items {
    fn item_count(&self) -> usize {
        self.items.borrow().len()
    }

    fn view_type(&self, position: usize) -> ViewType {
        self.items.borrow()[position].view_type
    }

    fn has_stable_ids(&self) -> bool {
        self.stable_ids
    }

    fn stable_id(&self, position: usize) -> Option<u64> {
        Some(self.items.borrow()[position].id)
    }

    fn create_view(&self, _view_type: ViewType) -> Row {
        self.created.set(self.created.get() + 1);
        Row::default()
    }

    fn bind(&self, holder: &mut Holder<Row>, position: usize) {
        self.binds.set(self.binds.get() + 1);
        let id = self.items.borrow()[position].id;
        holder.view_mut().item = Some(id);
    }

    fn on_view_recycled(&self, holder: &mut Holder<Row>) {
        self.recycled.set(self.recycled.get() + 1);
        holder.view_mut().item = None;
    }
}

fn recycler() -> Recycler<Row> {
    Recycler::new(SharedPool::default())
}

/// Resolves and attaches positions `0..count`.
fn attach_all(recycler: &mut Recycler<Row>, data: &Items, updates: &UpdateBatcher) -> Vec<HolderId> {
    recycler.state.item_count = data.item_count();
    (0..data.item_count())
        .map(|position| {
            let id = recycler
                .resolve(position, false, data, updates, None)
                .expect("resolve");
            recycler.add_view(id, None, false).expect("attach");
            id
        })
        .collect()
}

fn position_of(recycler: &Recycler<Row>, id: HolderId) -> Option<usize> {
    recycler.holder(id).and_then(Holder::position)
}

#[test]
fn resolve_creates_and_binds() {
    let data = Items::new(3);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);

    assert_eq!(data.created.get(), 3);
    assert_eq!(data.binds.get(), 3);
    let holder = recycler.holder(ids[2]).expect("holder");
    assert_eq!(holder.position(), Some(2));
    assert_eq!(holder.view().item, Some(2));
    assert!(holder.is_bound());
    assert_eq!(holder.container(), Container::Attached);
}

#[test]
fn resolve_rejects_positions_past_item_count() {
    let data = Items::new(2);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    recycler.state.item_count = 2;

    let err = recycler
        .resolve(2, false, &data, &updates, None)
        .expect_err("out of range");
    assert_eq!(
        err,
        RecyclerError::OutOfRange {
            position: 2,
            item_count: 2
        }
    );
}

#[test]
fn remove_offsets_followers_and_marks_removed() {
    let data = Items::new(5);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);

    recycler.offset_positions_for_remove(1, 1, None, &data);

    assert_eq!(position_of(&recycler, ids[0]), Some(0));
    assert!(recycler.holder(ids[1]).is_some_and(Holder::is_removed));
    assert_eq!(position_of(&recycler, ids[2]), Some(1));
    assert_eq!(position_of(&recycler, ids[3]), Some(2));
    assert_eq!(position_of(&recycler, ids[4]), Some(3));
    assert_eq!(
        recycler.holder(ids[3]).and_then(Holder::pre_layout_position),
        Some(3)
    );
    assert!(recycler.state().did_structure_change());
}

#[test]
fn move_relocates_item_and_shifts_range() {
    let data = Items::new(5);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);

    recycler.offset_positions_for_move(4, 1);

    let positions: Vec<_> = ids.iter().map(|id| position_of(&recycler, *id)).collect();
    assert_eq!(
        positions,
        vec![Some(0), Some(2), Some(3), Some(4), Some(1)]
    );
}

#[test]
fn insert_shifts_holders_at_or_after_start() {
    let data = Items::new(3);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);

    recycler.offset_positions_for_insert(1, 2);

    let positions: Vec<_> = ids.iter().map(|id| position_of(&recycler, *id)).collect();
    assert_eq!(positions, vec![Some(0), Some(3), Some(4)]);
    assert_eq!(recycler.holder(ids[1]).and_then(Holder::old_position), Some(1));
}

#[test]
fn invisible_remove_counts_toward_pre_layout() {
    let data = Items::new(4);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    attach_all(&mut recycler, &data, &updates);
    recycler.offset_positions_for_remove(10, 3, Some(10), &data);
    assert_eq!(recycler.state().deleted_invisible_item_count, 3);
}

#[test]
fn recycle_rejects_displayed_scrapped_and_ignored_holders() {
    let data = Items::new(3);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);

    assert!(matches!(
        recycler.recycle(ids[0], &data),
        Err(RecyclerError::InvalidOperationState { .. })
    ));

    recycler.scrap_holder(ids[1], &data).expect("scrap");
    assert!(matches!(
        recycler.recycle(ids[1], &data),
        Err(RecyclerError::InvalidOperationState { .. })
    ));
    assert_eq!(recycler.holder(ids[1]).map(Holder::container), Some(Container::Scrap(ScrapGroup::Unchanged)));

    recycler.ignore(ids[2]).expect("ignore");
    assert!(matches!(
        recycler.remove_and_recycle(ids[2], &data),
        Err(RecyclerError::InvalidOperationState { .. })
    ));
    assert_eq!(recycler.holder(ids[2]).map(Holder::container), Some(Container::Attached));
}

#[test]
fn scrap_round_trip_preserves_binding() {
    let data = Items::new(3).with_stable_ids();
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    let before = recycler.holder(ids[1]).map(|h| (h.position(), h.stable_id(), h.view_type(), h.flags()));

    recycler.scrap_holder(ids[1], &data).expect("scrap");
    recycler.unscrap(ids[1]).expect("unscrap");

    let after = recycler.holder(ids[1]).map(|h| {
        (
            h.position(),
            h.stable_id(),
            h.view_type(),
            h.flags() - HolderFlags::RETURNED_FROM_SCRAP,
        )
    });
    assert_eq!(before, after);
    assert!(recycler.scrap().is_empty());
}

#[test]
fn scrap_hit_is_served_once() {
    let data = Items::new(3);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.detach_and_scrap_attached(&data).expect("scrap all");

    let first = recycler.resolve(2, false, &data, &updates, None).expect("first");
    let second = recycler.resolve(2, false, &data, &updates, None).expect("second");

    assert_eq!(first, ids[2]);
    assert_ne!(second, first);
    assert_eq!(data.binds.get(), 4);
}

#[test]
fn invalid_holders_are_recycled_instead_of_scrapped() {
    let data = Items::new(2);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.mark_known_views_invalid(&data);

    assert!(matches!(
        recycler.scrap_holder(ids[0], &data),
        Err(RecyclerError::InvalidOperationState { .. })
    ));

    recycler.detach_and_scrap_attached(&data).expect("detach");
    assert!(recycler.scrap().is_empty());
    assert!(recycler.attached().is_empty());
    assert_eq!(recycler.pool().with(|pool| pool.count(0)), 2);
}

#[test]
fn cache_hit_skips_rebinding() {
    let data = Items::new(3);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);

    recycler.remove_and_recycle(ids[1], &data).expect("recycle");
    assert_eq!(recycler.cache().entries(), &[ids[1]]);

    let binds = data.binds.get();
    let again = recycler.resolve(1, false, &data, &updates, None).expect("resolve");
    assert_eq!(again, ids[1]);
    assert_eq!(data.binds.get(), binds);
    assert!(recycler.cache().is_empty());
}

#[test]
fn dry_run_leaves_cache_untouched() {
    let data = Items::new(3);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.remove_and_recycle(ids[0], &data).expect("recycle");

    let peeked = recycler.resolve(0, true, &data, &updates, None).expect("peek");
    assert_eq!(peeked, ids[0]);
    assert!(recycler.cache().contains(ids[0]));
}

#[test]
fn full_cache_retires_oldest_into_pool() {
    let data = Items::new(4);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);

    for id in &ids[..3] {
        recycler.remove_and_recycle(*id, &data).expect("recycle");
    }

    assert_eq!(recycler.cache().entries(), &[ids[1], ids[2]]);
    assert!(recycler.holder(ids[0]).is_none());
    assert_eq!(recycler.pool().with(RecycledPool::size), 1);
    assert_eq!(data.recycled.get(), 1);
}

#[test]
fn pooled_holder_is_reused_and_rebound() {
    let data = Items::new(2);
    let updates = UpdateBatcher::new();
    let mut recycler = Recycler::with_cache_size(SharedPool::default(), 0);
    let ids = attach_all(&mut recycler, &data, &updates);

    recycler.remove_and_recycle(ids[0], &data).expect("recycle");
    assert_eq!(recycler.pool().with(|pool| pool.count(0)), 1);

    let created = data.created.get();
    let reused = recycler.resolve(0, false, &data, &updates, None).expect("resolve");
    assert_ne!(reused, ids[0]);
    assert_eq!(data.created.get(), created);
    assert_eq!(recycler.holder(reused).and_then(|h| h.view().item), Some(0));
    assert!(recycler.pool().with(RecycledPool::is_empty));
}

#[test]
fn cached_holder_with_changed_type_is_discarded() {
    let data = Items::new(2);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.remove_and_recycle(ids[0], &data).expect("recycle");

    data.items.borrow_mut()[0].view_type = 3;
    let fresh = recycler.resolve(0, false, &data, &updates, None).expect("resolve");

    assert_ne!(fresh, ids[0]);
    assert_eq!(recycler.holder(fresh).map(Holder::view_type), Some(3));
    assert!(recycler.cache().is_empty());
    assert_eq!(recycler.pool().with(|pool| pool.count(0)), 1);
}

#[test]
fn stable_id_finds_scrapped_holder_at_new_position() {
    let data = Items::new(3).with_stable_ids();
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.mark_known_views_invalid(&data);
    recycler.detach_and_scrap_attached(&data).expect("scrap");

    data.items.borrow_mut().swap(0, 2);
    let id = recycler.resolve(0, false, &data, &updates, None).expect("resolve");

    assert_eq!(id, ids[2]);
    let holder = recycler.holder(id).expect("holder");
    assert_eq!(holder.position(), Some(0));
    assert!(!holder.is_invalid());
    assert_eq!(holder.view().item, Some(2));
}

#[test]
fn removed_holder_found_by_id_is_revived_for_rebinding() {
    let data = Items::new(3).with_stable_ids();
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.offset_positions_for_remove(1, 1, None, &data);
    recycler.detach_and_scrap_attached(&data).expect("scrap");
    recycler.clear_old_positions();

    // Item 1 was re-inserted at the end under the same id.
    let items = vec![
        Item { id: 0, view_type: 0 },
        Item { id: 2, view_type: 0 },
        Item { id: 1, view_type: 0 },
    ];
    *data.items.borrow_mut() = items;
    let id = recycler.resolve(2, false, &data, &updates, None).expect("resolve");

    assert_eq!(id, ids[1]);
    let holder = recycler.holder(id).expect("holder");
    assert!(!holder.is_removed());
    assert_eq!(holder.position(), Some(2));
    assert_eq!(holder.view().item, Some(1));
}

struct PinnedHeader {
    id: HolderId,
}

impl CacheExtension<Row> for PinnedHeader {
    fn lookup(&mut self, position: usize, _view_type: ViewType) -> Option<HolderId> {
        (position == 0).then_some(self.id)
    }
}

#[test]
fn cache_extension_is_consulted_before_the_pool() {
    let data = Items::new(2);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let header = recycler.adopt(Holder::new(Row::default(), 0));
    recycler.set_view_cache_extension(Some(Box::new(PinnedHeader { id: header })));
    recycler.state.item_count = 2;

    let id = recycler.resolve(0, false, &data, &updates, None).expect("resolve");
    assert_eq!(id, header);
    assert_eq!(data.created.get(), 0);
    assert_eq!(recycler.holder(id).and_then(|h| h.view().item), Some(0));
}

#[test]
fn shrinking_cache_moves_entries_to_pool() {
    let data = Items::new(3);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.remove_and_recycle(ids[0], &data).expect("recycle");
    recycler.remove_and_recycle(ids[1], &data).expect("recycle");

    recycler.set_cache_size(1, &data);

    assert_eq!(recycler.cache().entries(), &[ids[0]]);
    assert_eq!(recycler.pool().with(RecycledPool::size), 1);
}

#[test]
fn shrinking_cache_keeps_pinned_entries_alive() {
    let data = Items::new(3);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.remove_and_recycle(ids[0], &data).expect("recycle");
    recycler.remove_and_recycle(ids[1], &data).expect("recycle");
    if let Some(holder) = recycler.holder_mut(ids[1]) {
        holder.set_is_recyclable(false);
    }

    recycler.set_cache_size(1, &data);

    assert_eq!(recycler.cache().entries(), &[ids[0]]);
    assert_eq!(recycler.hidden(), &[ids[1]]);
    assert!(recycler.holder(ids[1]).is_some());
    assert!(recycler.pool().with(RecycledPool::is_empty));

    recycler
        .finish_animation(ids[1], AnimationKind::Remove, &data)
        .expect("finish");
    assert!(recycler.hidden().is_empty());
    assert_eq!(recycler.cache().entries(), &[ids[1]]);
    assert_eq!(recycler.pool().with(RecycledPool::size), 1);
}

#[test]
fn cache_without_stable_ids_is_flushed_on_reset() {
    let data = Items::new(3);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.remove_and_recycle(ids[0], &data).expect("recycle");

    recycler.mark_known_views_invalid(&data);

    assert!(recycler.cache().is_empty());
    let holder = recycler.holder(ids[1]).expect("holder");
    assert!(holder.is_invalid() && holder.needs_update());
}

#[test]
fn pinned_holder_is_retained_until_animation_finishes() {
    let data = Items::new(2);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    if let Some(holder) = recycler.holder_mut(ids[0]) {
        holder.set_is_recyclable(false);
    }

    recycler.remove_and_recycle(ids[0], &data).expect("recycle");
    assert_eq!(recycler.hidden(), &[ids[0]]);
    assert!(recycler.cache().is_empty());

    recycler
        .finish_animation(ids[0], AnimationKind::Remove, &data)
        .expect("finish");
    assert!(recycler.hidden().is_empty());
    assert_eq!(recycler.cache().entries(), &[ids[0]]);
}

#[test]
fn stop_ignoring_invalidates_binding() {
    let data = Items::new(1);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);

    recycler.ignore(ids[0]).expect("ignore");
    recycler.offset_positions_for_insert(0, 1);
    assert_eq!(position_of(&recycler, ids[0]), Some(0));

    recycler.stop_ignoring(ids[0]).expect("stop");
    let holder = recycler.holder(ids[0]).expect("holder");
    assert!(holder.is_invalid());
    assert!(!holder.should_ignore());
    assert_eq!(holder.position(), None);
    assert_eq!(holder.container(), Container::Attached);
}

#[test]
fn rebind_updated_holders_respects_type_changes() {
    let data = Items::new(2);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.view_range_update(0, 2);
    data.items.borrow_mut()[1].view_type = 5;

    let rebound = recycler.rebind_updated_holders(&data);

    assert_eq!(rebound, vec![ids[0]]);
    assert!(!recycler.holder(ids[0]).is_some_and(Holder::needs_update));
    assert!(recycler.holder(ids[1]).is_some_and(Holder::is_invalid));
}

#[test]
fn rebind_skips_only_holders_paired_for_a_change() {
    let data = Items::new(2);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    recycler.supports_change_animations = true;
    let ids = attach_all(&mut recycler, &data, &updates);
    recycler.view_range_update(0, 2);
    if let Some(holder) = recycler.holder_mut(ids[1]) {
        holder.shadowed = Some(ids[0]);
    }

    let rebound = recycler.rebind_updated_holders(&data);

    assert_eq!(rebound, vec![ids[0]]);
    assert!(recycler.holder(ids[0]).is_some_and(|h| !h.needs_update()));
    assert!(recycler.holder(ids[1]).is_some_and(Holder::needs_update));
}

#[test]
fn item_id_lookup_sees_displayed_holders_only() {
    let data = Items::new(3).with_stable_ids();
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    let ids = attach_all(&mut recycler, &data, &updates);

    assert_eq!(recycler.find_holder_for_item_id(1), Some(ids[1]));
    assert_eq!(recycler.find_holder_for_item_id(7), None);

    recycler.remove_and_recycle(ids[2], &data).expect("recycle");
    assert!(recycler.cache().contains(ids[2]));
    assert_eq!(recycler.find_holder_for_item_id(2), None);

    recycler.offset_positions_for_remove(0, 1, None, &data);
    assert_eq!(recycler.find_holder_for_item_id(0), None);
}

#[test]
fn item_id_lookup_needs_stable_ids() {
    let data = Items::new(2);
    let updates = UpdateBatcher::new();
    let mut recycler = recycler();
    attach_all(&mut recycler, &data, &updates);
    assert_eq!(recycler.find_holder_for_item_id(0), None);
}

#[test]
fn dropping_recycler_detaches_from_pool() {
    let pool: SharedPool<Row> = SharedPool::default();
    let first = Recycler::new(pool.clone());
    let second = Recycler::new(pool.clone());
    assert_eq!(pool.with(RecycledPool::attach_count), 2);
    drop(first);
    assert_eq!(pool.with(RecycledPool::attach_count), 1);
    drop(second);
    assert_eq!(pool.with(RecycledPool::attach_count), 0);
}
