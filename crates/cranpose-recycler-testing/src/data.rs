use std::cell::Cell;

use cranpose_recycler::{DataSource, Holder, ViewType};

/// One entry of a [`TestDataSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestItem {
    pub id: u64,
    /// Bumped every time the item's content changes.
    pub version: u32,
    pub view_type: ViewType,
}

impl TestItem {
    pub fn label(&self) -> String {
        if self.version == 0 {
            format!("item-{}", self.id)
        } else {
            format!("item-{}-v{}", self.id, self.version)
        }
    }
}

/// Display object produced by [`TestDataSource`].
#[derive(Debug, Default)]
pub struct TestView {
    pub bound: Option<TestItem>,
    pub bind_count: usize,
}

impl TestView {
    pub fn label(&self) -> Option<String> {
        self.bound.as_ref().map(TestItem::label)
    }
}

/// In-memory data source that counts every create, bind and recycle.
///
/// Mutations only change the backing list. Reporting them to a host is the
/// caller's job, see [`RecyclerTestRule`](crate::RecyclerTestRule).
pub struct TestDataSource {
    items: Vec<TestItem>,
    stable_ids: bool,
    next_id: u64,
    created: Cell<usize>,
    bound: Cell<usize>,
    recycled: Cell<usize>,
}

impl TestDataSource {
    /// `count` items with ids `0..count`, all of view type 0.
    pub fn new(count: usize) -> Self {
        let mut data = Self {
            items: Vec::with_capacity(count),
            stable_ids: false,
            next_id: 0,
            created: Cell::new(0),
            bound: Cell::new(0),
            recycled: Cell::new(0),
        };
        data.insert(0, count);
        data
    }

    pub fn with_stable_ids(mut self) -> Self {
        self.stable_ids = true;
        self
    }

    pub fn items(&self) -> &[TestItem] {
        &self.items
    }

    pub fn item(&self, position: usize) -> Option<&TestItem> {
        self.items.get(position)
    }

    pub fn labels(&self) -> Vec<String> {
        self.items.iter().map(TestItem::label).collect()
    }

    /// Inserts `count` fresh items at `position`. Returns their ids.
    pub fn insert(&mut self, position: usize, count: usize) -> Vec<u64> {
        let ids: Vec<u64> = (0..count as u64).map(|offset| self.next_id + offset).collect();
        self.next_id += count as u64;
        let items = ids.iter().map(|id| TestItem {
            id: *id,
            version: 0,
            view_type: 0,
        });
        self.items.splice(position..position, items);
        ids
    }

    pub fn remove(&mut self, position: usize, count: usize) -> Vec<TestItem> {
        self.items.drain(position..position + count).collect()
    }

    pub fn move_item(&mut self, from: usize, to: usize) {
        let item = self.items.remove(from);
        self.items.insert(to, item);
    }

    /// Bumps the content version of `[position, position + count)`.
    pub fn change(&mut self, position: usize, count: usize) {
        for item in &mut self.items[position..position + count] {
            item.version += 1;
        }
    }

    pub fn set_view_type(&mut self, position: usize, view_type: ViewType) {
        self.items[position].view_type = view_type;
    }

    pub fn created_count(&self) -> usize {
        self.created.get()
    }

    pub fn bind_count(&self) -> usize {
        self.bound.get()
    }

    pub fn recycled_count(&self) -> usize {
        self.recycled.get()
    }
}

impl DataSource<TestView> for TestDataSource {
    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn view_type(&self, position: usize) -> ViewType {
        self.items.get(position).map_or(0, |item| item.view_type)
    }

    fn has_stable_ids(&self) -> bool {
        self.stable_ids
    }

    fn stable_id(&self, position: usize) -> Option<u64> {
        self.items.get(position).map(|item| item.id)
    }

    fn create_view(&self, _view_type: ViewType) -> TestView {
        self.created.set(self.created.get() + 1);
        TestView::default()
    }

    fn bind(&self, holder: &mut Holder<TestView>, position: usize) {
        self.bound.set(self.bound.get() + 1);
        let item = self.items.get(position).cloned();
        let view = holder.view_mut();
        view.bound = item;
        view.bind_count += 1;
    }

    fn on_view_recycled(&self, holder: &mut Holder<TestView>) {
        self.recycled.set(self.recycled.get() + 1);
        holder.view_mut().bound = None;
    }
}
