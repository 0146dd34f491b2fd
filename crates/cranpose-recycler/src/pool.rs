//! Per-type pool of detached holders.
//!
//! Holders land here once their binding is no longer useful to the working
//! set. They keep their display object and view type, but every piece of
//! item bookkeeping is reset, so a pooled holder always needs a full rebind.
//!
//! The pool may be shared by several recyclers through [`SharedPool`]; each
//! recycler attaches on construction and detaches when it drops or switches
//! pools. A data-source swap only clears the pool when one consumer is left.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::holder::{Holder, ViewType};

/// Default number of pooled holders kept per view type.
pub const DEFAULT_MAX_SCRAP: usize = 5;

pub struct RecycledPool<V> {
    scrap: HashMap<ViewType, VecDeque<Holder<V>>>,
    max_scrap: HashMap<ViewType, usize>,
    default_max: usize,
    attach_count: usize,
}

impl<V> Default for RecycledPool<V> {
    fn default() -> Self {
        Self::with_default_capacity(DEFAULT_MAX_SCRAP)
    }
}

impl<V> RecycledPool<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool whose view types hold at most `default_max` holders
    /// unless overridden with [`set_capacity`](Self::set_capacity).
    pub fn with_default_capacity(default_max: usize) -> Self {
        Self {
            scrap: HashMap::default(),
            max_scrap: HashMap::default(),
            default_max,
            attach_count: 0,
        }
    }

    pub fn capacity(&self, view_type: ViewType) -> usize {
        self.max_scrap
            .get(&view_type)
            .copied()
            .unwrap_or(self.default_max)
    }

    /// Sets the bound for `view_type` and returns the holders trimmed to fit,
    /// oldest first.
    pub fn set_capacity(&mut self, view_type: ViewType, max: usize) -> Vec<Holder<V>> {
        self.max_scrap.insert(view_type, max);
        let mut dropped = Vec::new();
        if let Some(entries) = self.scrap.get_mut(&view_type) {
            while entries.len() > max {
                if let Some(holder) = entries.pop_front() {
                    dropped.push(holder);
                }
            }
        }
        if !dropped.is_empty() {
            log::trace!(
                "pool trimmed {} holder(s) of type {view_type} to capacity {max}",
                dropped.len()
            );
        }
        dropped
    }

    /// Takes the most recently released holder of `view_type`.
    pub fn acquire(&mut self, view_type: ViewType) -> Option<Holder<V>> {
        let holder = self.scrap.get_mut(&view_type)?.pop_back();
        if holder.is_some() {
            log::trace!("pool hit for type {view_type}");
        }
        holder
    }

    /// Stores `holder` with its bookkeeping reset.
    ///
    /// When the type is already at capacity the oldest resident makes room
    /// and is returned so the caller can dispose of its content. A capacity of
    /// zero hands the incoming holder straight back.
    pub fn release(&mut self, mut holder: Holder<V>) -> Option<Holder<V>> {
        let view_type = holder.view_type();
        let max = self.capacity(view_type);
        if max == 0 {
            return Some(holder);
        }
        holder.reset_internal();
        let entries = self.scrap.entry(view_type).or_default();
        let evicted = if entries.len() >= max {
            entries.pop_front()
        } else {
            None
        };
        entries.push_back(holder);
        if evicted.is_some() {
            log::trace!("pool full for type {view_type}; evicted oldest holder");
        }
        evicted
    }

    pub fn count(&self, view_type: ViewType) -> usize {
        self.scrap.get(&view_type).map_or(0, VecDeque::len)
    }

    pub fn size(&self) -> usize {
        self.scrap.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn clear(&mut self) {
        self.scrap.clear();
    }

    pub fn attach(&mut self) {
        self.attach_count += 1;
    }

    pub fn detach(&mut self) {
        if self.attach_count == 0 {
            log::warn!("pool detached more often than attached");
            return;
        }
        self.attach_count -= 1;
    }

    pub fn attach_count(&self) -> usize {
        self.attach_count
    }

    /// Called by a consumer whose data source was replaced. Pooled holders are
    /// only trustworthy for other consumers, so the pool is emptied when the
    /// caller is the only one attached.
    pub fn on_data_source_changed(&mut self) {
        if self.attach_count == 1 {
            self.clear();
        }
    }
}

/// Reference-counted handle to a [`RecycledPool`].
pub struct SharedPool<V> {
    inner: Rc<RefCell<RecycledPool<V>>>,
}

impl<V> Clone for SharedPool<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> Default for SharedPool<V> {
    fn default() -> Self {
        Self::new(RecycledPool::default())
    }
}

impl<V> SharedPool<V> {
    pub fn new(pool: RecycledPool<V>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(pool)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&RecycledPool<V>) -> R) -> R {
        f(&self.inner.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut RecycledPool<V>) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    pub fn ptr_eq(&self, other: &SharedPool<V>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
#[path = "tests/pool_tests.rs"]
mod tests;
