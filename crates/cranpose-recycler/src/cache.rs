//! Small ordered cache of recently detached, still-bound holders.
//!
//! Cached holders keep their binding and position, so a hit for the same
//! position is served without rebinding. Eviction into the pool is driven by
//! the recycler, which knows whether a holder is recyclable.

use crate::holder::HolderId;

/// Default number of holders kept bound in the working-set cache.
pub const DEFAULT_CACHE_SIZE: usize = 2;

#[derive(Debug, Clone)]
pub struct WorkingSetCache {
    entries: Vec<HolderId>,
    max: usize,
}

impl Default for WorkingSetCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl WorkingSetCache {
    pub fn new(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            max,
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub(crate) fn set_max(&mut self, max: usize) {
        self.max = max;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max
    }

    pub fn contains(&self, id: HolderId) -> bool {
        self.entries.contains(&id)
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> &[HolderId] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<HolderId> {
        self.entries.get(index).copied()
    }

    /// Appends `id` if there is room. Returns whether it was stored.
    pub(crate) fn push(&mut self, id: HolderId) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(id);
        true
    }

    pub(crate) fn remove(&mut self, id: HolderId) -> bool {
        match self.entries.iter().position(|entry| *entry == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Option<HolderId> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub(crate) fn take_all(&mut self) -> Vec<HolderId> {
        std::mem::take(&mut self.entries)
    }
}
