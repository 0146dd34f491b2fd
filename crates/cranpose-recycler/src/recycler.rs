//! The recycler: owner of every holder a display surface knows about.
//!
//! # Architecture
//!
//! Holders live in an arena keyed by [`HolderId`]. Each one sits in exactly
//! one container at a time:
//!
//! - **attached**: displayed and visible to the arrangement policy
//! - **hidden**: displayed only until an outgoing animation ends
//! - **scrap**: detached for the running pass, reusable as-is
//! - **cache**: detached, still bound, reusable for the same position
//! - **free**: resolved but not yet attached (or held by a cache extension)
//!
//! Holders leaving the arena go to the [`SharedPool`], which keeps them per
//! view type without any binding.
//!
//! [`Recycler::resolve`] looks a position up through those tiers in a fixed
//! order (scrap, hidden, cache, stable id, cache extension, pool, create) and
//! binds the result when its content is missing or stale.

use crate::animator::{AnimationKind, ItemAnimator};
use crate::batcher::{UpdateBatcher, UpdateTarget};
use crate::cache::{WorkingSetCache, DEFAULT_CACHE_SIZE};
use crate::collections::map::HashMap;
use crate::collections::IdBuffer;
use crate::data_source::DataSource;
use crate::error::RecyclerError;
use crate::holder::{Container, Holder, HolderFlags, HolderId, ItemBounds, ViewType};
use crate::pool::SharedPool;
use crate::scrap::{ScrapGroup, ScrapSet};
use crate::state::LayoutState;
use crate::update_op::UpdateOp;

/// Extra lookup tier between the cache and the pool.
///
/// The extension keeps holders it manages itself (for example headers that are
/// expensive to rebuild) detached from every recycler container and hands them
/// back by id. The recycler never gives holders to the extension.
pub trait CacheExtension<V> {
    fn lookup(&mut self, position: usize, view_type: ViewType) -> Option<HolderId>;
}

pub struct Recycler<V> {
    holders: HashMap<HolderId, Holder<V>>,
    next_id: u64,
    attached: Vec<HolderId>,
    hidden: Vec<HolderId>,
    scrap: ScrapSet,
    cache: WorkingSetCache,
    pool: SharedPool<V>,
    extension: Option<Box<dyn CacheExtension<V>>>,
    pub(crate) state: LayoutState,
    pub(crate) supports_change_animations: bool,
    pub(crate) disappearing: Vec<HolderId>,
}

impl<V> Recycler<V> {
    pub fn new(pool: SharedPool<V>) -> Self {
        Self::with_cache_size(pool, DEFAULT_CACHE_SIZE)
    }

    pub fn with_cache_size(pool: SharedPool<V>, cache_size: usize) -> Self {
        pool.with_mut(|pool| pool.attach());
        Self {
            holders: HashMap::default(),
            next_id: 0,
            attached: Vec::new(),
            hidden: Vec::new(),
            scrap: ScrapSet::new(),
            cache: WorkingSetCache::new(cache_size),
            pool,
            extension: None,
            state: LayoutState::default(),
            supports_change_animations: false,
            disappearing: Vec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn holder(&self, id: HolderId) -> Option<&Holder<V>> {
        self.holders.get(&id)
    }

    pub fn holder_mut(&mut self, id: HolderId) -> Option<&mut Holder<V>> {
        self.holders.get_mut(&id)
    }

    /// Number of holders in the arena, whatever their container.
    pub fn holder_count(&self) -> usize {
        self.holders.len()
    }

    /// Displayed holders in child order.
    pub fn attached(&self) -> &[HolderId] {
        &self.attached
    }

    /// Holders kept on screen only for an outgoing animation.
    pub fn hidden(&self) -> &[HolderId] {
        &self.hidden
    }

    pub fn scrap(&self) -> &ScrapSet {
        &self.scrap
    }

    pub fn cache(&self) -> &WorkingSetCache {
        &self.cache
    }

    pub fn pool(&self) -> &SharedPool<V> {
        &self.pool
    }

    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    /// Switches to another pool, detaching from the current one.
    pub fn set_pool(&mut self, pool: SharedPool<V>) {
        if self.pool.ptr_eq(&pool) {
            return;
        }
        self.pool.with_mut(|pool| pool.detach());
        pool.with_mut(|pool| pool.attach());
        self.pool = pool;
    }

    pub fn set_view_cache_extension(&mut self, extension: Option<Box<dyn CacheExtension<V>>>) {
        self.extension = extension;
    }

    /// Holders created outside the recycler (for example by a cache
    /// extension) must be registered before they can be returned by id.
    pub fn adopt(&mut self, holder: Holder<V>) -> HolderId {
        self.insert_holder(holder)
    }

    fn insert_holder(&mut self, mut holder: Holder<V>) -> HolderId {
        let id = HolderId::new(self.next_id);
        self.next_id += 1;
        holder.id = id;
        holder.container = Container::Free;
        self.holders.insert(id, holder);
        id
    }

    fn require(&self, id: HolderId) -> Result<&Holder<V>, RecyclerError> {
        self.holders
            .get(&id)
            .ok_or_else(|| RecyclerError::invalid_holder(id, "unknown holder"))
    }

    fn require_mut(&mut self, id: HolderId) -> Result<&mut Holder<V>, RecyclerError> {
        self.holders
            .get_mut(&id)
            .ok_or_else(|| RecyclerError::invalid_holder(id, "unknown holder"))
    }

    /// Attached, hidden and scrapped holders.
    fn displayed_ids(&self) -> IdBuffer {
        self.attached
            .iter()
            .chain(&self.hidden)
            .chain(self.scrap.unchanged())
            .chain(self.scrap.changed())
            .copied()
            .collect()
    }

    fn cached_ids(&self) -> IdBuffer {
        self.cache.entries().iter().copied().collect()
    }

    /// Attached, non-removed holder currently at `position`.
    pub fn find_holder_for_position(&self, position: usize) -> Option<HolderId> {
        self.attached.iter().copied().find(|id| {
            self.holders
                .get(id)
                .is_some_and(|h| !h.is_removed() && h.position == Some(position))
        })
    }

    /// Displayed holder bound to the item with stable id `item_id`. Attached
    /// holders come before hidden ones. Cached holders are not displayed and
    /// never match.
    pub fn find_holder_for_item_id(&self, item_id: u64) -> Option<HolderId> {
        self.attached.iter().chain(&self.hidden).copied().find(|id| {
            self.holders
                .get(id)
                .is_some_and(|h| !h.is_removed() && h.stable_id == Some(item_id))
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────

    /// Returns a holder bound to the item at `position`.
    ///
    /// `position` is in the coordinate space of the running phase. With
    /// `dry_run` set, holders found in scrap or cache stay where they are.
    pub fn resolve(
        &mut self,
        position: usize,
        dry_run: bool,
        data: &dyn DataSource<V>,
        updates: &UpdateBatcher,
        animator: Option<&mut (dyn ItemAnimator<V> + '_)>,
    ) -> Result<HolderId, RecyclerError> {
        let item_count = self.state.item_count();
        if position >= item_count {
            return Err(RecyclerError::OutOfRange {
                position,
                item_count,
            });
        }
        let in_pre_layout = self.state.is_pre_layout();

        let mut found = self.scrap_or_cache_for_position(position, dry_run, data, animator);
        if let Some(id) = found {
            if !self.validate_for_offset_position(id, data) {
                found = None;
                if !dry_run {
                    self.discard_stale(id, data);
                }
            }
        }

        let id = match found {
            Some(id) => id,
            None => {
                let offset_position = self.offset_position(position, data, updates)?;
                let view_type = data.view_type(offset_position);
                let mut found = None;
                if data.has_stable_ids() {
                    if let Some(stable_id) = data.stable_id(offset_position) {
                        found = self.scrap_or_cache_for_id(stable_id, view_type, dry_run, data);
                        if let Some(holder) = found.and_then(|id| self.holders.get_mut(&id)) {
                            holder.position = Some(offset_position);
                        }
                    }
                }
                if found.is_none() {
                    found = self.lookup_extension(position, view_type)?;
                }
                if found.is_none() {
                    if let Some(mut holder) = self.pool.with_mut(|pool| pool.acquire(view_type)) {
                        holder.reset_internal();
                        found = Some(self.insert_holder(holder));
                    }
                }
                match found {
                    Some(id) => id,
                    None => {
                        let view = data.create_view(view_type);
                        log::trace!("created holder of type {view_type} for position {position}");
                        self.insert_holder(Holder::new(view, view_type))
                    }
                }
            }
        };

        let needs_bind = self.require(id).map(|h| {
            !h.is_removed() && (!h.is_bound() || h.needs_update() || h.is_invalid())
        })?;
        if needs_bind {
            let offset_position = self.offset_position(position, data, updates)?;
            self.bind_holder(id, offset_position, data)?;
            if in_pre_layout {
                self.require_mut(id)?.pre_layout_position = Some(position);
            }
        }
        Ok(id)
    }

    /// Rebinds `id` to the item at `position`, wherever the holder lives.
    pub fn bind_to_position(
        &mut self,
        id: HolderId,
        position: usize,
        data: &dyn DataSource<V>,
        updates: &UpdateBatcher,
    ) -> Result<(), RecyclerError> {
        self.require(id)?;
        let offset_position = self.offset_position(position, data, updates)?;
        self.bind_holder(id, offset_position, data)?;
        if self.state.is_pre_layout() {
            self.require_mut(id)?.pre_layout_position = Some(position);
        }
        Ok(())
    }

    fn offset_position(
        &self,
        position: usize,
        data: &dyn DataSource<V>,
        updates: &UpdateBatcher,
    ) -> Result<usize, RecyclerError> {
        let item_count = data.item_count();
        let mapped = if self.state.is_pre_layout() {
            updates.find_position_offset(position)
        } else {
            Some(position)
        };
        mapped
            .filter(|offset| *offset < item_count)
            .ok_or(RecyclerError::OutOfRange {
                position,
                item_count,
            })
    }

    fn bind_holder(
        &mut self,
        id: HolderId,
        position: usize,
        data: &dyn DataSource<V>,
    ) -> Result<(), RecyclerError> {
        let stable_id = if data.has_stable_ids() {
            data.stable_id(position)
        } else {
            None
        };
        let holder = self.require_mut(id)?;
        holder.position = Some(position);
        holder.stable_id = stable_id;
        holder.set_flags(
            HolderFlags::BOUND,
            HolderFlags::BOUND | HolderFlags::NEEDS_REBIND | HolderFlags::INVALID,
        );
        data.bind(holder, position);
        log::trace!("bound holder {id} to position {position}");
        Ok(())
    }

    /// Checks a scrap or cache hit against the data source.
    fn validate_for_offset_position(&self, id: HolderId, data: &dyn DataSource<V>) -> bool {
        let Some(holder) = self.holders.get(&id) else {
            return false;
        };
        if holder.is_removed() {
            return true;
        }
        let Some(position) = holder.position else {
            return false;
        };
        if position >= data.item_count() {
            log::warn!(
                "holder {id} points at position {position} past the end of the data set ({})",
                data.item_count()
            );
            return false;
        }
        if !self.state.is_pre_layout() {
            let expected = data.view_type(position);
            if expected != holder.view_type {
                log::warn!(
                    "{}",
                    RecyclerError::ConsistencyMismatch {
                        holder: id,
                        expected,
                        found: holder.view_type,
                    }
                );
                return false;
            }
        }
        if data.has_stable_ids() {
            return holder.stable_id == data.stable_id(position);
        }
        true
    }

    fn discard_stale(&mut self, id: HolderId, data: &dyn DataSource<V>) {
        let Some(holder) = self.holders.get_mut(&id) else {
            return;
        };
        holder.add_flags(HolderFlags::INVALID);
        holder.clear_flags(HolderFlags::RETURNED_FROM_SCRAP);
        self.take_from_container(id);
        self.recycle_unchecked(id, data);
    }

    fn scrap_or_cache_for_position(
        &mut self,
        position: usize,
        dry_run: bool,
        data: &dyn DataSource<V>,
        animator: Option<&mut (dyn ItemAnimator<V> + '_)>,
    ) -> Option<HolderId> {
        let in_pre_layout = self.state.is_pre_layout();
        let scrap_hit = self.scrap.unchanged().iter().copied().find(|id| {
            self.holders.get(id).is_some_and(|h| {
                !h.was_returned_from_scrap()
                    && h.layout_position(in_pre_layout) == Some(position)
                    && !h.is_invalid()
                    && (in_pre_layout || !h.is_removed())
            })
        });
        if let Some(id) = scrap_hit {
            if let Some(holder) = self.holders.get_mut(&id) {
                holder.add_flags(HolderFlags::RETURNED_FROM_SCRAP);
            }
            return Some(id);
        }

        if !dry_run {
            let animating = self.hidden.iter().copied().find(|id| {
                self.holders.get(id).is_some_and(|h| {
                    !h.is_removed() && h.layout_position(in_pre_layout) == Some(position)
                })
            });
            if let (Some(id), Some(animator)) = (animating, animator) {
                if let Some(kind) = animator.end_animation(id) {
                    log::debug!("ended animation of holder {id} to reuse position {position}");
                    if let Err(err) = self.finish_animation(id, kind, data) {
                        log::warn!("{err}");
                    }
                }
            }
        }

        let index = self.cache.entries().iter().position(|id| {
            self.holders.get(id).is_some_and(|h| {
                !h.is_invalid() && h.layout_position(in_pre_layout) == Some(position)
            })
        })?;
        let id = self.cache.get(index)?;
        if !dry_run {
            self.cache.remove_at(index);
            if let Some(holder) = self.holders.get_mut(&id) {
                holder.container = Container::Free;
            }
        }
        Some(id)
    }

    fn scrap_or_cache_for_id(
        &mut self,
        stable_id: u64,
        view_type: ViewType,
        dry_run: bool,
        data: &dyn DataSource<V>,
    ) -> Option<HolderId> {
        let in_pre_layout = self.state.is_pre_layout();
        let scrap: IdBuffer = self.scrap.unchanged().iter().rev().copied().collect();
        for id in scrap {
            let Some(holder) = self.holders.get_mut(&id) else {
                continue;
            };
            if holder.stable_id != Some(stable_id) || holder.was_returned_from_scrap() {
                continue;
            }
            if holder.view_type == view_type {
                holder.add_flags(HolderFlags::RETURNED_FROM_SCRAP);
                if holder.is_removed() && !in_pre_layout {
                    // The item was removed and re-added under the same id.
                    holder.set_flags(
                        HolderFlags::NEEDS_REBIND,
                        HolderFlags::NEEDS_REBIND | HolderFlags::INVALID | HolderFlags::REMOVED,
                    );
                }
                return Some(id);
            }
            if !dry_run {
                log::warn!(
                    "{}",
                    RecyclerError::ConsistencyMismatch {
                        holder: id,
                        expected: view_type,
                        found: holder.view_type,
                    }
                );
                self.take_from_container(id);
                self.recycle_unchecked(id, data);
            }
        }

        let cached: IdBuffer = self.cache.entries().iter().rev().copied().collect();
        for id in cached {
            let Some(holder) = self.holders.get(&id) else {
                continue;
            };
            if holder.stable_id != Some(stable_id) {
                continue;
            }
            if holder.view_type == view_type {
                if !dry_run {
                    self.take_from_container(id);
                }
                return Some(id);
            }
            if !dry_run {
                self.try_recycle_cached(id, data);
            }
        }
        None
    }

    fn lookup_extension(
        &mut self,
        position: usize,
        view_type: ViewType,
    ) -> Result<Option<HolderId>, RecyclerError> {
        let Some(extension) = self.extension.as_mut() else {
            return Ok(None);
        };
        let Some(id) = extension.lookup(position, view_type) else {
            return Ok(None);
        };
        let holder = self.holders.get(&id).ok_or_else(|| {
            RecyclerError::invalid_holder(id, "cache extension returned an unknown holder")
        })?;
        if holder.should_ignore() {
            return Err(RecyclerError::invalid_holder(
                id,
                "cache extension returned an ignored holder",
            ));
        }
        Ok(Some(id))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Recycling
    // ─────────────────────────────────────────────────────────────────────

    /// Returns a detached holder to the cache or the pool.
    ///
    /// The holder must be free: remove it from the display (or unscrap it)
    /// first. Holders still pinned by an animation stay hidden until the
    /// animation ends.
    pub fn recycle(&mut self, id: HolderId, data: &dyn DataSource<V>) -> Result<(), RecyclerError> {
        let holder = self.require(id)?;
        match holder.container {
            Container::Free => {}
            Container::Attached | Container::Hidden => {
                return Err(RecyclerError::invalid_holder(
                    id,
                    "holder is still displayed; remove it before recycling",
                ))
            }
            Container::Scrap(_) => {
                return Err(RecyclerError::invalid_holder(
                    id,
                    "holder is scrapped; unscrap it before recycling",
                ))
            }
            Container::Cache => {
                return Err(RecyclerError::invalid_holder(id, "holder is already cached"))
            }
        }
        if holder.should_ignore() {
            return Err(RecyclerError::invalid_holder(
                id,
                "ignored holders cannot be recycled; stop ignoring them first",
            ));
        }
        self.recycle_unchecked(id, data);
        Ok(())
    }

    pub(crate) fn recycle_unchecked(&mut self, id: HolderId, data: &dyn DataSource<V>) {
        self.state.remove_from_layout_maps(id);
        let in_pre_layout = self.state.is_pre_layout();
        let Some(holder) = self.holders.get_mut(&id) else {
            return;
        };
        holder.clear_flags(HolderFlags::RETURNED_FROM_SCRAP);
        if !holder.is_recyclable() {
            log::debug!("holder {id} is pinned by an animation; keeping it hidden");
            holder.container = Container::Hidden;
            if !self.hidden.contains(&id) {
                self.hidden.push(id);
            }
            return;
        }
        let cacheable = !holder.is_invalid()
            && (in_pre_layout || !holder.is_removed())
            && !holder.is_changed();
        if cacheable {
            if self.cache.is_full() && !self.cache.is_empty() {
                for index in 0..self.cache.len() {
                    if self.try_recycle_cached_at(index, data) {
                        break;
                    }
                }
            }
            if self.cache.push(id) {
                if let Some(holder) = self.holders.get_mut(&id) {
                    holder.container = Container::Cache;
                }
                return;
            }
        }
        self.add_to_pool(id, data);
    }

    fn try_recycle_cached_at(&mut self, index: usize, data: &dyn DataSource<V>) -> bool {
        let Some(id) = self.cache.get(index) else {
            return false;
        };
        if !self.holders.get(&id).is_some_and(Holder::is_recyclable) {
            return false;
        }
        self.cache.remove_at(index);
        self.add_to_pool(id, data);
        true
    }

    fn try_recycle_cached(&mut self, id: HolderId, data: &dyn DataSource<V>) -> bool {
        match self.cache.entries().iter().position(|entry| *entry == id) {
            Some(index) => self.try_recycle_cached_at(index, data),
            None => false,
        }
    }

    fn add_to_pool(&mut self, id: HolderId, data: &dyn DataSource<V>) {
        self.state.remove_from_layout_maps(id);
        self.disappearing.retain(|entry| *entry != id);
        let Some(mut holder) = self.holders.remove(&id) else {
            return;
        };
        data.on_view_recycled(&mut holder);
        holder.container = Container::Free;
        let view_type = holder.view_type;
        if let Some(discarded) = self.pool.with_mut(|pool| pool.release(holder)) {
            log::trace!(
                "pool discarded a holder of type {}",
                discarded.view_type()
            );
        } else {
            log::trace!("pooled holder {id} of type {view_type}");
        }
    }

    /// Drops a holder from the arena without pooling it.
    fn dispose(&mut self, id: HolderId) {
        self.state.remove_from_layout_maps(id);
        self.disappearing.retain(|entry| *entry != id);
        if self.holders.remove(&id).is_some() {
            log::debug!("disposed holder {id}");
        }
    }

    /// Removes `id` from whatever list holds it and marks it free.
    fn take_from_container(&mut self, id: HolderId) {
        let Some(holder) = self.holders.get_mut(&id) else {
            return;
        };
        match holder.container {
            Container::Free => {}
            Container::Attached => self.attached.retain(|entry| *entry != id),
            Container::Hidden => self.hidden.retain(|entry| *entry != id),
            Container::Scrap(group) => {
                self.scrap.remove(id, group);
            }
            Container::Cache => {
                self.cache.remove(id);
            }
        }
        holder.container = Container::Free;
    }

    /// Resizes the working-set cache, retiring the newest entries first.
    pub fn set_cache_size(&mut self, max: usize, data: &dyn DataSource<V>) {
        self.cache.set_max(max);
        let mut index = self.cache.len();
        while self.cache.len() > max && index > 0 {
            index -= 1;
            if self.try_recycle_cached_at(index, data) {
                continue;
            }
            // Pinned holders wait in hidden until their animation ends.
            if let Some(id) = self.cache.remove_at(index) {
                if let Some(holder) = self.holders.get_mut(&id) {
                    log::debug!("holder {id} is pinned; moving it out of the cache into hidden");
                    holder.container = Container::Hidden;
                    self.hidden.push(id);
                }
            }
        }
    }

    /// Empties the cache into the pool.
    pub fn recycle_cached_holders(&mut self, data: &dyn DataSource<V>) {
        for id in self.cache.take_all() {
            let recyclable = self.holders.get(&id).is_some_and(Holder::is_recyclable);
            if recyclable {
                self.add_to_pool(id, data);
            } else {
                self.dispose(id);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scrap and attachment
    // ─────────────────────────────────────────────────────────────────────

    /// Detaches a displayed holder into scrap.
    pub fn scrap_holder(&mut self, id: HolderId, data: &dyn DataSource<V>) -> Result<(), RecyclerError> {
        let supports_change_animations = self.supports_change_animations;
        let holder = self.require_mut(id)?;
        if holder.container != Container::Attached {
            return Err(RecyclerError::invalid_holder(
                id,
                "only displayed holders can be scrapped",
            ));
        }
        if holder.is_invalid() && !holder.is_removed() && !data.has_stable_ids() {
            return Err(RecyclerError::invalid_holder(
                id,
                "invalid holders cannot be scrapped without stable ids; recycle them instead",
            ));
        }
        let group = if holder.is_changed()
            && supports_change_animations
            && !holder.is_removed()
            && !holder.is_invalid()
        {
            ScrapGroup::Changed
        } else {
            ScrapGroup::Unchanged
        };
        holder.container = Container::Scrap(group);
        self.attached.retain(|entry| *entry != id);
        self.scrap.push(id, group);
        Ok(())
    }

    /// Takes a holder out of scrap and clears its returned flag.
    pub fn unscrap(&mut self, id: HolderId) -> Result<(), RecyclerError> {
        let holder = self.require_mut(id)?;
        let Container::Scrap(group) = holder.container else {
            return Err(RecyclerError::invalid_holder(id, "holder is not scrapped"));
        };
        holder.container = Container::Free;
        holder.clear_flags(HolderFlags::RETURNED_FROM_SCRAP);
        self.scrap.remove(id, group);
        Ok(())
    }

    /// Moves every displayed holder to scrap, or straight to recycling when
    /// its binding can no longer be matched back.
    pub fn detach_and_scrap_attached(&mut self, data: &dyn DataSource<V>) -> Result<(), RecyclerError> {
        let has_stable_ids = data.has_stable_ids();
        let attached: IdBuffer = self.attached.iter().rev().copied().collect();
        for id in attached {
            let holder = self.require(id)?;
            if holder.should_ignore() {
                continue;
            }
            if holder.is_invalid() && !holder.is_removed() && !has_stable_ids {
                self.take_from_container(id);
                self.recycle_unchecked(id, data);
            } else {
                self.scrap_holder(id, data)?;
            }
        }
        Ok(())
    }

    /// Removes a displayed holder and recycles it.
    pub fn remove_and_recycle(&mut self, id: HolderId, data: &dyn DataSource<V>) -> Result<(), RecyclerError> {
        let holder = self.require(id)?;
        if holder.container != Container::Attached {
            return Err(RecyclerError::invalid_holder(id, "holder is not displayed"));
        }
        if holder.should_ignore() {
            return Err(RecyclerError::invalid_holder(
                id,
                "ignored holders cannot be recycled; stop ignoring them first",
            ));
        }
        self.take_from_container(id);
        self.recycle_unchecked(id, data);
        Ok(())
    }

    /// Recycles everything left in scrap. Runs at the end of every pass.
    pub fn remove_and_recycle_scrap(&mut self, data: &dyn DataSource<V>) {
        for group in [ScrapGroup::Unchanged, ScrapGroup::Changed] {
            for id in self.scrap.take_group(group) {
                if let Some(holder) = self.holders.get_mut(&id) {
                    holder.container = Container::Free;
                    holder.clear_flags(HolderFlags::RETURNED_FROM_SCRAP);
                }
                self.recycle_unchecked(id, data);
            }
        }
    }

    /// Recycles every attached, scrapped and cached holder.
    pub fn remove_and_recycle_all(&mut self, data: &dyn DataSource<V>) {
        let attached: IdBuffer = self.attached.iter().rev().copied().collect();
        for id in attached {
            if self.holders.get(&id).is_some_and(Holder::should_ignore) {
                continue;
            }
            self.take_from_container(id);
            self.recycle_unchecked(id, data);
        }
        self.remove_and_recycle_scrap(data);
        self.recycle_cached_holders(data);
    }

    /// Attaches `id` at `index` (or at the end). Holders from scrap, cache
    /// or the hidden list are taken out of it first.
    pub fn add_view(&mut self, id: HolderId, index: Option<usize>, disappearing: bool) -> Result<(), RecyclerError> {
        let holder = self.require(id)?;
        if disappearing || holder.is_removed() {
            if !self.disappearing.contains(&id) {
                self.disappearing.push(id);
            }
        } else {
            self.disappearing.retain(|entry| *entry != id);
        }
        self.take_from_container(id);
        let holder = self.require_mut(id)?;
        holder.clear_flags(HolderFlags::RETURNED_FROM_SCRAP);
        holder.container = Container::Attached;
        match index {
            Some(index) => self.attached.insert(index.min(self.attached.len()), id),
            None => self.attached.push(id),
        }
        Ok(())
    }

    pub fn set_bounds(&mut self, id: HolderId, bounds: ItemBounds) -> Result<(), RecyclerError> {
        self.require_mut(id)?.bounds = bounds;
        Ok(())
    }

    /// Moves a holder to the hidden list for the duration of an animation.
    pub(crate) fn add_animating(&mut self, id: HolderId) {
        if self
            .holders
            .get(&id)
            .is_some_and(|h| h.container == Container::Hidden)
        {
            return;
        }
        self.take_from_container(id);
        if let Some(holder) = self.holders.get_mut(&id) {
            holder.container = Container::Hidden;
            holder.clear_flags(HolderFlags::RETURNED_FROM_SCRAP);
            self.hidden.push(id);
        }
    }

    /// Releases the pin taken for an animation and recycles the holder if it
    /// was only kept around for it.
    pub fn finish_animation(
        &mut self,
        id: HolderId,
        kind: AnimationKind,
        data: &dyn DataSource<V>,
    ) -> Result<(), RecyclerError> {
        let holder = self.require(id)?;
        // Change animations are acknowledged on the outgoing holder.
        let id = match (kind, holder.shadowed) {
            (AnimationKind::Change, Some(old)) if self.holders.contains_key(&old) => old,
            _ => id,
        };
        let holder = self.require_mut(id)?;
        holder.set_is_recyclable(true);
        if kind == AnimationKind::Change {
            holder.clear_flags(HolderFlags::CHANGED);
            if let Some(new) = holder.shadowing.take() {
                if let Some(replacement) = self.holders.get_mut(&new) {
                    replacement.shadowed = None;
                    replacement.clear_flags(HolderFlags::CHANGED);
                    replacement.set_is_recyclable(true);
                }
            }
        }
        let release = self
            .holders
            .get(&id)
            .is_some_and(|h| h.container == Container::Hidden && h.is_recyclable());
        if release {
            self.take_from_container(id);
            self.recycle_unchecked(id, data);
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Ignored holders
    // ─────────────────────────────────────────────────────────────────────

    /// Hands a displayed holder over to the arrangement policy. Ignored
    /// holders are skipped by scrapping, offsets and animations.
    pub fn ignore(&mut self, id: HolderId) -> Result<(), RecyclerError> {
        let holder = self.require_mut(id)?;
        if holder.container != Container::Attached {
            return Err(RecyclerError::invalid_holder(
                id,
                "only displayed holders can be ignored",
            ));
        }
        holder.add_flags(HolderFlags::IGNORED);
        self.state.remove_from_layout_maps(id);
        Ok(())
    }

    /// Returns an ignored holder to normal management. Its binding is no
    /// longer trusted.
    pub fn stop_ignoring(&mut self, id: HolderId) -> Result<(), RecyclerError> {
        let holder = self.require_mut(id)?;
        if !holder.should_ignore() {
            return Err(RecyclerError::invalid_holder(id, "holder is not ignored"));
        }
        holder.reset_internal();
        holder.add_flags(HolderFlags::INVALID);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Offset propagation
    // ─────────────────────────────────────────────────────────────────────

    pub fn offset_positions_for_insert(&mut self, start: usize, count: usize) {
        let delta = count as isize;
        for id in self.displayed_ids() {
            let Some(holder) = self.holders.get_mut(&id) else {
                continue;
            };
            if holder.should_ignore() || !holder.position.is_some_and(|p| p >= start) {
                continue;
            }
            log::debug!("offset {holder:?} by {delta} for insert at {start}");
            holder.offset_position(delta, false);
            self.state.structure_changed = true;
        }
        for id in self.cached_ids() {
            if let Some(holder) = self.holders.get_mut(&id) {
                if holder.position.is_some_and(|p| p >= start) {
                    holder.offset_position(delta, true);
                }
            }
        }
    }

    /// Shifts holders past the removed range and marks the ones inside it
    /// removed. Cached holders inside the range leave the cache.
    ///
    /// `pre_layout_start` is given for items removed before the pre-layout
    /// runs: they sit at that index in the old coordinate space, and holders
    /// past them there shift their pre-layout positions too.
    pub fn offset_positions_for_remove(
        &mut self,
        start: usize,
        count: usize,
        pre_layout_start: Option<usize>,
        data: &dyn DataSource<V>,
    ) {
        let end = start + count;
        let delta = -(count as isize);
        let pre_layout_end = pre_layout_start.map(|pre_start| pre_start + count);
        for id in self.displayed_ids() {
            let Some(holder) = self.holders.get_mut(&id) else {
                continue;
            };
            if holder.should_ignore() {
                continue;
            }
            let Some(position) = holder.position else {
                continue;
            };
            let shifts_pre_layout = pre_layout_end
                .zip(holder.layout_position(true))
                .is_some_and(|(pre_end, pre_layout)| pre_layout >= pre_end);
            if position >= end {
                holder.offset_position(delta, false);
                self.state.structure_changed = true;
            } else if position >= start {
                log::debug!("holder {id} removed at {position}");
                holder.add_flags(HolderFlags::REMOVED);
                holder.offset_position(delta, false);
                self.state.structure_changed = true;
            }
            if shifts_pre_layout {
                holder.offset_pre_layout_position(delta);
            }
        }
        for id in self.cached_ids().into_iter().rev() {
            let Some(holder) = self.holders.get_mut(&id) else {
                continue;
            };
            let Some(position) = holder.position else {
                continue;
            };
            if position >= start && position < end {
                if !self.try_recycle_cached(id, data) {
                    if let Some(holder) = self.holders.get_mut(&id) {
                        holder.add_flags(HolderFlags::INVALID);
                    }
                }
                continue;
            }
            let shifts_pre_layout = pre_layout_end
                .zip(holder.layout_position(true))
                .is_some_and(|(pre_end, pre_layout)| pre_layout >= pre_end);
            if position >= end {
                holder.offset_position(delta, false);
            }
            if shifts_pre_layout {
                holder.offset_pre_layout_position(delta);
            }
        }
        if pre_layout_start.is_some() {
            self.state.deleted_invisible_item_count += count;
        }
    }

    pub fn offset_positions_for_move(&mut self, from: usize, to: usize) {
        let (start, end, in_between) = if from < to {
            (from, to, -1)
        } else {
            (to, from, 1)
        };
        let to_delta = to as isize - from as isize;
        let mut ids = self.displayed_ids();
        ids.extend(self.cached_ids());
        for id in ids {
            let Some(holder) = self.holders.get_mut(&id) else {
                continue;
            };
            if holder.should_ignore() {
                continue;
            }
            let Some(position) = holder.position else {
                continue;
            };
            if position < start || position > end {
                continue;
            }
            if position == from {
                holder.offset_position(to_delta, false);
            } else {
                holder.offset_position(in_between, false);
            }
            if holder.container != Container::Cache {
                self.state.structure_changed = true;
            }
        }
    }

    /// Flags holders in `[start, start + count)` for rebinding.
    pub fn view_range_update(&mut self, start: usize, count: usize) {
        let end = start + count;
        let mut flags = HolderFlags::NEEDS_REBIND;
        if self.supports_change_animations {
            flags |= HolderFlags::CHANGED;
        }
        for id in self.displayed_ids() {
            let Some(holder) = self.holders.get_mut(&id) else {
                continue;
            };
            if holder.should_ignore() {
                continue;
            }
            if holder.position.is_some_and(|p| p >= start && p < end) {
                holder.add_flags(flags);
            }
        }
        for id in self.cached_ids() {
            if let Some(holder) = self.holders.get_mut(&id) {
                if holder.position.is_some_and(|p| p >= start && p < end) {
                    holder.add_flags(HolderFlags::NEEDS_REBIND);
                }
            }
        }
    }

    /// Forgets every binding after a full data-set reset.
    ///
    /// Displayed holders are flagged for a full rebind. Cached holders are
    /// flagged too when stable ids can still match them; otherwise they go to
    /// the pool.
    pub fn mark_known_views_invalid(&mut self, data: &dyn DataSource<V>) {
        for id in self.displayed_ids() {
            if let Some(holder) = self.holders.get_mut(&id) {
                if !holder.should_ignore() {
                    holder.add_flags(HolderFlags::NEEDS_REBIND | HolderFlags::INVALID);
                }
            }
        }
        if data.has_stable_ids() {
            for id in self.cached_ids() {
                if let Some(holder) = self.holders.get_mut(&id) {
                    holder.add_flags(HolderFlags::NEEDS_REBIND | HolderFlags::INVALID);
                }
            }
        } else {
            for index in (0..self.cache.len()).rev() {
                if !self.try_recycle_cached_at(index, data) {
                    if let Some(holder) = self.cache.get(index).and_then(|id| self.holders.get_mut(&id)) {
                        holder.add_flags(HolderFlags::INVALID);
                    }
                }
            }
        }
    }

    pub fn save_old_positions(&mut self) {
        for id in self.displayed_ids() {
            if let Some(holder) = self.holders.get_mut(&id) {
                if !holder.should_ignore() {
                    holder.save_old_position();
                }
            }
        }
    }

    pub fn clear_old_positions(&mut self) {
        for holder in self.holders.values_mut() {
            if !holder.should_ignore() {
                holder.clear_old_position();
            }
        }
    }

    /// Rebinds displayed holders that still carry stale content after a
    /// layout. A holder whose item changed type cannot be rebound in place
    /// and is invalidated instead.
    pub fn rebind_updated_holders(&mut self, data: &dyn DataSource<V>) -> Vec<HolderId> {
        let mut rebound = Vec::new();
        let attached: IdBuffer = self.attached.iter().copied().collect();
        for id in attached {
            let Some(holder) = self.holders.get_mut(&id) else {
                continue;
            };
            if holder.should_ignore() || holder.is_removed() || holder.is_invalid() || !holder.needs_update() {
                continue;
            }
            let Some(position) = holder.position.filter(|p| *p < data.item_count()) else {
                holder.add_flags(HolderFlags::INVALID);
                continue;
            };
            if data.view_type(position) != holder.view_type {
                holder.add_flags(HolderFlags::INVALID);
                continue;
            }
            // The replacement of a change pair shows the new content already.
            if holder.shadowed.is_some() || holder.shadowing.is_some() {
                continue;
            }
            if self.bind_holder(id, position, data).is_ok() {
                rebound.push(id);
            }
        }
        rebound
    }

    /// Wraps the recycler as the target of consumed update ops.
    pub(crate) fn update_target<'a>(&'a mut self, data: &'a dyn DataSource<V>) -> RecyclerUpdates<'a, V> {
        RecyclerUpdates {
            recycler: self,
            data,
            dispatched: Vec::new(),
        }
    }
}

impl<V> Drop for Recycler<V> {
    fn drop(&mut self) {
        self.pool.with_mut(|pool| pool.detach());
    }
}

pub(crate) struct RecyclerUpdates<'a, V> {
    recycler: &'a mut Recycler<V>,
    data: &'a dyn DataSource<V>,
    pub(crate) dispatched: Vec<UpdateOp>,
}

impl<V> UpdateTarget for RecyclerUpdates<'_, V> {
    fn has_attached_holder_in_range(&self, start: usize, count: usize) -> bool {
        let recycler = &*self.recycler;
        recycler.attached.iter().any(|id| {
            recycler.holders.get(id).is_some_and(|h| {
                !h.is_removed()
                    && !h.should_ignore()
                    && h.position.is_some_and(|p| p >= start && p < start + count)
            })
        })
    }

    fn offset_positions_for_insert(&mut self, start: usize, count: usize) {
        self.recycler.offset_positions_for_insert(start, count);
    }

    fn offset_positions_for_remove(&mut self, start: usize, count: usize, pre_layout_start: Option<usize>) {
        self.recycler
            .offset_positions_for_remove(start, count, pre_layout_start, self.data);
    }

    fn offset_positions_for_move(&mut self, from: usize, to: usize) {
        self.recycler.offset_positions_for_move(from, to);
    }

    fn mark_range_updated(&mut self, start: usize, count: usize) {
        self.recycler.view_range_update(start, count);
    }

    fn dispatch(&mut self, op: UpdateOp) {
        self.dispatched.push(op);
    }
}

#[cfg(test)]
#[path = "tests/recycler_tests.rs"]
mod tests;
