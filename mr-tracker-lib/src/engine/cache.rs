//! In-memory TTL cache with single-flight population.
//!
//! Each key owns an async lock. The first caller to miss holds that lock while
//! it produces the value, so concurrent callers for the same key wait and then
//! read the freshly stored entry instead of issuing a duplicate request.
//! Failed productions are not stored. Expired slots that no caller holds are
//! swept out at most once per TTL, when a caller next asks for a slot.

use super::models::{GroupId, GroupNode, MergeRecord, Project, ProjectId, TagRecord};
use super::{BranchPair, Diagnostic, Window};
use core::hash::Hash;
use core::time::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

const LOG_TARGET: &str = "     cache";

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

type Slot<V> = Arc<tokio::sync::Mutex<Option<Entry<V>>>>;

#[derive(Debug)]
struct Slots<K, V> {
    map: HashMap<K, Slot<V>>,
    next_sweep: Instant,
}

impl<K: Eq + Hash, V> Slots<K, V> {
    /// Remove slots whose entry is missing or expired and that no caller holds.
    ///
    /// Slots are only cloned under the map lock, so a strong count of one means
    /// the map owns the only reference and the slot's lock is free.
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || slot.try_lock().is_ok_and(|entry| entry.as_ref().is_some_and(|e| now < e.expires_at))
        });
        before - self.map.len()
    }
}

/// A keyed cache whose entries expire `ttl` after they were stored.
#[derive(Debug)]
pub struct Cache<K, V> {
    name: &'static str,
    ttl: Duration,
    slots: Mutex<Slots<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + core::fmt::Debug,
    V: Clone,
{
    #[must_use]
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slots: Mutex::new(Slots {
                map: HashMap::new(),
                next_sweep: Instant::now() + ttl,
            }),
        }
    }

    fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        if now >= slots.next_sweep {
            let removed = slots.sweep(now);
            if removed > 0 {
                log::trace!(target: LOG_TARGET, "swept {removed} expired {} entries", self.name);
            }
            slots.next_sweep = now + self.ttl;
        }

        Arc::clone(slots.map.entry(key.clone()).or_default())
    }

    /// Return the cached value for `key`, or run `producer` and cache its `Ok` result.
    ///
    /// An entry is served while `now < stored_at + ttl`. Errors from `producer`
    /// are returned to this caller only; the next caller tries again.
    pub async fn memoize<F, Fut, E>(&self, key: K, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref()
            && Instant::now() < entry.expires_at
        {
            log::trace!(target: LOG_TARGET, "{} hit for {key:?}", self.name);
            return Ok(entry.value.clone());
        }

        log::trace!(target: LOG_TARGET, "{} miss for {key:?}", self.name);
        let value = producer().await?;

        *guard = Some(Entry {
            value: value.clone(),
            expires_at: Instant::now() + self.ttl,
        });

        Ok(value)
    }

    /// Drop every entry. Producers already in flight still complete, but later
    /// callers never observe pre-invalidation entries.
    pub fn invalidate_all(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if !slots.map.is_empty() {
            log::debug!(target: LOG_TARGET, "invalidating {} {} entries", slots.map.len(), self.name);
        }
        slots.map.clear();
    }

    /// Number of keys with a slot, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Key for cached merged-request listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeKey {
    pub project: ProjectId,
    pub branches: BranchPair,
    pub window: Window,
}

/// The in-window tags of one project, plus diagnostics for tags that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct TagListing {
    pub tags: Vec<TagRecord>,
    pub skipped: Vec<Diagnostic>,
}

/// All caches used by one engine context.
#[derive(Debug)]
pub struct EngineCaches {
    pub(crate) group_ids: Cache<String, GroupId>,
    pub(crate) subgroups: Cache<GroupId, Vec<GroupNode>>,
    pub(crate) group_projects: Cache<GroupId, Vec<Project>>,
    pub(crate) merges: Cache<MergeKey, Vec<MergeRecord>>,
    pub(crate) tags: Cache<(ProjectId, Window), TagListing>,
    pub(crate) tag_details: Cache<(ProjectId, String), Option<String>>,
}

impl EngineCaches {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            group_ids: Cache::new("group id", ttl),
            subgroups: Cache::new("subgroups", ttl),
            group_projects: Cache::new("group projects", ttl),
            merges: Cache::new("merge requests", ttl),
            tags: Cache::new("tags", ttl),
            tag_details: Cache::new("tag details", ttl),
        }
    }

    /// Empty every cache.
    pub fn invalidate_all(&self) {
        self.group_ids.invalidate_all();
        self.subgroups.invalidate_all();
        self.group_projects.invalidate_all();
        self.merges.invalidate_all();
        self.tags.invalidate_all();
        self.tag_details.invalidate_all();
    }
}
