//! Entry Store Module
//!
//! Sharded key-value storage with per-entry access tracking and lazy expiry.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::cache::{CacheEntry, CacheStats, LogicalClock, StatsRecorder};

// == Entry Store ==
/// Thread-safe map from key to value plus last-access timestamp.
///
/// Uses `DashMap`, so a bulk removal locks one shard at a time and ordinary
/// reads and writes on other shards proceed while it runs. An entry's value
/// and timestamp live in one slot and are always updated together under that
/// slot's shard lock.
///
/// Stale entries are never returned, but only `remove_if`/`remove_stale`
/// delete them.
#[derive(Debug)]
pub struct EntryStore<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
    clock: Arc<LogicalClock>,
    timeout: Duration,
    stats: StatsRecorder,
}

impl<K, V> EntryStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty store that judges freshness against `clock`.
    pub fn new(clock: Arc<LogicalClock>, timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            timeout,
            stats: StatsRecorder::new(),
        }
    }

    // == Put ==
    /// Inserts or replaces the entry for `key`, marking it accessed now.
    pub fn put(&self, key: K, value: V) {
        let entry = CacheEntry::new(value, self.clock.now());
        self.entries.insert(key, entry);
    }

    // == Get ==
    /// Returns the value if present and fresh, refreshing its access time.
    ///
    /// A stale entry counts as a miss and is left for the sweep to remove.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hit = self.entries.get_mut(key).and_then(|mut entry| {
            let now = self.clock.now();
            if entry.is_stale(now, self.timeout) {
                None
            } else {
                entry.touch(now);
                Some(entry.value.clone())
            }
        });

        match hit {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        hit
    }

    // == Contains Key ==
    /// Same freshness rule as `get`, without touching the entry.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_stale(self.clock.now(), self.timeout))
    }

    // == Remove ==
    /// Removes an entry regardless of freshness, returning its value.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    // == Remove If ==
    /// Removes every entry matching `predicate`, returning how many went.
    pub fn remove_if<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&K, &CacheEntry<V>) -> bool,
    {
        let mut removed = 0;
        self.entries.retain(|key, entry| {
            if predicate(key, entry) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    // == Remove Stale ==
    /// Removes every entry older than the timeout as of the start of the scan.
    pub fn remove_stale(&self) -> usize {
        let now = self.clock.now();
        let timeout = self.timeout;
        let removed = self.remove_if(|_, entry| entry.is_stale(now, timeout));
        self.stats.record_sweep(removed);
        removed
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    // == Size ==
    /// Number of entries held, including stale ones not yet swept.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn recorder(&self) -> &StatsRecorder {
        &self.stats
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }
}
