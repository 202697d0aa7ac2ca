//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with access tracking.

use std::time::Duration;

// == Cache Entry ==
/// Represents a single cache entry with its value and last access time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Logical timestamp of the last successful read or write
    pub last_access: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry accessed at `now`.
    pub fn new(value: V, now: Duration) -> Self {
        Self {
            value,
            last_access: now,
        }
    }

    // == Touch ==
    /// Records an access at `now`.
    pub fn touch(&mut self, now: Duration) {
        self.last_access = now;
    }

    // == Age ==
    /// Time since the last access. Saturates at zero.
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.last_access)
    }

    // == Is Stale ==
    /// Checks if the entry has gone unaccessed for longer than `timeout`.
    ///
    /// Boundary condition: an entry whose age equals the timeout is still
    /// fresh; it becomes stale only once the age exceeds it.
    pub fn is_stale(&self, now: Duration, timeout: Duration) -> bool {
        self.age(now) > timeout
    }
}
