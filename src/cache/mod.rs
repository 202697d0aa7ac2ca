//! Cache Module
//!
//! Provides in-memory caching with access-based expiry, a background sweep
//! and compensation for process pauses.

use std::time::Duration;

mod clock;
mod entry;
mod stats;
mod store;
mod timed;


// Re-export public types
pub use clock::LogicalClock;
pub use entry::CacheEntry;
pub use stats::{CacheStats, StatsRecorder};
pub use store::EntryStore;
pub use timed::{CacheSettings, CacheState, TimedCache};

// == Public Constants ==
/// Period between sweeps when none is configured
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// How long stopping the sweep may take before it is aborted
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);
