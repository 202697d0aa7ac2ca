//! Logical Clock Module
//!
//! Time basis for freshness checks. Logical time follows the monotonic clock
//! while the cache runs, stands still while it is paused, and never counts
//! the paused interval once the cache resumes.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;

// == Clock State ==
#[derive(Debug, Default)]
struct ClockState {
    /// Total time spent paused across all completed cycles
    offset: Duration,
    /// Base-clock instant at which the current pause began
    paused_at: Option<Instant>,
}

// == Logical Clock ==
/// Monotonic clock that excludes paused intervals.
///
/// Timestamps are durations since the clock was created. Shifting every
/// recorded timestamp forward by the pause length is equivalent to pulling
/// "now" back by the same amount, so resuming touches a single offset instead
/// of every entry.
#[derive(Debug)]
pub struct LogicalClock {
    origin: Instant,
    state: RwLock<ClockState>,
}

impl LogicalClock {
    // == Constructor ==
    /// Creates a running clock whose logical time starts at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: RwLock::new(ClockState::default()),
        }
    }

    // == Now ==
    /// Returns the current logical timestamp.
    pub fn now(&self) -> Duration {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let base = state.paused_at.unwrap_or_else(Instant::now);
        base.saturating_duration_since(self.origin)
            .saturating_sub(state.offset)
    }

    // == Freeze ==
    /// Stops logical time. Returns the logical timestamp at which time
    /// stopped, or `None` if the clock was already frozen.
    pub fn freeze(&self) -> Option<Duration> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.paused_at.is_some() {
            return None;
        }
        let now = Instant::now();
        state.paused_at = Some(now);
        Some(
            now.saturating_duration_since(self.origin)
                .saturating_sub(state.offset),
        )
    }

    // == Thaw ==
    /// Restarts logical time and folds the measured pause into the offset.
    /// Returns the pause length, or `None` if the clock was not frozen.
    pub fn thaw(&self) -> Option<Duration> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let paused_at = state.paused_at.take()?;
        let paused_for = Instant::now().saturating_duration_since(paused_at);
        state.offset += paused_for;
        Some(paused_for)
    }

    /// Returns true between `freeze` and `thaw`.
    pub fn is_frozen(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .paused_at
            .is_some()
    }

    /// Total paused time excluded from logical time so far.
    pub fn total_paused(&self) -> Duration {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .offset
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::new()
    }
}
