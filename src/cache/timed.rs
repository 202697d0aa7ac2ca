//! Timed Cache Module
//!
//! Public cache type: entry store, sweep scheduler and pause/resume
//! compensation behind one handle.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::{
    CacheStats, EntryStore, LogicalClock, DEFAULT_STOP_GRACE, DEFAULT_SWEEP_INTERVAL,
};
use crate::error::{CacheError, Result};
use crate::lifecycle::PauseAware;
use crate::tasks::{spawn_sweep_task, SweepExit, SweepHandle};

// == Cache State ==
/// Lifecycle state of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// Sweep scheduled, logical time advancing
    Running,
    /// Between `before_pause` and `after_resume`: no sweep, time frozen
    Paused,
    /// Sweep stopped for good
    ShutDown,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheState::Running => write!(f, "running"),
            CacheState::Paused => write!(f, "paused"),
            CacheState::ShutDown => write!(f, "shut down"),
        }
    }
}

// == Cache Settings ==
/// Resolved timing parameters for a cache.
///
/// # Example
///
/// ```rust
/// use resume_cache::CacheSettings;
/// use std::time::Duration;
///
/// let settings = CacheSettings::new(Duration::from_secs(50), Duration::from_secs(12))
///     .with_sweep_interval(Duration::from_secs(5));
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Delay before the first sweep, after creation and after every resume
    pub initial_sweep_delay: Duration,
    /// Period between sweeps
    pub sweep_interval: Duration,
    /// Entries not accessed for longer than this are stale
    pub timeout: Duration,
    /// How long stopping the sweep may take before it is aborted
    pub stop_grace: Duration,
}

impl CacheSettings {
    /// Creates settings with the default sweep interval and stop grace.
    pub fn new(initial_sweep_delay: Duration, timeout: Duration) -> Self {
        Self {
            initial_sweep_delay,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            timeout,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    // == Validate ==
    /// Rejects zero durations.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("initial sweep delay", self.initial_sweep_delay),
            ("sweep interval", self.sweep_interval),
            ("timeout", self.timeout),
            ("stop grace", self.stop_grace),
        ];
        for (name, value) in fields {
            if value.is_zero() {
                return Err(CacheError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}

// == Timed Cache ==
/// In-memory cache that expires entries not accessed within a timeout and
/// keeps its entries' ages intact across a pause/resume cycle.
///
/// Reads and writes are synchronous and can be called from any thread. The
/// lifecycle hooks are async and serialized against each other; they return
/// once the transition is complete.
///
/// Time spent between `before_pause` and `after_resume` does not count
/// towards any entry's age: an entry that was fresh when the pause began is
/// exactly as fresh right after the resume.
///
/// Dropping the cache stops its sweep task.
pub struct TimedCache<K, V>
where
    K: Eq + Hash,
{
    store: Arc<EntryStore<K, V>>,
    clock: Arc<LogicalClock>,
    settings: CacheSettings,
    state: RwLock<CacheState>,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl<K, V> TimedCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a running cache and schedules its first sweep.
    ///
    /// Must be called from within a Tokio runtime, which hosts the sweep task.
    pub fn new(settings: CacheSettings) -> Result<Self> {
        settings.validate()?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CacheError::Scheduler(
                "a Tokio runtime is required to schedule the sweep".to_string(),
            ));
        }

        let clock = Arc::new(LogicalClock::new());
        let store = Arc::new(EntryStore::new(clock.clone(), settings.timeout));
        let sweeper = spawn_sweep_task(
            store.clone(),
            settings.initial_sweep_delay,
            settings.sweep_interval,
        );

        Ok(Self {
            store,
            clock,
            settings,
            state: RwLock::new(CacheState::Running),
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    // == Entry Operations ==
    /// Inserts or replaces a value, resetting its freshness window.
    pub fn put(&self, key: K, value: V) {
        self.store.put(key, value);
    }

    /// Returns the value if present and fresh, resetting its freshness window.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.get(key)
    }

    /// True if the key is present and fresh. Does not reset the window.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.contains_key(key)
    }

    /// Removes an entry regardless of freshness.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.remove(key)
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    /// Number of entries held. Stale entries are counted until a sweep
    /// removes them.
    pub fn size(&self) -> usize {
        self.store.size()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn state(&self) -> CacheState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current logical time, with all paused intervals excluded.
    pub fn logical_now(&self) -> Duration {
        self.clock.now()
    }

    /// Total time excluded from entry ages by completed pauses.
    pub fn total_paused(&self) -> Duration {
        self.clock.total_paused()
    }

    fn set_state(&self, state: CacheState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    // == Before Pause ==
    /// Stops the sweep and freezes logical time.
    ///
    /// Waits for an in-flight sweep to finish, up to the stop grace, then
    /// aborts it. Fails with `InvalidState` unless the cache is running.
    pub async fn before_pause(&self) -> Result<()> {
        let mut sweeper = self.sweeper.lock().await;
        let state = self.state();
        if state != CacheState::Running {
            warn!("Ignoring pause request: cache is {}", state);
            return Err(CacheError::InvalidState {
                operation: "pause",
                state,
            });
        }

        if let Some(handle) = sweeper.take() {
            if handle.stop(self.settings.stop_grace).await == SweepExit::Aborted {
                warn!("Sweep was aborted while pausing");
            }
        }

        // An abandoned tick may still hold a shard lock, so nothing here
        // touches the entries
        let paused_at = self.clock.freeze().unwrap_or_else(|| self.clock.now());
        self.set_state(CacheState::Paused);
        info!("Cache paused at logical time {:?}", paused_at);
        Ok(())
    }

    // == After Resume ==
    /// Excludes the pause from every entry's age and restarts the sweep from
    /// the beginning of its cadence.
    ///
    /// Fails with `InvalidState` unless the cache is paused.
    pub async fn after_resume(&self) -> Result<()> {
        let mut sweeper = self.sweeper.lock().await;
        let state = self.state();
        if state != CacheState::Paused {
            warn!("Ignoring resume request: cache is {}", state);
            return Err(CacheError::InvalidState {
                operation: "resume",
                state,
            });
        }

        let paused_for = self.clock.thaw().unwrap_or_default();
        self.store.recorder().record_pause();

        *sweeper = Some(spawn_sweep_task(
            self.store.clone(),
            self.settings.initial_sweep_delay,
            self.settings.sweep_interval,
        ));
        self.set_state(CacheState::Running);
        info!(
            "Cache resumed after a pause of {:?}, next sweep in {:?}",
            paused_for, self.settings.initial_sweep_delay
        );
        Ok(())
    }

    // == Shutdown ==
    /// Stops the sweep for good. Entries stay readable under the normal
    /// freshness rule; stale ones are no longer removed. Shutting down a
    /// paused cache thaws its clock, excluding the pause from entry ages.
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) -> SweepExit {
        let mut sweeper = self.sweeper.lock().await;
        if let Some(paused_for) = self.clock.thaw() {
            info!("Cache shut down while paused, after a pause of {:?}", paused_for);
        }
        self.set_state(CacheState::ShutDown);
        match sweeper.take() {
            Some(handle) => handle.stop(self.settings.stop_grace).await,
            None => SweepExit::Stopped,
        }
    }
}

impl<K, V> fmt::Debug for TimedCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedCache")
            .field("settings", &self.settings)
            .field("entries", &self.store.size())
            .field("state", &*self.state.read().unwrap_or_else(PoisonError::into_inner))
            .finish()
    }
}

#[async_trait]
impl<K, V> PauseAware for TimedCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "cache"
    }

    async fn before_pause(&self) -> Result<()> {
        TimedCache::before_pause(self).await
    }

    async fn after_resume(&self) -> Result<()> {
        TimedCache::after_resume(self).await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, sleep};
    use tokio_test::{assert_err, assert_ok};

    fn settings() -> CacheSettings {
        CacheSettings::new(Duration::from_secs(50), Duration::from_secs(12))
            .with_sweep_interval(Duration::from_secs(5))
    }

    fn new_cache() -> TimedCache<String, bool> {
        TimedCache::new(settings()).unwrap()
    }

    #[test]
    fn test_settings_validation() {
        assert_ok!(settings().validate());

        let zero_timeout = CacheSettings::new(Duration::from_secs(50), Duration::ZERO);
        assert!(matches!(
            zero_timeout.validate(),
            Err(CacheError::InvalidConfig(_))
        ));

        let zero_delay = CacheSettings::new(Duration::ZERO, Duration::from_secs(12));
        assert_err!(zero_delay.validate());

        let zero_interval = settings().with_sweep_interval(Duration::ZERO);
        assert_err!(zero_interval.validate());
    }

    #[test]
    fn test_new_requires_runtime() {
        let result = TimedCache::<String, bool>::new(settings());
        assert!(matches!(result, Err(CacheError::Scheduler(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_rejects_invalid_settings() {
        let result = TimedCache::<String, bool>::new(CacheSettings::new(
            Duration::from_secs(1),
            Duration::ZERO,
        ));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_transitions() {
        let cache = new_cache();
        assert_eq!(cache.state(), CacheState::Running);

        assert_ok!(cache.before_pause().await);
        assert_eq!(cache.state(), CacheState::Paused);

        assert_ok!(cache.after_resume().await);
        assert_eq!(cache.state(), CacheState::Running);
        assert_eq!(cache.stats().pauses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_misuse_is_rejected() {
        let cache = new_cache();

        let err = cache.after_resume().await.unwrap_err();
        assert_eq!(
            err,
            CacheError::InvalidState {
                operation: "resume",
                state: CacheState::Running
            }
        );

        cache.before_pause().await.unwrap();
        let err = cache.before_pause().await.unwrap_err();
        assert_eq!(
            err,
            CacheError::InvalidState {
                operation: "pause",
                state: CacheState::Paused
            }
        );

        // Misuse left the cache paused and resumable
        assert_eq!(cache.state(), CacheState::Paused);
        assert_ok!(cache.after_resume().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_survives_long_pause() {
        let cache = new_cache();
        cache.put("k".to_string(), true);

        advance(Duration::from_secs(8)).await;
        cache.before_pause().await.unwrap();
        advance(Duration::from_secs(3600)).await;
        cache.after_resume().await.unwrap();

        assert_eq!(cache.get("k"), Some(true));
        assert_eq!(cache.total_paused(), Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_keeps_remaining_margin() {
        let cache = new_cache();
        cache.put("k".to_string(), true);

        advance(Duration::from_secs(8)).await;
        cache.before_pause().await.unwrap();
        advance(Duration::from_secs(100)).await;
        cache.after_resume().await.unwrap();

        // 8s of age carried over, 4s of margin left
        advance(Duration::from_secs(3)).await;
        assert!(cache.contains_key("k"));
        advance(Duration::from_secs(2)).await;
        assert!(!cache.contains_key("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_restarts_sweep_cadence() {
        let cache = TimedCache::new(
            CacheSettings::new(Duration::from_secs(10), Duration::from_secs(1))
                .with_sweep_interval(Duration::from_secs(2)),
        )
        .unwrap();
        cache.put("k".to_string(), true);

        sleep(Duration::from_secs(9)).await;
        cache.before_pause().await.unwrap();
        sleep(Duration::from_secs(30)).await;
        cache.after_resume().await.unwrap();

        // A fresh initial delay applies after resume
        sleep(Duration::from_secs(9)).await;
        assert_eq!(cache.stats().sweeps, 0);
        assert_eq!(cache.size(), 1);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(cache.stats().sweeps, 1);
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sweep_while_paused() {
        let cache = TimedCache::new(
            CacheSettings::new(Duration::from_secs(1), Duration::from_secs(1))
                .with_sweep_interval(Duration::from_secs(1)),
        )
        .unwrap();
        cache.put("k".to_string(), true);
        cache.before_pause().await.unwrap();

        sleep(Duration::from_secs(60)).await;
        assert_eq!(cache.stats().sweeps, 0);
        assert_eq!(cache.get("k"), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_blocks_lifecycle() {
        let cache = new_cache();
        assert_eq!(cache.shutdown().await, SweepExit::Stopped);
        assert_eq!(cache.state(), CacheState::ShutDown);
        assert_eq!(cache.shutdown().await, SweepExit::Stopped);

        assert!(matches!(
            cache.before_pause().await,
            Err(CacheError::InvalidState {
                state: CacheState::ShutDown,
                ..
            })
        ));

        // Entries still readable after shutdown
        cache.put("k".to_string(), true);
        assert_eq!(cache.get("k"), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_paused_keeps_expiry() {
        let cache = new_cache();
        cache.put("k".to_string(), true);

        advance(Duration::from_secs(5)).await;
        cache.before_pause().await.unwrap();
        advance(Duration::from_secs(100)).await;
        assert_eq!(cache.shutdown().await, SweepExit::Stopped);

        // The pause is excluded and logical time moves again
        assert_eq!(cache.logical_now(), Duration::from_secs(5));
        advance(Duration::from_secs(7)).await;
        assert!(cache.contains_key("k"));
        advance(Duration::from_secs(3600)).await;
        assert_eq!(cache.logical_now(), Duration::from_secs(3612));
        assert!(!cache.contains_key("k"));
        assert_eq!(cache.get("k"), None);
    }

    /// Value whose first drop blocks its thread for `hold`, flagging
    /// `started` beforehand.
    #[derive(Clone)]
    struct SlowDrop {
        started: Arc<std::sync::atomic::AtomicBool>,
        hold: Duration,
    }

    impl Drop for SlowDrop {
        fn drop(&mut self) {
            use std::sync::atomic::Ordering;
            if !self.started.swap(true, Ordering::SeqCst) {
                std::thread::sleep(self.hold);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pause_abandons_overrunning_sweep() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let started = Arc::new(AtomicBool::new(false));
        let cache = TimedCache::new(
            CacheSettings::new(Duration::from_millis(30), Duration::from_millis(1))
                .with_sweep_interval(Duration::from_secs(3600))
                .with_stop_grace(Duration::from_millis(100)),
        )
        .unwrap();
        cache.put(
            "slow".to_string(),
            SlowDrop {
                started: started.clone(),
                hold: Duration::from_secs(1),
            },
        );

        tokio::time::timeout(Duration::from_secs(5), async {
            while !started.load(Ordering::SeqCst) {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sweep tick should have started");

        let begun = std::time::Instant::now();
        assert_ok!(cache.before_pause().await);
        assert!(
            begun.elapsed() < Duration::from_millis(800),
            "pause should return after the stop grace, not after the tick"
        );
        assert_eq!(cache.state(), CacheState::Paused);

        // Once the abandoned tick finishes, the cache resumes normally
        sleep(Duration::from_secs(1)).await;
        assert_eq!(cache.size(), 0);
        assert_ok!(cache.after_resume().await);
        assert_eq!(cache.state(), CacheState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_repeat() {
        let cache = new_cache();
        cache.put("k".to_string(), true);

        for _ in 0..5 {
            advance(Duration::from_secs(2)).await;
            cache.before_pause().await.unwrap();
            advance(Duration::from_secs(1000)).await;
            cache.after_resume().await.unwrap();
        }

        // 10s of logical age, still fresh
        assert!(cache.contains_key("k"));
        assert_eq!(cache.stats().pauses, 5);
        assert_eq!(cache.logical_now(), Duration::from_secs(10));
    }
}
