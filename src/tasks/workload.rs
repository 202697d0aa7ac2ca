//! Prime Workload Task
//!
//! Demo load for the cache: every interval, tests a batch of random numbers
//! for primality, answering from the cache when it can.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cache::{CacheState, TimedCache};
use crate::error::{CacheError, Result};
use crate::lifecycle::PauseAware;

/// Cache of primality results.
pub type PrimeCache = TimedCache<u64, bool>;

// == Workload Settings ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadSettings {
    /// Period between runs; the first run starts immediately
    pub interval: Duration,
    /// Numbers tested per run
    pub samples: usize,
    /// Numbers are drawn from `0..upper_bound`
    pub upper_bound: u64,
    /// How long stopping the loop may take before it is aborted
    pub stop_grace: Duration,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            samples: 100_000,
            upper_bound: 100_000,
            stop_grace: Duration::from_secs(5),
        }
    }
}

// == Primality ==
/// Tests `number` for primality, consulting and filling `cache`.
pub fn is_prime(cache: &PrimeCache, number: u64) -> bool {
    if number < 2 {
        return false;
    }
    if let Some(cached) = cache.get(&number) {
        return cached;
    }
    // Plain trial division: slow on purpose so cache hits are visible
    let prime = (2..number).all(|divisor| number % divisor != 0);
    cache.put(number, prime);
    prime
}

// == Run Report ==
/// Outcome of one workload run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub elapsed: Duration,
    /// Numbers tested; fewer than `samples` if the run was cancelled
    pub tested: usize,
    /// Entries in the cache after the run
    pub cached: usize,
    /// `cached` as a share of the number range, in percent
    pub coverage: f64,
}

/// Tests `settings.samples` random numbers and reports how long it took.
///
/// Checks `cancelled` before every number and returns early once it is set.
/// Tests nothing when `settings.upper_bound` is zero.
pub fn run_once(cache: &PrimeCache, settings: &WorkloadSettings, cancelled: &AtomicBool) -> RunReport {
    let started = std::time::Instant::now();
    let mut rng = rand::thread_rng();
    let mut tested = 0;
    if settings.upper_bound > 0 {
        while tested < settings.samples && !cancelled.load(Ordering::Relaxed) {
            is_prime(cache, rng.gen_range(0..settings.upper_bound));
            tested += 1;
        }
    }
    let cached = cache.size();
    RunReport {
        elapsed: started.elapsed(),
        tested,
        cached,
        coverage: cached as f64 * 100.0 / settings.upper_bound.max(1) as f64,
    }
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

// == Prime Workload ==
/// Periodic prime-testing loop over a shared cache.
///
/// Pauses with the process: `before_pause` stops the loop, `after_resume`
/// starts it again with an immediate run. The run counter carries across
/// restarts.
pub struct PrimeWorkload {
    cache: Arc<PrimeCache>,
    settings: WorkloadSettings,
    runs: Arc<AtomicU64>,
    checkpoint: Option<(u64, mpsc::Sender<()>)>,
    running: Mutex<Option<Running>>,
}

impl PrimeWorkload {
    pub fn new(cache: Arc<PrimeCache>, settings: WorkloadSettings) -> Self {
        Self {
            cache,
            settings,
            runs: Arc::new(AtomicU64::new(0)),
            checkpoint: None,
            running: Mutex::new(None),
        }
    }

    /// Sends one checkpoint request on `requests` when run number
    /// `after_runs` completes.
    pub fn with_checkpoint(mut self, after_runs: u64, requests: mpsc::Sender<()>) -> Self {
        self.checkpoint = Some((after_runs, requests));
        self
    }

    /// Completed runs so far.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    // == Start ==
    /// Starts the loop. Fails with `InvalidConfig` for a zero interval or
    /// number range, and with `InvalidState` if it is already running.
    pub async fn start(&self) -> Result<()> {
        if self.settings.interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "workload interval must be greater than zero".to_string(),
            ));
        }
        if self.settings.upper_bound == 0 {
            return Err(CacheError::InvalidConfig(
                "workload upper bound must be greater than zero".to_string(),
            ));
        }
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(CacheError::InvalidState {
                operation: "start workload",
                state: CacheState::Running,
            });
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(workload_loop(
            self.cache.clone(),
            self.settings,
            self.runs.clone(),
            self.checkpoint.clone(),
            cancel.clone(),
            shutdown_rx,
        ));
        *running = Some(Running {
            shutdown_tx,
            cancel,
            handle,
        });
        info!("Workload started, running every {:?}", self.settings.interval);
        Ok(())
    }

    // == Stop ==
    /// Stops the loop. A run in progress is cancelled and stops writing to
    /// the cache after the number it is testing; the loop then has the stop
    /// grace to exit. Fails with `InvalidState` if it is not running.
    pub async fn stop(&self) -> Result<()> {
        let Some(Running {
            shutdown_tx,
            cancel,
            mut handle,
        }) = self.running.lock().await.take()
        else {
            return Err(CacheError::InvalidState {
                operation: "stop workload",
                state: CacheState::Paused,
            });
        };

        cancel.store(true, Ordering::Relaxed);
        let _ = shutdown_tx.send(true);
        match tokio::time::timeout(self.settings.stop_grace, &mut handle).await {
            Ok(Ok(())) => info!("Workload stopped"),
            Ok(Err(err)) => error!("Workload ended abnormally: {}", err),
            Err(_) => {
                warn!(
                    "Workload did not stop within {:?}, abandoning it",
                    self.settings.stop_grace
                );
                handle.abort();
            }
        }
        Ok(())
    }
}

async fn workload_loop(
    cache: Arc<PrimeCache>,
    settings: WorkloadSettings,
    runs: Arc<AtomicU64>,
    checkpoint: Option<(u64, mpsc::Sender<()>)>,
    cancel: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(settings.interval);

    loop {
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    return;
                }
            }
            _ = ticker.tick() => {
                let run_cache = cache.clone();
                let run_cancel = cancel.clone();
                let report = match tokio::task::spawn_blocking(move || {
                    run_once(&run_cache, &settings, &run_cancel)
                })
                .await
                {
                    Ok(report) => report,
                    Err(err) => {
                        error!("Workload run failed: {}", err);
                        continue;
                    }
                };
                if cancel.load(Ordering::Relaxed) {
                    info!("Workload run cancelled after {} numbers", report.tested);
                    return;
                }

                let run = runs.fetch_add(1, Ordering::Relaxed) + 1;
                info!(
                    "{}. Run: {} ms ({} elements cached, {:.1}%)",
                    run,
                    report.elapsed.as_millis(),
                    report.cached,
                    report.coverage
                );

                if let Some((after_runs, requests)) = &checkpoint {
                    if run == *after_runs && requests.try_send(()).is_err() {
                        warn!("Checkpoint request after run {} was dropped", run);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl PauseAware for PrimeWorkload {
    fn name(&self) -> &str {
        "workload"
    }

    async fn before_pause(&self) -> Result<()> {
        self.stop().await
    }

    async fn after_resume(&self) -> Result<()> {
        self.start().await
    }
}
