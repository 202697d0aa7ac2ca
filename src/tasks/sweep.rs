//! Eviction Sweep Task
//!
//! Background task that periodically removes stale cache entries.

use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::cache::EntryStore;

/// How the sweep task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepExit {
    /// The task saw the stop signal and returned on its own
    Stopped,
    /// The task had to be aborted, or died before it could report
    Aborted,
}

// == Sweep Handle ==
/// Owner side of a running sweep task.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<SweepExit>,
}

impl SweepHandle {
    // == Stop ==
    /// Signals the task to stop and waits up to `grace` for it to finish.
    ///
    /// A tick that is already running always completes before the task
    /// returns. If the task overruns `grace` this stops waiting and requests
    /// an abort, which only takes effect at the task's next await point: a
    /// tick still inside `remove_stale` runs to the end on its worker thread,
    /// possibly after this returns. That tick compares ages against the
    /// logical time read when it started, so freezing or thawing the clock
    /// meanwhile does not change which entries it removes.
    pub async fn stop(self, grace: Duration) -> SweepExit {
        let SweepHandle {
            shutdown_tx,
            mut handle,
        } = self;
        // The receiver only disappears once the task has already exited
        let _ = shutdown_tx.send(true);

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(exit)) => exit,
            Ok(Err(err)) => {
                error!("Sweep task ended abnormally: {}", err);
                SweepExit::Aborted
            }
            Err(_) => {
                warn!(
                    "Sweep task did not stop within {:?}, abandoning it",
                    grace
                );
                handle.abort();
                SweepExit::Aborted
            }
        }
    }
}

/// Spawns a background task that periodically removes stale entries.
///
/// The first sweep runs `initial_delay` after the call, then one every
/// `interval`. Ticks missed because a sweep ran long are delayed, never
/// bursted. The task only ends when told to through the returned handle.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(store.clone(), Duration::from_secs(50), Duration::from_secs(5));
/// // Later, before a pause:
/// handle.stop(Duration::from_secs(5)).await;
/// ```
pub fn spawn_sweep_task<K, V>(
    store: Arc<EntryStore<K, V>>,
    initial_delay: Duration,
    interval: Duration,
) -> SweepHandle
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let first_sweep = Instant::now() + initial_delay;

    let handle = tokio::spawn(async move {
        info!(
            "Starting sweep task: first sweep in {:?}, then every {:?}",
            initial_delay, interval
        );

        let mut ticker = tokio::time::interval_at(first_sweep, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Sweep task stopped");
                        return SweepExit::Stopped;
                    }
                }
                _ = ticker.tick() => run_sweep(&store),
            }
        }
    });

    SweepHandle {
        shutdown_tx,
        handle,
    }
}

// == Single Sweep ==
/// Runs one sweep. A panicking sweep is logged and counted, and the next
/// tick tries again.
fn run_sweep<K, V>(store: &EntryStore<K, V>)
where
    K: Eq + Hash,
    V: Clone,
{
    match panic::catch_unwind(AssertUnwindSafe(|| store.remove_stale())) {
        Ok(0) => debug!("Sweep: no stale entries found"),
        Ok(removed) => info!(
            "Sweep: removed {} stale entries, {} remain",
            removed,
            store.size()
        ),
        Err(_) => {
            store.recorder().record_failed_sweep();
            error!("Sweep failed, retrying on next tick");
        }
    }
}
