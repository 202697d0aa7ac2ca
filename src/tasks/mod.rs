//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the process is
//! not paused.
//!
//! # Tasks
//! - Sweep: removes stale cache entries on a fixed cadence
//! - Workload: the demo prime-testing loop that exercises the cache

mod sweep;
mod workload;

pub use sweep::{spawn_sweep_task, SweepExit, SweepHandle};
pub use workload::{is_prime, run_once, PrimeCache, PrimeWorkload, RunReport, WorkloadSettings};
