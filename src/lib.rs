//! Resume Cache - A time-aware in-memory cache
//!
//! Expires entries that have not been accessed within a timeout, sweeps
//! stale entries in the background, and keeps entry ages intact across a
//! process pause/resume cycle.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheSettings, CacheState, CacheStats, TimedCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use lifecycle::{LifecycleManager, PauseAware};
