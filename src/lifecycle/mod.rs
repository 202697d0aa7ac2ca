//! Lifecycle Module
//!
//! Pause/resume capability for components that hold time-sensitive state,
//! and a registry that drives them through a cycle together. How the pause
//! itself is triggered (external command, HTTP call, test harness) is up to
//! whoever calls the manager.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::Result;

// == Pause Aware ==
/// A component that must be told before the process pauses and after it
/// resumes.
#[async_trait]
pub trait PauseAware: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Brings the component to a quiescent state. Returns once done.
    async fn before_pause(&self) -> Result<()>;

    /// Restarts the component. Returns once done.
    async fn after_resume(&self) -> Result<()>;
}

// == Lifecycle Manager ==
/// Registry of pause-aware resources.
///
/// Resources are paused in reverse registration order and resumed in
/// registration order, so a resource registered after its dependencies is
/// stopped before them and started after them. Cycles never overlap.
#[derive(Default)]
pub struct LifecycleManager {
    resources: RwLock<Vec<Arc<dyn PauseAware>>>,
    cycle: Mutex<()>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource to every future cycle.
    pub fn register(&self, resource: Arc<dyn PauseAware>) {
        info!("Registered pause-aware resource: {}", resource.name());
        self.resources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn PauseAware>> {
        self.resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // == Pause All ==
    /// Calls `before_pause` on every resource, newest first.
    ///
    /// A failing resource is logged and skipped; the first error is returned
    /// after all resources have been visited.
    pub async fn pause_all(&self) -> Result<()> {
        let _cycle = self.cycle.lock().await;
        info!("before_pause() called on {} resources", self.len());
        let mut first_error = None;
        for resource in self.snapshot().iter().rev() {
            if let Err(err) = resource.before_pause().await {
                warn!("{} failed to pause: {}", resource.name(), err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // == Resume All ==
    /// Calls `after_resume` on every resource, oldest first. Same error
    /// policy as `pause_all`.
    pub async fn resume_all(&self) -> Result<()> {
        let _cycle = self.cycle.lock().await;
        info!("after_resume() called on {} resources", self.len());
        let mut first_error = None;
        for resource in self.snapshot().iter() {
            if let Err(err) = resource.after_resume().await {
                warn!("{} failed to resume: {}", resource.name(), err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // == Checkpoint ==
    /// Pauses everything, holds the pause for `pause`, then resumes.
    ///
    /// Stands in for an external checkpoint that freezes the process.
    /// Resuming is attempted even if pausing reported an error.
    pub async fn checkpoint(&self, pause: Duration) -> Result<()> {
        info!("Creating checkpoint, pausing for {:?}", pause);
        let paused = self.pause_all().await;
        tokio::time::sleep(pause).await;
        let resumed = self.resume_all().await;
        info!("Restored from checkpoint");
        paused.and(resumed)
    }
}
