//! API Handlers
//!
//! HTTP request handlers for each control endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::error::Result;
use crate::lifecycle::LifecycleManager;
use crate::models::{HealthResponse, LifecycleResponse, StatsResponse};
use crate::tasks::PrimeCache;

/// Application state shared across all handlers.
///
/// The cache is read for stats; pause and resume go through the lifecycle
/// manager so every registered resource takes part.
#[derive(Clone)]
pub struct AppState {
    /// Cache observed by the stats endpoint
    pub cache: Arc<PrimeCache>,
    /// Drives pause/resume across registered resources
    pub lifecycle: Arc<LifecycleManager>,
}

impl AppState {
    /// Creates a new AppState.
    pub fn new(cache: Arc<PrimeCache>, lifecycle: Arc<LifecycleManager>) -> Self {
        Self { cache, lifecycle }
    }
}

/// Handler for GET /stats
///
/// Returns current cache statistics and lifecycle state.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = &state.cache;
    Json(StatsResponse::new(
        cache.state(),
        &cache.stats(),
        cache.logical_now().as_millis() as u64,
        cache.total_paused().as_millis() as u64,
    ))
}

/// Handler for POST /pause
///
/// Pauses every registered resource. Responds 409 if the cache was not
/// running.
pub async fn pause_handler(State(state): State<AppState>) -> Result<Json<LifecycleResponse>> {
    state.lifecycle.pause_all().await?;
    Ok(Json(LifecycleResponse::new(
        "Resources paused",
        state.cache.state(),
    )))
}

/// Handler for POST /resume
///
/// Resumes every registered resource. Responds 409 if the cache was not
/// paused.
pub async fn resume_handler(State(state): State<AppState>) -> Result<Json<LifecycleResponse>> {
    state.lifecycle.resume_all().await?;
    Ok(Json(LifecycleResponse::new(
        "Resources resumed",
        state.cache.state(),
    )))
}

/// Handler for GET /health
///
/// Returns health status of the process.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheSettings, CacheState, TimedCache};
    use crate::error::CacheError;
    use std::time::Duration;

    fn test_state() -> AppState {
        let cache = Arc::new(
            TimedCache::new(CacheSettings::new(
                Duration::from_secs(50),
                Duration::from_secs(12),
            ))
            .unwrap(),
        );
        let lifecycle = Arc::new(LifecycleManager::new());
        lifecycle.register(cache.clone());
        AppState::new(cache, lifecycle)
    }

    #[tokio::test]
    async fn test_pause_and_resume_handlers() {
        let state = test_state();

        let response = pause_handler(State(state.clone())).await.unwrap();
        assert_eq!(response.state, CacheState::Paused);

        let response = resume_handler(State(state.clone())).await.unwrap();
        assert_eq!(response.state, CacheState::Running);
    }

    #[tokio::test]
    async fn test_double_pause_is_rejected() {
        let state = test_state();

        pause_handler(State(state.clone())).await.unwrap();
        let result = pause_handler(State(state.clone())).await;
        assert!(matches!(result, Err(CacheError::InvalidState { .. })));
        assert_eq!(state.cache.state(), CacheState::Paused);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        state.cache.put(7, true);
        state.cache.get(&7);
        state.cache.get(&8);

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 1);
        assert_eq!(response.misses, 1);
        assert_eq!(response.total_entries, 1);
        assert_eq!(response.state, CacheState::Running);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
