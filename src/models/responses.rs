//! Response DTOs for the control API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheState, CacheStats};

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Lifecycle state of the cache
    pub state: CacheState,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses, stale reads included
    pub misses: u64,
    /// Number of stale entries removed by sweeps
    pub evictions: u64,
    /// Number of sweeps run
    pub sweeps: u64,
    /// Number of sweeps that failed
    pub failed_sweeps: u64,
    /// Number of completed pause/resume cycles
    pub pauses: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Logical time in milliseconds, paused intervals excluded
    pub logical_time_ms: u64,
    /// Total paused time in milliseconds
    pub total_paused_ms: u64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(
        state: CacheState,
        stats: &CacheStats,
        logical_time_ms: u64,
        total_paused_ms: u64,
    ) -> Self {
        Self {
            state,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            sweeps: stats.sweeps,
            failed_sweeps: stats.failed_sweeps,
            pauses: stats.pauses,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            logical_time_ms,
            total_paused_ms,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the lifecycle endpoints (POST /pause, POST /resume)
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleResponse {
    /// Success message
    pub message: String,
    /// Cache state after the transition
    pub state: CacheState,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl LifecycleResponse {
    /// Creates a new LifecycleResponse with current timestamp
    pub fn new(message: impl Into<String>, state: CacheState) -> Self {
        Self {
            message: message.into(),
            state,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            total_entries: 100,
            ..CacheStats::default()
        };
        let resp = StatsResponse::new(CacheState::Running, &stats, 1_000, 0);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.total_entries, 100);
    }

    #[test]
    fn test_stats_response_serialize() {
        let resp = StatsResponse::new(CacheState::Paused, &CacheStats::default(), 0, 250);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["state"], "paused");
        assert_eq!(json["total_paused_ms"], 250);
        assert_eq!(json["hit_rate"], 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_lifecycle_response_serialize() {
        let resp = LifecycleResponse::new("Cache paused", CacheState::Paused);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["message"], "Cache paused");
        assert_eq!(json["state"], "paused");
        assert!(json["timestamp"].is_string());
    }
}
