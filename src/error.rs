//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::cache::CacheState;

// == Cache Error Enum ==
/// Unified error type for the cache and its lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Timing parameters that make no sense (zero durations)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A lifecycle hook was called from a state that does not allow it
    #[error("Cannot {operation} while cache is {state}")]
    InvalidState {
        operation: &'static str,
        state: CacheState,
    },

    /// The background sweep could not be started or stopped cleanly
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidState { .. } => StatusCode::CONFLICT,
            CacheError::Scheduler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
