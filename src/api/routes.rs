//! API Routes
//!
//! Configures the Axum router with all control endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, pause_handler, resume_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Get cache statistics
/// - `POST /pause` - Pause all registered resources
/// - `POST /resume` - Resume all registered resources
///
/// # Middleware
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/pause", post(pause_handler))
        .route("/resume", post(resume_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
