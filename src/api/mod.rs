//! API Module
//!
//! HTTP handlers and routing for the demo process control API. This is the
//! process-side lifecycle trigger; the cache itself has no network surface.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics and lifecycle state
//! - `POST /pause` - Run `before_pause` on every registered resource
//! - `POST /resume` - Run `after_resume` on every registered resource

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
