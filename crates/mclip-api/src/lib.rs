//! Axum HTTP API for clip stitching.
//!
//! This crate provides:
//! - `POST /api/generate/stitch` over the trim-and-stitch pipeline
//! - Liveness, readiness and Prometheus endpoints
//! - Static serving of locally published output
//! - Rate limiting, request ids and security headers

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
