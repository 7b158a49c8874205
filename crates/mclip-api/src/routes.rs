//! Router assembly.

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

use crate::config::ApiConfig;
use crate::handlers::{health, ready, stitch_clips};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    ClientRateLimiter,
};
use crate::state::AppState;

/// Build the full application router.
///
/// `/metrics` is only mounted when a Prometheus handle is given, and
/// `/media` only when the publisher writes to a local directory.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .nest("/api", stitch_routes(&state.config))
        .merge(probe_routes());

    if let Some(handle) = metrics_handle {
        router = router.route("/metrics", get(move || async move { handle.render() }));
    }

    if let Some(root) = state.publisher.local_root() {
        router = router.nest_service("/media", ServeDir::new(root));
    }

    router
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers))
        .layer(from_fn(request_id))
        .layer(from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

/// Rate-limited, time-bounded stitch endpoint.
fn stitch_routes(config: &ApiConfig) -> Router<AppState> {
    let limiter = ClientRateLimiter::new(config.rate_limit_rps, config.rate_limit_burst);

    // Dropping a timed-out handler releases its scratch files
    Router::new()
        .route("/generate/stitch", post(stitch_clips))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(from_fn_with_state(limiter, rate_limit_middleware))
}

fn probe_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready))
}
