//! HTTP-level Prometheus metrics.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return the render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "mclip_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "mclip_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "mclip_http_requests_in_flight";

    // Stitch endpoint
    pub const STITCH_REQUESTS_TOTAL: &str = "mclip_stitch_requests_total";
    pub const PUBLISH_DURATION_SECONDS: &str = "mclip_publish_duration_seconds";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "mclip_rate_limit_hits_total";
}

/// Count one finished HTTP request and its latency.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a stitch request outcome (`ok` or an error code).
pub fn record_stitch_request(code: &'static str) {
    counter!(names::STITCH_REQUESTS_TOTAL, "code" => code).increment(1);
}

/// Record how long the publisher took.
pub fn record_publish_duration(publisher: &'static str, duration_secs: f64) {
    histogram!(names::PUBLISH_DURATION_SECONDS, "publisher" => publisher).record(duration_secs);
}

pub fn record_rate_limit_hit(path: &str) {
    counter!(names::RATE_LIMIT_HITS_TOTAL, "path" => sanitize_path(path)).increment(1);
}

/// Collapse per-object paths so labels stay bounded.
fn sanitize_path(path: &str) -> String {
    if path.starts_with("/media/") {
        "/media/:key".to_string()
    } else {
        path.to_string()
    }
}

/// One slot of the in-flight gauge, released on drop.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);
    }
}

/// Records count, latency and in-flight requests for every route.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = {
        let _in_flight = InFlight::enter();
        next.run(request).await
    };

    record_http_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
