//! Liveness and readiness probes.

use std::fmt::Display;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Liveness probe; never touches dependencies.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: Probe,
    pub publisher: Probe,
}

/// Outcome of one dependency probe.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Probe {
    Ok { detail: String, latency_ms: u64 },
    Error { error: String },
}

impl Probe {
    fn from_result<T: Display, E: Display>(result: Result<T, E>, started: Instant) -> Self {
        match result {
            Ok(detail) => Probe::Ok {
                detail: detail.to_string(),
                latency_ms: started.elapsed().as_millis() as u64,
            },
            Err(e) => Probe::Error { error: e.to_string() },
        }
    }

    fn is_ok(&self) -> bool {
        matches!(self, Probe::Ok { .. })
    }
}

/// Readiness probe: FFmpeg resolves and the publisher's store is reachable.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let started = Instant::now();
    let ffmpeg = Probe::from_result(
        state.pipeline.check_tool().map(|path| path.display().to_string()),
        started,
    );

    let started = Instant::now();
    let publisher = Probe::from_result(
        state.publisher.check().await.map(|()| state.publisher.name()),
        started,
    );

    let all_ok = ffmpeg.is_ok() && publisher.is_ok();
    let response = Json(ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" },
        checks: ReadinessChecks { ffmpeg, publisher },
    });

    if all_ok {
        Ok(response)
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, response))
    }
}
