//! Stitch handler.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use tracing::{debug, info};

use mclip_models::{BatchId, StitchRequest, StitchResponse};
use mclip_storage::output_key;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Trim each clip, stitch them in order, and publish the result.
pub async fn stitch_clips(
    State(state): State<AppState>,
    payload: Result<Json<StitchRequest>, JsonRejection>,
) -> Result<Json<StitchResponse>, Response> {
    let result = run_stitch(&state, payload).await;
    metrics::record_stitch_request(match &result {
        Ok(_) => "ok",
        Err(e) => e.code(),
    });
    result
        .map(Json)
        .map_err(|e| e.into_response_for(&state.config))
}

async fn run_stitch(
    state: &AppState,
    payload: Result<Json<StitchRequest>, JsonRejection>,
) -> ApiResult<StitchResponse> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected stitch payload: {}", rejection.body_text());
        ApiError::bad_request("Invalid payload")
    })?;
    request
        .validate()
        .map_err(|e| ApiError::bad_request(format!("Invalid payload: {}", e)))?;

    let batch_id = BatchId::new();
    let output = state.pipeline.run(&batch_id, &request.clips).await?;

    let clip_count = output.segment_count();
    let total_duration_secs = output.total_duration_secs();
    let file = output.into_file();

    let key = output_key(&batch_id, Utc::now());
    let started = Instant::now();
    let output_url = state.publisher.publish(file.path(), &key).await?;
    metrics::record_publish_duration(state.publisher.name(), started.elapsed().as_secs_f64());

    // Publishers that copy leave the local file behind
    file.release().await;

    info!(
        batch_id = %batch_id,
        clips = clip_count,
        "Published stitched video to {}", output_url
    );

    Ok(StitchResponse {
        output_url,
        batch_id: batch_id.to_string(),
        clip_count,
        total_duration_secs,
    })
}
