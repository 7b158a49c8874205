//! Stitch request/response models and trim ranges.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// One clip descriptor in a stitch batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClipRequest {
    /// Remote video location
    pub video_url: String,
    /// Trim start in seconds
    pub trim_start: f64,
    /// Trim end in seconds
    pub trim_end: f64,
}

impl ClipRequest {
    pub fn new(video_url: impl Into<String>, trim_start: f64, trim_end: f64) -> Self {
        Self {
            video_url: video_url.into(),
            trim_start,
            trim_end,
        }
    }

    /// Structural checks that do not depend on the trim window ordering.
    ///
    /// The ordering (`trim_end > trim_start`) is enforced by [`Self::trim_range`]
    /// inside the pipeline, so it fails with the range error taxonomy.
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.video_url)
            .map_err(|e| format!("Invalid videoUrl '{}': {}", self.video_url, e))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!(
                "Unsupported videoUrl scheme '{}', expected http or https",
                url.scheme()
            ));
        }

        if !self.trim_start.is_finite() || !self.trim_end.is_finite() {
            return Err("trimStart and trimEnd must be finite numbers".to_string());
        }

        if self.trim_start < 0.0 {
            return Err("trimStart cannot be negative".to_string());
        }

        Ok(())
    }

    /// Build the validated trim window for this clip.
    pub fn trim_range(&self) -> Result<TrimRange, RangeError> {
        TrimRange::new(self.trim_start, self.trim_end)
    }
}

/// Trim range validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    #[error("Trim values must be finite numbers")]
    NonFinite,

    #[error("trimStart cannot be negative (got {0})")]
    NegativeStart(f64),

    #[error("Invalid trim values; trimEnd ({end}) must be greater than trimStart ({start})")]
    EndNotAfterStart { start: f64, end: f64 },
}

/// A validated `[start, end)` window in seconds with `end > start >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct TrimRange {
    start: f64,
    end: f64,
}

impl TrimRange {
    pub fn new(start: f64, end: f64) -> Result<Self, RangeError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(RangeError::NonFinite);
        }
        if start < 0.0 {
            return Err(RangeError::NegativeStart(start));
        }
        if end - start <= 0.0 {
            return Err(RangeError::EndNotAfterStart { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Duration in seconds, always strictly positive.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Request body for `POST /api/generate/stitch`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StitchRequest {
    /// Clips in final playback order
    pub clips: Vec<ClipRequest>,
}

impl StitchRequest {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.clips.is_empty() {
            return Err("At least one clip is required".to_string());
        }

        for (index, clip) in self.clips.iter().enumerate() {
            clip.validate()
                .map_err(|e| format!("clips[{}]: {}", index, e))?;
        }

        Ok(())
    }

    /// Sum of requested clip durations (ignores invalid ranges).
    pub fn total_duration_secs(&self) -> f64 {
        self.clips
            .iter()
            .filter_map(|c| c.trim_range().ok())
            .map(|r| r.duration())
            .sum()
    }
}

/// Successful stitch response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StitchResponse {
    /// Public reference to the stitched video
    pub output_url: String,
    pub batch_id: String,
    pub clip_count: usize,
    /// Sum of the trimmed segment durations
    pub total_duration_secs: f64,
}
