//! Pipeline configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mclip_models::EncodingConfig;

use crate::command::DEFAULT_FFMPEG_BINARY;

/// When trim ranges are checked relative to the download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeCheck {
    /// Check every clip's range before any download starts.
    #[default]
    BeforeDownload,
    /// Check each clip's range after its download, right before trimming.
    AfterDownload,
}

impl FromStr for RangeCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "before_download" | "before" | "upfront" => Ok(RangeCheck::BeforeDownload),
            "after_download" | "after" => Ok(RangeCheck::AfterDownload),
            other => Err(format!("unknown range check policy: {}", other)),
        }
    }
}

/// Stitch pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory for intermediate files
    pub scratch_dir: PathBuf,
    /// FFmpeg binary (name resolved via PATH, or absolute path)
    pub ffmpeg_path: PathBuf,
    /// Maximum size of one downloaded clip
    pub max_download_bytes: Option<u64>,
    /// HTTP connect timeout for source downloads
    pub connect_timeout: Duration,
    /// Range validation policy
    pub range_check: RangeCheck,
    /// Encoding applied to every trimmed segment
    pub encoding: EncodingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("mclip"),
            ffmpeg_path: PathBuf::from(DEFAULT_FFMPEG_BINARY),
            max_download_bytes: Some(2 * 1024 * 1024 * 1024), // 2GB
            connect_timeout: Duration::from_secs(10),
            range_check: RangeCheck::default(),
            encoding: EncodingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut encoding = defaults.encoding.clone();
        if let Some(preset) = std::env::var("FFMPEG_PRESET").ok().filter(|s| !s.is_empty()) {
            encoding = encoding.with_preset(preset);
        }
        if let Some(crf) = std::env::var("FFMPEG_CRF").ok().and_then(|s| s.parse().ok()) {
            encoding = encoding.with_crf(crf);
        }
        if std::env::var("FFMPEG_NVENC")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
        {
            encoding = encoding.with_nvenc();
        }

        Self {
            scratch_dir: std::env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            max_download_bytes: match std::env::var("MAX_DOWNLOAD_BYTES") {
                // 0 disables the limit
                Ok(s) => s.parse().ok().filter(|n| *n > 0),
                Err(_) => defaults.max_download_bytes,
            },
            connect_timeout: Duration::from_secs(
                std::env::var("DOWNLOAD_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            range_check: std::env::var("RANGE_CHECK")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            encoding,
        }
    }
}
