//! Segment encoding configuration.
//!
//! Every trimmed segment of a batch is encoded with the same parameters so the
//! concat demuxer can join them with a stream copy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
pub const DEFAULT_PRESET: &str = "veryfast";
pub const DEFAULT_CRF: u8 = 23;
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 48_000;
/// Pixel format understood by every H.264 decoder
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Encoder settings applied to every trimmed segment.
///
/// Missing fields deserialize to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EncodingConfig {
    pub codec: String,
    pub preset: String,
    /// 0-51, lower is better; sent as `-cq` for NVENC
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Hz
    pub audio_sample_rate: u32,
    pub pixel_format: String,
    pub use_nvenc: bool,
    /// Appended after the generated output options
    pub extra_args: Vec<String>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.into(),
            preset: DEFAULT_PRESET.into(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.into(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.into(),
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            pixel_format: DEFAULT_PIXEL_FORMAT.into(),
            use_nvenc: false,
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Switch to the NVENC H.264 encoder.
    pub fn with_nvenc(mut self) -> Self {
        self.use_nvenc = true;
        self.codec = "h264_nvenc".into();
        self
    }

    /// FFmpeg output options for this encoding.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let quality_flag = if self.use_nvenc { "-cq" } else { "-crf" };

        [
            ("-c:v", self.codec.clone()),
            ("-preset", self.preset.clone()),
            (quality_flag, self.crf.to_string()),
            ("-pix_fmt", self.pixel_format.clone()),
            ("-c:a", self.audio_codec.clone()),
            ("-b:a", self.audio_bitrate.clone()),
            ("-ar", self.audio_sample_rate.to_string()),
        ]
        .into_iter()
        .flat_map(|(flag, value)| [flag.to_string(), value])
        .chain(self.extra_args.iter().cloned())
        .collect()
    }
}
