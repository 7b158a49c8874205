//! Clip trimming and stitching over the FFmpeg CLI.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Streaming HTTP downloads into scratch storage
//! - Scoped scratch files that are removed on every exit path
//! - The download, trim, manifest and stitch pipeline

pub mod command;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod manifest;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod scratch;
pub mod stitch;
pub mod tool;
pub mod trim;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use config::{PipelineConfig, RangeCheck};
pub use error::{MediaError, MediaResult};
pub use fetch::{HttpSource, MediaFetcher, MediaSource};
pub use logging::BatchLogger;
pub use manifest::{ConcatManifest, ConcatPlanner};
pub use pipeline::{
    DownloadedClip, PipelineError, PipelineResult, PipelineStage, StitchPipeline, StitchedOutput,
    TrimmedSegment,
};
pub use progress::{FfmpegProgress, StderrParser};
pub use scratch::{ScratchFile, ScratchSpace};
pub use stitch::Stitcher;
pub use tool::{FfmpegTool, MediaTool};
pub use trim::{ClipTrimmer, TrimFailure};
