//! External media tool seam.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use mclip_models::{EncodingConfig, TrimRange};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::metrics;

/// Operations the pipeline needs from the external media tool.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Write `range` of `input` to `output`.
    async fn trim(&self, input: &Path, output: &Path, range: TrimRange) -> MediaResult<()>;

    /// Join the segments listed in the concat `manifest` into `output`.
    async fn concat(&self, manifest: &Path, output: &Path) -> MediaResult<()>;

    /// Check that the tool can be invoked.
    fn check_available(&self) -> MediaResult<PathBuf>;
}

/// [`MediaTool`] implemented with the FFmpeg CLI.
///
/// Trimming re-encodes with one [`EncodingConfig`] so that every segment of a
/// batch shares codec parameters and the concat step can stream-copy.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    runner: FfmpegRunner,
    encoding: EncodingConfig,
}

impl FfmpegTool {
    pub fn new(runner: FfmpegRunner, encoding: EncodingConfig) -> Self {
        Self { runner, encoding }
    }

    /// Command used to trim one clip.
    pub fn trim_command(&self, input: &Path, output: &Path, range: TrimRange) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .seek(range.start())
            .duration(range.duration())
            .output_args(self.encoding.to_ffmpeg_args())
            .reset_timestamps()
            .faststart()
    }

    /// Command used to concatenate a manifest.
    pub fn concat_command(&self, manifest: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(manifest, output)
            .concat_input()
            .codec_copy()
            .faststart()
    }
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new(FfmpegRunner::new(), EncodingConfig::default())
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn trim(&self, input: &Path, output: &Path, range: TrimRange) -> MediaResult<()> {
        let cmd = self.trim_command(input, output, range);
        let total_ms = (range.duration() * 1000.0) as i64;
        let started = Instant::now();

        self.runner
            .run_with_progress(&cmd, move |progress| {
                debug!("Trim progress: {:.0}%", progress.percentage(total_ms));
            })
            .await?;

        metrics::record_stage_duration("trim", started.elapsed().as_secs_f64());
        Ok(())
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> MediaResult<()> {
        let cmd = self.concat_command(manifest, output);
        let started = Instant::now();

        self.runner.run(&cmd).await?;

        metrics::record_stage_duration("stitch", started.elapsed().as_secs_f64());
        Ok(())
    }

    fn check_available(&self) -> MediaResult<PathBuf> {
        self.runner.check_available()
    }
}
