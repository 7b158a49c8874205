//! Trim-and-stitch pipeline.
//!
//! A batch is an ordered list of clips. Each clip is downloaded and trimmed in
//! turn, the trimmed segments are listed in a concat manifest in request
//! order, and the manifest is stitched into one output file:
//!
//! ```text
//! clips ─► [fetch ─► trim] × N ─► manifest ─► stitch ─► StitchedOutput
//! ```
//!
//! Every stage consumes the typed value produced by the previous one, so a
//! failure at any point returns before later stages can run. Intermediate
//! files are [`ScratchFile`] handles owned by the running future; they are
//! removed on every exit path.

mod error;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::Instrument;

use mclip_models::{BatchId, ClipRequest, ClipStage};

use crate::config::{PipelineConfig, RangeCheck};
use crate::command::FfmpegRunner;
use crate::error::MediaResult;
use crate::fetch::{HttpSource, MediaFetcher, MediaSource};
use crate::logging::BatchLogger;
use crate::manifest::ConcatPlanner;
use crate::metrics;
use crate::scratch::{ScratchFile, ScratchSpace};
use crate::stitch::Stitcher;
use crate::tool::{FfmpegTool, MediaTool};
use crate::trim::{ClipTrimmer, TrimFailure};

pub use error::{PipelineError, PipelineResult, PipelineStage};

/// A source clip in scratch storage, not yet trimmed.
#[derive(Debug)]
pub struct DownloadedClip {
    /// Position in the request
    pub order: usize,
    pub file: ScratchFile,
}

/// A trimmed clip waiting to be stitched.
#[derive(Debug)]
pub struct TrimmedSegment {
    /// Position in the request
    pub order: usize,
    pub file: ScratchFile,
    pub duration_secs: f64,
}

impl TrimmedSegment {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Result of a successful batch.
///
/// The output file is still a scratch file: it is deleted when this value is
/// dropped unless the caller takes it with [`StitchedOutput::into_file`] and
/// keeps it.
#[derive(Debug)]
pub struct StitchedOutput {
    file: ScratchFile,
    segment_count: usize,
    total_duration_secs: f64,
}

impl StitchedOutput {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Sum of the trimmed segment durations.
    pub fn total_duration_secs(&self) -> f64 {
        self.total_duration_secs
    }

    pub fn into_file(self) -> ScratchFile {
        self.file
    }
}

/// Per-clip stage tracking.
struct ClipTracker<'a> {
    index: usize,
    stage: ClipStage,
    logger: &'a BatchLogger,
}

impl<'a> ClipTracker<'a> {
    fn new(index: usize, logger: &'a BatchLogger) -> Self {
        Self {
            index,
            stage: ClipStage::Pending,
            logger,
        }
    }

    fn advance(&mut self, next: ClipStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal clip stage transition {} -> {}",
            self.stage,
            next
        );
        self.stage = next;
        self.logger.log_clip_stage(self.index, next);
    }
}

/// The trim-and-stitch pipeline.
///
/// Holds no per-batch state; one instance serves concurrent requests, each
/// run allocating its own uniquely named scratch files.
#[derive(Clone)]
pub struct StitchPipeline {
    fetcher: MediaFetcher,
    trimmer: ClipTrimmer,
    planner: ConcatPlanner,
    stitcher: Stitcher,
    tool: Arc<dyn MediaTool>,
    scratch: ScratchSpace,
    range_check: RangeCheck,
}

impl StitchPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(source: Arc<dyn MediaSource>, tool: Arc<dyn MediaTool>, scratch: ScratchSpace) -> Self {
        Self {
            fetcher: MediaFetcher::new(source, scratch.clone()),
            trimmer: ClipTrimmer::new(Arc::clone(&tool), scratch.clone()),
            planner: ConcatPlanner::new(scratch.clone()),
            stitcher: Stitcher::new(Arc::clone(&tool), scratch.clone()),
            tool,
            scratch,
            range_check: RangeCheck::default(),
        }
    }

    /// Build the production pipeline: HTTP source and FFmpeg.
    pub fn from_config(config: &PipelineConfig) -> MediaResult<Self> {
        let source = HttpSource::with_connect_timeout(config.connect_timeout)?
            .with_max_bytes(config.max_download_bytes);
        let tool = FfmpegTool::new(
            FfmpegRunner::new().with_binary(&config.ffmpeg_path),
            config.encoding.clone(),
        );

        Ok(Self::new(
            Arc::new(source),
            Arc::new(tool),
            ScratchSpace::new(&config.scratch_dir),
        )
        .with_range_check(config.range_check))
    }

    pub fn with_range_check(mut self, range_check: RangeCheck) -> Self {
        self.range_check = range_check;
        self
    }

    pub fn range_check(&self) -> RangeCheck {
        self.range_check
    }

    /// Check that the media tool can be invoked.
    pub fn check_tool(&self) -> MediaResult<PathBuf> {
        self.tool.check_available()
    }

    /// Run one batch to completion or first failure.
    pub async fn run(&self, batch_id: &BatchId, clips: &[ClipRequest]) -> PipelineResult<StitchedOutput> {
        let logger = BatchLogger::new(batch_id, "stitch");
        let span = logger.create_span();

        let result = self.run_stages(&logger, clips).instrument(span).await;

        match &result {
            Ok(output) => {
                metrics::record_batch("success", clips.len());
                logger.log_completion(&format!(
                    "{} segments, {:.3}s -> {}",
                    output.segment_count(),
                    output.total_duration_secs(),
                    output.path().display()
                ));
            }
            Err(e) => {
                metrics::record_batch("failure", clips.len());
                metrics::record_stage_failure(e.stage().as_str());
                logger.log_error(&format!("{} stage: {}", e.stage(), e));
            }
        }

        result
    }

    async fn run_stages(&self, logger: &BatchLogger, clips: &[ClipRequest]) -> PipelineResult<StitchedOutput> {
        if clips.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }

        logger.log_start(&format!("{} clips", clips.len()));
        self.scratch.ensure_root().await.map_err(PipelineError::Scratch)?;

        if self.range_check == RangeCheck::BeforeDownload {
            for (index, clip) in clips.iter().enumerate() {
                clip.trim_range()
                    .map_err(|source| PipelineError::InvalidRange { index, source })?;
            }
        }

        let mut segments = Vec::with_capacity(clips.len());
        for (index, clip) in clips.iter().enumerate() {
            segments.push(self.process_clip(logger, index, clip).await?);
        }

        let paths: Vec<&Path> = segments.iter().map(TrimmedSegment::path).collect();
        let manifest = self.planner.write(&paths).await.map_err(PipelineError::Manifest)?;

        let stitched = self.stitcher.stitch(&manifest).await.map_err(PipelineError::Stitch)?;

        for segment in &segments {
            logger.log_clip_stage(segment.order, ClipStage::Consumed);
        }

        let segment_count = segments.len();
        let total_duration_secs = segments.iter().map(|s| s.duration_secs).sum();

        manifest.release().await;
        for segment in segments {
            let order = segment.order;
            segment.file.release().await;
            logger.log_clip_stage(order, ClipStage::Deleted);
        }

        Ok(StitchedOutput {
            file: stitched,
            segment_count,
            total_duration_secs,
        })
    }

    /// Download and trim one clip.
    async fn process_clip(
        &self,
        logger: &BatchLogger,
        index: usize,
        clip: &ClipRequest,
    ) -> PipelineResult<TrimmedSegment> {
        let mut tracker = ClipTracker::new(index, logger);
        let downloaded = self.download(&mut tracker, clip).await?;
        self.trim(&mut tracker, downloaded, clip).await
    }

    async fn download(
        &self,
        tracker: &mut ClipTracker<'_>,
        clip: &ClipRequest,
    ) -> PipelineResult<DownloadedClip> {
        let index = tracker.index;
        match self.fetcher.fetch(&clip.video_url).await {
            Ok(file) => {
                tracker.advance(ClipStage::Downloaded);
                Ok(DownloadedClip { order: index, file })
            }
            Err(source) => {
                tracker.advance(ClipStage::DownloadFailed);
                Err(PipelineError::Download { index, source })
            }
        }
    }

    /// Trim a downloaded clip; the source file is released either way.
    async fn trim(
        &self,
        tracker: &mut ClipTracker<'_>,
        downloaded: DownloadedClip,
        clip: &ClipRequest,
    ) -> PipelineResult<TrimmedSegment> {
        let index = downloaded.order;
        let file = match self
            .trimmer
            .trim(downloaded.file.path(), clip.trim_start, clip.trim_end)
            .await
        {
            Ok(file) => file,
            Err(TrimFailure::InvalidRange(source)) => {
                tracker.advance(ClipStage::TrimFailed);
                return Err(PipelineError::InvalidRange { index, source });
            }
            Err(TrimFailure::Tool(source)) => {
                tracker.advance(ClipStage::TrimFailed);
                return Err(PipelineError::Trim { index, source });
            }
        };

        downloaded.file.release().await;
        tracker.advance(ClipStage::Trimmed);

        Ok(TrimmedSegment {
            order: index,
            file,
            duration_secs: clip.trim_end - clip.trim_start,
        })
    }
}
