use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use mclip_models::{BatchId, ClipRequest, TrimRange};

use super::*;
use crate::error::{MediaError, MediaResult};
use crate::fetch::MediaSource;
use crate::scratch::ScratchSpace;
use crate::tool::MediaTool;

/// Serves fixed bodies by URL; unknown URLs fail like an HTTP 404.
#[derive(Default)]
struct FakeSource {
    bodies: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl FakeSource {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSource for FakeSource {
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<u64> {
        self.fetched.lock().unwrap().push(url.to_string());
        let body = self.bodies.get(url).ok_or_else(|| {
            MediaError::download_failed(format!("Failed to download video: {} (HTTP 404 Not Found)", url))
        })?;
        tokio::fs::write(dest, body).await?;
        Ok(body.len() as u64)
    }
}

/// Writes `<input>[start-end]` for trims and joins manifest entries with `|`.
#[derive(Default)]
struct FakeTool {
    trims: AtomicUsize,
    concats: AtomicUsize,
    fail_trim_at: Option<usize>,
    fail_concat: bool,
}

#[async_trait]
impl MediaTool for FakeTool {
    async fn trim(&self, input: &Path, output: &Path, range: TrimRange) -> MediaResult<()> {
        let call = self.trims.fetch_add(1, Ordering::SeqCst);
        if self.fail_trim_at == Some(call) {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with exit status: 1",
                Some("moov atom not found".to_string()),
                Some(1),
            ));
        }
        let body = tokio::fs::read_to_string(input).await?;
        let content = format!("{}[{}-{}]", body, range.start(), range.end());
        tokio::fs::write(output, content).await?;
        Ok(())
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> MediaResult<()> {
        self.concats.fetch_add(1, Ordering::SeqCst);
        if self.fail_concat {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with exit status: 1",
                Some("Non-monotonous DTS".to_string()),
                Some(1),
            ));
        }

        let listing = tokio::fs::read_to_string(manifest).await?;
        let mut parts = Vec::new();
        for line in listing.lines() {
            let quoted = line.strip_prefix("file ").unwrap_or(line);
            let path = quoted
                .trim_matches('\'')
                .replace(r"'\''", "'");
            parts.push(tokio::fs::read_to_string(path).await?);
        }
        tokio::fs::write(output, parts.join("|")).await?;
        Ok(())
    }

    fn check_available(&self) -> MediaResult<PathBuf> {
        Ok(PathBuf::from("/usr/bin/fake"))
    }
}

struct Harness {
    _dir: TempDir,
    root: PathBuf,
    source: Arc<FakeSource>,
    tool: Arc<FakeTool>,
    pipeline: StitchPipeline,
}

fn harness(source: FakeSource, tool: FakeTool) -> Harness {
    harness_in(source, tool, "scratch")
}

fn harness_in(source: FakeSource, tool: FakeTool, root_name: &str) -> Harness {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join(root_name);
    let source = Arc::new(source);
    let tool = Arc::new(tool);
    let pipeline = StitchPipeline::new(source.clone(), tool.clone(), ScratchSpace::new(&root));
    Harness {
        _dir: dir,
        root,
        source,
        tool,
        pipeline,
    }
}

fn scratch_entries(root: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(root) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

fn clip(url: &str, start: f64, end: f64) -> ClipRequest {
    ClipRequest::new(url, start, end)
}

fn two_sources() -> FakeSource {
    FakeSource::default()
        .with("https://cdn.test/a.mp4", "A")
        .with("https://cdn.test/b.mp4", "B")
}

#[tokio::test]
async fn test_stitches_segments_in_request_order() {
    let h = harness(two_sources(), FakeTool::default());
    let clips = vec![
        clip("https://cdn.test/a.mp4", 0.0, 5.0),
        clip("https://cdn.test/b.mp4", 2.0, 7.0),
    ];

    let output = h.pipeline.run(&BatchId::new(), &clips).await.unwrap();

    assert_eq!(output.segment_count(), 2);
    assert!((output.total_duration_secs() - 10.0).abs() < f64::EPSILON);
    let stitched = std::fs::read_to_string(output.path()).unwrap();
    assert_eq!(stitched, "A[0-5]|B[2-7]");

    // Only the output remains in scratch
    assert_eq!(scratch_entries(&h.root), vec![output.path().to_path_buf()]);

    let path = output.path().to_path_buf();
    drop(output);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_reversed_order_is_kept() {
    let h = harness(two_sources(), FakeTool::default());
    let clips = vec![
        clip("https://cdn.test/b.mp4", 1.0, 2.0),
        clip("https://cdn.test/a.mp4", 3.0, 4.0),
    ];

    let output = h.pipeline.run(&BatchId::new(), &clips).await.unwrap();
    let stitched = std::fs::read_to_string(output.path()).unwrap();
    assert_eq!(stitched, "B[1-2]|A[3-4]");
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let h = harness(two_sources(), FakeTool::default());

    let err = h.pipeline.run(&BatchId::new(), &[]).await.unwrap_err();
    assert!(matches!(err, PipelineError::EmptyBatch));
    assert!(h.source.fetched().is_empty());
}

#[tokio::test]
async fn test_invalid_range_fails_before_any_download() {
    let h = harness(two_sources(), FakeTool::default());
    let clips = vec![
        clip("https://cdn.test/a.mp4", 0.0, 5.0),
        clip("https://cdn.test/b.mp4", 5.0, 3.0),
    ];

    let err = h.pipeline.run(&BatchId::new(), &clips).await.unwrap_err();

    assert_eq!(err.stage(), PipelineStage::InvalidRange);
    assert_eq!(err.clip_index(), Some(1));
    assert!(h.source.fetched().is_empty());
    assert_eq!(h.tool.trims.load(Ordering::SeqCst), 0);
    assert!(scratch_entries(&h.root).is_empty());
}

#[tokio::test]
async fn test_equal_start_and_end_is_invalid() {
    let h = harness(two_sources(), FakeTool::default());
    let clips = vec![clip("https://cdn.test/a.mp4", 4.0, 4.0)];

    let err = h.pipeline.run(&BatchId::new(), &clips).await.unwrap_err();
    assert_eq!(err.stage(), PipelineStage::InvalidRange);
}

#[tokio::test]
async fn test_after_download_policy_downloads_before_checking() {
    let mut h = harness(two_sources(), FakeTool::default());
    h.pipeline = h.pipeline.clone().with_range_check(RangeCheck::AfterDownload);
    let clips = vec![
        clip("https://cdn.test/a.mp4", 0.0, 5.0),
        clip("https://cdn.test/b.mp4", 5.0, 3.0),
    ];

    let err = h.pipeline.run(&BatchId::new(), &clips).await.unwrap_err();

    assert_eq!(err.stage(), PipelineStage::InvalidRange);
    assert_eq!(err.clip_index(), Some(1));
    assert_eq!(
        h.source.fetched(),
        vec!["https://cdn.test/a.mp4", "https://cdn.test/b.mp4"]
    );
    // The invalid clip never reaches the tool
    assert_eq!(h.tool.trims.load(Ordering::SeqCst), 1);
    assert!(scratch_entries(&h.root).is_empty());
}

#[tokio::test]
async fn test_download_failure_stops_batch_and_cleans_up() {
    let h = harness(two_sources(), FakeTool::default());
    let clips = vec![
        clip("https://cdn.test/a.mp4", 0.0, 1.0),
        clip("https://cdn.test/missing.mp4", 0.0, 1.0),
        clip("https://cdn.test/b.mp4", 0.0, 1.0),
    ];

    let err = h.pipeline.run(&BatchId::new(), &clips).await.unwrap_err();

    assert_eq!(err.stage(), PipelineStage::Download);
    assert_eq!(err.clip_index(), Some(1));
    assert!(err.to_string().contains("HTTP 404"));
    // Later clips are never fetched and the failed clip is never trimmed
    assert_eq!(h.source.fetched().len(), 2);
    assert_eq!(h.tool.trims.load(Ordering::SeqCst), 1);
    assert_eq!(h.tool.concats.load(Ordering::SeqCst), 0);
    assert!(scratch_entries(&h.root).is_empty());
}

#[tokio::test]
async fn test_trim_failure_carries_diagnostics() {
    let tool = FakeTool {
        fail_trim_at: Some(1),
        ..Default::default()
    };
    let h = harness(two_sources(), tool);
    let clips = vec![
        clip("https://cdn.test/a.mp4", 0.0, 1.0),
        clip("https://cdn.test/b.mp4", 0.0, 1.0),
    ];

    let err = h.pipeline.run(&BatchId::new(), &clips).await.unwrap_err();

    assert_eq!(err.stage(), PipelineStage::Trim);
    assert_eq!(err.clip_index(), Some(1));
    assert_eq!(err.diagnostics(), Some("moov atom not found"));
    assert_eq!(h.tool.concats.load(Ordering::SeqCst), 0);
    assert!(scratch_entries(&h.root).is_empty());
}

#[tokio::test]
async fn test_stitch_failure_cleans_up_segments_and_manifest() {
    let tool = FakeTool {
        fail_concat: true,
        ..Default::default()
    };
    let h = harness(two_sources(), tool);
    let clips = vec![
        clip("https://cdn.test/a.mp4", 0.0, 1.0),
        clip("https://cdn.test/b.mp4", 0.0, 1.0),
    ];

    let err = h.pipeline.run(&BatchId::new(), &clips).await.unwrap_err();

    assert_eq!(err.stage(), PipelineStage::Stitch);
    assert_eq!(err.diagnostics(), Some("Non-monotonous DTS"));
    assert!(!err.is_client_error());
    assert!(scratch_entries(&h.root).is_empty());
}

#[tokio::test]
async fn test_manifest_failure_cleans_up_segments() {
    // Segment paths under this root cannot be written to a manifest
    let h = harness_in(two_sources(), FakeTool::default(), "bad\nroot");
    let clips = vec![clip("https://cdn.test/a.mp4", 0.0, 1.0)];

    let err = h.pipeline.run(&BatchId::new(), &clips).await.unwrap_err();

    assert_eq!(err.stage(), PipelineStage::Manifest);
    assert_eq!(h.tool.trims.load(Ordering::SeqCst), 1);
    assert_eq!(h.tool.concats.load(Ordering::SeqCst), 0);
    assert!(scratch_entries(&h.root).is_empty());
}

#[tokio::test]
async fn test_repeated_runs_use_distinct_outputs() {
    let h = harness(two_sources(), FakeTool::default());
    let clips = vec![clip("https://cdn.test/a.mp4", 0.0, 1.0)];

    let first = h.pipeline.run(&BatchId::new(), &clips).await.unwrap();
    let second = h.pipeline.run(&BatchId::new(), &clips).await.unwrap();

    assert_ne!(first.path(), second.path());
    assert_eq!(
        std::fs::read_to_string(first.path()).unwrap(),
        std::fs::read_to_string(second.path()).unwrap()
    );
    assert_eq!(scratch_entries(&h.root).len(), 2);
}

#[tokio::test]
async fn test_concurrent_runs_do_not_collide() {
    let h = harness(two_sources(), FakeTool::default());
    let a = vec![clip("https://cdn.test/a.mp4", 0.0, 1.0)];
    let b = vec![clip("https://cdn.test/b.mp4", 0.0, 1.0)];

    let (id_a, id_b) = (BatchId::new(), BatchId::new());

    let (first, second) = tokio::join!(h.pipeline.run(&id_a, &a), h.pipeline.run(&id_b, &b));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(std::fs::read_to_string(first.path()).unwrap(), "A[0-1]");
    assert_eq!(std::fs::read_to_string(second.path()).unwrap(), "B[0-1]");
}

#[tokio::test]
async fn test_kept_output_survives_drop() {
    let h = harness(two_sources(), FakeTool::default());
    let clips = vec![clip("https://cdn.test/a.mp4", 0.0, 1.0)];

    let output = h.pipeline.run(&BatchId::new(), &clips).await.unwrap();
    let path = output.into_file().keep();

    assert!(path.exists());
}

#[test]
fn test_check_tool_delegates() {
    let h = harness(two_sources(), FakeTool::default());
    assert_eq!(h.pipeline.check_tool().unwrap(), PathBuf::from("/usr/bin/fake"));
}
