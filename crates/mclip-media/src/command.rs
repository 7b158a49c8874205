//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{MediaError, MediaResult};
use crate::progress::{FfmpegProgress, StderrParser};

/// Default FFmpeg binary name, resolved through `PATH`.
pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";

/// Verbosity passed to `-v`; progress comes through `-progress` regardless.
const LOG_LEVEL: &str = "error";

/// One FFmpeg invocation: a single input, a single output, and the options
/// placed before and after `-i`.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    pre_input: Vec<String>,
    post_input: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            pre_input: Vec::new(),
            post_input: Vec::new(),
        }
    }

    /// Options that apply to the input (placed before `-i`).
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_input.extend(args.into_iter().map(Into::into));
        self
    }

    /// Options that apply to the output (placed after `-i`).
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_input.extend(args.into_iter().map(Into::into));
        self
    }

    /// Input-side seek, so decoding starts near `seconds`.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_args(["-ss".to_string(), format!("{:.3}", seconds)])
    }

    /// Limit how much of the input is read.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_args(["-t".to_string(), format!("{:.3}", seconds)])
    }

    /// Read the input as a concat-demuxer manifest.
    ///
    /// `-safe 0` is required because manifest entries are absolute paths
    /// (scratch roots are made absolute on construction).
    pub fn concat_input(self) -> Self {
        self.input_args(["-f", "concat", "-safe", "0"])
    }

    /// Copy every stream without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_args(["-c", "copy"])
    }

    /// Shift timestamps so the output starts at zero.
    pub fn reset_timestamps(self) -> Self {
        self.output_args(["-avoid_negative_ts", "make_zero"])
    }

    /// Move the moov atom to the front for progressive playback.
    pub fn faststart(self) -> Self {
        self.output_args(["-movflags", "+faststart"])
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Full argument list, without the binary.
    ///
    /// Always overwrites, never reads stdin, and reports progress as
    /// `key=value` lines on stderr.
    pub fn build_args(&self) -> Vec<String> {
        let global = ["-y", "-nostdin", "-v", LOG_LEVEL, "-progress", "pipe:2", "-nostats"];

        global
            .iter()
            .map(|s| s.to_string())
            .chain(self.pre_input.iter().cloned())
            .chain(["-i".to_string(), self.input.to_string_lossy().into_owned()])
            .chain(self.post_input.iter().cloned())
            .chain(std::iter::once(self.output.to_string_lossy().into_owned()))
            .collect()
    }
}

/// Runner for FFmpeg commands.
///
/// Stderr is parsed while the process runs: progress records go to the
/// callback, everything else is kept and attached to the error on failure.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: PathBuf,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a runner that resolves `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_FFMPEG_BINARY),
        }
    }

    /// Use a specific FFmpeg binary.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Resolve the configured binary to an executable path.
    pub fn check_available(&self) -> MediaResult<PathBuf> {
        which::which(&self.binary)
            .map_err(|e| MediaError::FfmpegNotFound(format!("{}: {}", self.binary.display(), e)))
    }

    /// Run `cmd` to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run `cmd`, passing each progress snapshot to `on_progress`.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        let binary = self.check_available()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", binary.display(), args.join(" "));

        let started = Instant::now();
        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr was not captured"))?;
        let parser_handle = tokio::spawn(drain_stderr(stderr, on_progress));

        let status = child.wait().await?;
        let diagnostics = parser_handle.await.ok().and_then(|p| p.diagnostics());

        debug!(
            "FFmpeg finished in {:.2}s with {}",
            started.elapsed().as_secs_f64(),
            status
        );

        if status.success() {
            Ok(())
        } else {
            let summary = diagnostics
                .as_deref()
                .and_then(|d| d.lines().last())
                .map(|last| format!("FFmpeg exited with {}: {}", status, last))
                .unwrap_or_else(|| format!("FFmpeg exited with {}", status));
            Err(MediaError::ffmpeg_failed(summary, diagnostics, status.code()))
        }
    }
}

/// Feed every stderr line to a parser until EOF.
///
/// Lines are read as bytes so one undecodable line does not end the stream.
async fn drain_stderr<R, F>(stderr: R, on_progress: F) -> StderrParser
where
    R: AsyncRead + Unpin,
    F: Fn(FfmpegProgress),
{
    let mut reader = BufReader::new(stderr);
    let mut parser = StderrParser::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if let Some(progress) = parser.feed(&line) {
                    trace!(
                        frame = progress.frame,
                        out_time_ms = progress.out_time_ms,
                        "FFmpeg progress"
                    );
                    on_progress(progress);
                }
            }
            Err(e) => {
                debug!("Stopped reading FFmpeg stderr: {}", e);
                break;
            }
        }
    }
    parser
}
