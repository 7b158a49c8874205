//! FFmpeg stderr parsing.
//!
//! With `-progress pipe:2` FFmpeg interleaves `key=value` progress records and
//! ordinary log lines on stderr. [`StderrParser`] splits the two: progress
//! records are folded into [`FfmpegProgress`] snapshots, everything else is
//! kept as diagnostic text for error reporting.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of diagnostic lines retained for error messages.
const MAX_DIAGNOSTIC_LINES: usize = 40;

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Calculate progress percentage given total duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }
}

/// Incremental parser for FFmpeg stderr.
#[derive(Debug, Default)]
pub struct StderrParser {
    current: FfmpegProgress,
    diagnostics: VecDeque<String>,
}

impl StderrParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one stderr line. Returns a snapshot when a progress block ends.
    pub fn feed(&mut self, line: &str) -> Option<FfmpegProgress> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match split_progress_record(line) {
            Some((key, value)) => self.apply(key, value),
            None => {
                if self.diagnostics.len() == MAX_DIAGNOSTIC_LINES {
                    self.diagnostics.pop_front();
                }
                self.diagnostics.push_back(line.to_string());
                None
            }
        }
    }

    /// Retained diagnostic lines joined with newlines, if any were seen.
    pub fn diagnostics(&self) -> Option<String> {
        if self.diagnostics.is_empty() {
            None
        } else {
            Some(self.diagnostics.iter().cloned().collect::<Vec<_>>().join("\n"))
        }
    }

    fn apply(&mut self, key: &str, value: &str) -> Option<FfmpegProgress> {
        match key {
            "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            // Despite its name FFmpeg reports microseconds here too
            "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.current.frame = frame;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.current.speed = speed;
                }
            }
            "progress" => {
                if value == "end" {
                    self.current.is_complete = true;
                }
                return Some(self.current.clone());
            }
            _ => {}
        }
        None
    }
}

/// Split a `key=value` progress record. Log lines never have a bare
/// lowercase identifier before the first `=`.
fn split_progress_record(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let is_key = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    is_key.then_some((key, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_block() {
        let mut parser = StderrParser::new();
        assert!(parser.feed("frame=120").is_none());
        assert!(parser.feed("out_time_us=5000000").is_none());
        assert!(parser.feed("speed=2.5x").is_none());

        let snapshot = parser.feed("progress=continue").unwrap();
        assert_eq!(snapshot.frame, 120);
        assert_eq!(snapshot.out_time_ms, 5000);
        assert!((snapshot.speed - 2.5).abs() < 0.01);
        assert!(!snapshot.is_complete);

        let done = parser.feed("progress=end").unwrap();
        assert!(done.is_complete);
        assert!(parser.diagnostics().is_none());
    }

    #[test]
    fn test_diagnostics_are_separated() {
        let mut parser = StderrParser::new();
        parser.feed("frame=1");
        parser.feed("[mov,mp4,m4a,3gp,3g2,mj2 @ 0x55d] moov atom not found");
        parser.feed("/tmp/x.mp4: Invalid data found when processing input");
        parser.feed("speed=N/A");

        let diag = parser.diagnostics().unwrap();
        assert!(diag.contains("moov atom not found"));
        assert!(diag.contains("Invalid data found"));
        assert!(!diag.contains("frame=1"));
    }

    #[test]
    fn test_diagnostics_are_bounded() {
        let mut parser = StderrParser::new();
        for i in 0..100 {
            parser.feed(&format!("Error line {}", i));
        }
        let diag = parser.diagnostics().unwrap();
        assert_eq!(diag.lines().count(), MAX_DIAGNOSTIC_LINES);
        assert!(diag.ends_with("Error line 99"));
    }

    #[test]
    fn test_progress_percentage() {
        let progress = FfmpegProgress {
            out_time_ms: 5000,
            ..Default::default()
        };

        assert!((progress.percentage(10000) - 50.0).abs() < 0.01);
        assert!((progress.percentage(5000) - 100.0).abs() < 0.01);
        assert_eq!(progress.percentage(0), 0.0);
    }
}
