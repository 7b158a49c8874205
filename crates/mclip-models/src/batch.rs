//! Batch identifiers and clip processing stages.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one stitch batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    /// Generate a new random batch ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing stage of a single clip within a batch.
///
/// `Pending -> Downloaded -> Trimmed -> Consumed -> Deleted`, with
/// `DownloadFailed` and `TrimFailed` as terminal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipStage {
    #[default]
    Pending,
    Downloaded,
    Trimmed,
    /// Read by the stitcher
    Consumed,
    Deleted,
    DownloadFailed,
    TrimFailed,
}

impl ClipStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipStage::Pending => "pending",
            ClipStage::Downloaded => "downloaded",
            ClipStage::Trimmed => "trimmed",
            ClipStage::Consumed => "consumed",
            ClipStage::Deleted => "deleted",
            ClipStage::DownloadFailed => "download_failed",
            ClipStage::TrimFailed => "trim_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClipStage::Deleted | ClipStage::DownloadFailed | ClipStage::TrimFailed
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ClipStage::DownloadFailed | ClipStage::TrimFailed)
    }

    /// Whether `next` is a legal successor of this stage.
    pub fn can_advance_to(&self, next: ClipStage) -> bool {
        use ClipStage::*;
        matches!(
            (self, next),
            (Pending, Downloaded)
                | (Pending, DownloadFailed)
                | (Downloaded, Trimmed)
                | (Downloaded, TrimFailed)
                | (Trimmed, Consumed)
                | (Trimmed, Deleted)
                | (Consumed, Deleted)
        )
    }
}

impl fmt::Display for ClipStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_ids_are_unique() {
        let a = BatchId::new();
        let b = BatchId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_stage_transitions() {
        assert!(ClipStage::Pending.can_advance_to(ClipStage::Downloaded));
        assert!(ClipStage::Downloaded.can_advance_to(ClipStage::TrimFailed));
        assert!(ClipStage::Trimmed.can_advance_to(ClipStage::Consumed));
        assert!(!ClipStage::Pending.can_advance_to(ClipStage::Trimmed));
        assert!(!ClipStage::DownloadFailed.can_advance_to(ClipStage::Downloaded));
        assert!(ClipStage::TrimFailed.is_terminal());
        assert!(ClipStage::TrimFailed.is_failure());
        assert!(!ClipStage::Deleted.is_failure());
    }

    #[test]
    fn test_stage_serde() {
        let json = serde_json::to_string(&ClipStage::DownloadFailed).unwrap();
        assert_eq!(json, "\"download_failed\"");
    }
}
