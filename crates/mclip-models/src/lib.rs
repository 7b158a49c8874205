//! Shared data models for the mclip stitch service.
//!
//! This crate provides Serde-serializable types for:
//! - Stitch requests and responses (the HTTP contract)
//! - Validated trim ranges
//! - Batch identifiers and per-clip processing stages
//! - Encoding configuration shared by every trimmed segment

pub mod batch;
pub mod clip;
pub mod encoding;

// Re-export common types
pub use batch::{BatchId, ClipStage};
pub use clip::{ClipRequest, RangeError, StitchRequest, StitchResponse, TrimRange};
pub use encoding::EncodingConfig;
