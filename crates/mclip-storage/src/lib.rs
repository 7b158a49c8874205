//! Durable storage for stitched output.
//!
//! This crate provides:
//! - The `Publisher` seam used by the upload step
//! - A local-directory publisher served over HTTP
//! - A Cloudflare R2 publisher
//! - Output key layout and validation

pub mod config;
pub mod error;
pub mod fs_utils;
pub mod local;
pub mod publisher;
pub mod r2;

pub use config::{PublisherConfig, PublisherKind};
pub use error::{StorageError, StorageResult};
pub use local::LocalPublisher;
pub use publisher::{output_key, public_url, validate_key, Publisher};
pub use r2::{R2Config, R2Publisher};
