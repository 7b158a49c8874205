//! Cloudflare R2 publisher.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::publisher::{public_url, validate_key, Publisher};

/// Content type of stitched output.
const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Lifetime of presigned URLs when no public URL is configured (7 days, the S3 maximum).
const PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for the R2 publisher.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public bucket URL; presigned URLs are returned when unset
    pub public_url: Option<String>,
}

impl R2Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: required_var("R2_ENDPOINT_URL")?,
            access_key_id: required_var("R2_ACCESS_KEY_ID")?,
            secret_access_key: required_var("R2_SECRET_ACCESS_KEY")?,
            bucket_name: required_var("R2_BUCKET_NAME")?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_url: std::env::var("R2_PUBLIC_URL").ok().filter(|s| !s.is_empty()),
        })
    }
}

fn required_var(name: &str) -> StorageResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StorageError::config_error(format!("{} not set", name)))
}

/// Publishes by uploading to an R2 bucket.
#[derive(Clone)]
pub struct R2Publisher {
    client: Client,
    bucket: String,
    public_url: Option<String>,
}

impl R2Publisher {
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_url: config.public_url,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn presign_get(&self, key: &str) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(PRESIGN_EXPIRY)
            .map_err(|e| StorageError::AwsSdk(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::AwsSdk(e.to_string()))?;

        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl Publisher for R2Publisher {
    async fn publish(&self, local: &Path, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        debug!("Uploading {} to {}", local.display(), key);

        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(VIDEO_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}", local.display(), key);

        match &self.public_url {
            Some(base) => Ok(public_url(base, key)),
            None => self.presign_get(key).await,
        }
    }

    async fn check(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("R2 connectivity check failed: {}", e)))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "r2"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> R2Config {
        R2Config {
            endpoint_url: "http://127.0.0.1:9".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "clips".to_string(),
            region: "auto".to_string(),
            public_url: Some("https://pub.example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn test_publish_rejects_invalid_key_before_upload() {
        let publisher = R2Publisher::new(config());
        let err = publisher
            .publish(Path::new("/does/not/matter.mp4"), "/abs")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert_eq!(publisher.bucket(), "clips");
        assert_eq!(publisher.name(), "r2");
    }

    #[tokio::test]
    async fn test_presigned_url_without_public_url() {
        let mut cfg = config();
        cfg.public_url = None;
        let publisher = R2Publisher::new(cfg);

        let url = publisher.presign_get("stitched/x.mp4").await.unwrap();
        assert!(url.contains("stitched/x.mp4"));
        assert!(url.contains("X-Amz-Signature"));
    }
}
