//! Publisher selection from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{StorageError, StorageResult};
use crate::local::LocalPublisher;
use crate::publisher::Publisher;
use crate::r2::{R2Config, R2Publisher};

/// Which publisher backs the upload step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublisherKind {
    #[default]
    Local,
    R2,
}

impl FromStr for PublisherKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(PublisherKind::Local),
            "r2" => Ok(PublisherKind::R2),
            other => Err(StorageError::config_error(format!("unknown publisher: {}", other))),
        }
    }
}

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub kind: PublisherKind,
    /// Directory the local publisher writes to
    pub local_dir: PathBuf,
    /// URL `local_dir` is served at
    pub public_base_url: String,
    /// Required when `kind` is R2
    pub r2: Option<R2Config>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            kind: PublisherKind::Local,
            local_dir: PathBuf::from("./media"),
            public_base_url: "http://localhost:8000/media".to_string(),
            r2: None,
        }
    }
}

impl PublisherConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let defaults = Self::default();

        let kind = match std::env::var("PUBLISHER") {
            Ok(s) if !s.is_empty() => s.parse()?,
            _ => defaults.kind,
        };

        let r2 = match kind {
            PublisherKind::R2 => Some(R2Config::from_env()?),
            PublisherKind::Local => None,
        };

        Ok(Self {
            kind,
            local_dir: std::env::var("LOCAL_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_dir),
            public_base_url: std::env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            r2,
        })
    }

    /// Construct the configured publisher.
    pub fn build(&self) -> StorageResult<Arc<dyn Publisher>> {
        match self.kind {
            PublisherKind::Local => Ok(Arc::new(LocalPublisher::new(
                &self.local_dir,
                &self.public_base_url,
            ))),
            PublisherKind::R2 => {
                let r2 = self
                    .r2
                    .clone()
                    .ok_or_else(|| StorageError::config_error("R2 publisher selected without R2 config"))?;
                Ok(Arc::new(R2Publisher::new(r2)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("local".parse::<PublisherKind>().unwrap(), PublisherKind::Local);
        assert_eq!(" R2 ".parse::<PublisherKind>().unwrap(), PublisherKind::R2);
        assert!("gcs".parse::<PublisherKind>().is_err());
    }

    #[test]
    fn test_default_builds_local_publisher() {
        let publisher = PublisherConfig::default().build().unwrap();
        assert_eq!(publisher.name(), "local");
        assert!(publisher.local_root().is_some());
    }

    #[test]
    fn test_r2_without_config_fails() {
        let config = PublisherConfig {
            kind: PublisherKind::R2,
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(StorageError::ConfigError(_))));
    }
}
