//! Application state.

use std::sync::Arc;

use mclip_media::{PipelineConfig, StitchPipeline};
use mclip_storage::{Publisher, PublisherConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<StitchPipeline>,
    pub publisher: Arc<dyn Publisher>,
}

impl AppState {
    pub fn new(config: ApiConfig, pipeline: Arc<StitchPipeline>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            config,
            pipeline,
            publisher,
        }
    }

    /// Build the production pipeline and publisher from the environment.
    pub fn from_env(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let pipeline = StitchPipeline::from_config(&PipelineConfig::from_env())?;
        let publisher = PublisherConfig::from_env()?.build()?;

        Ok(Self::new(config, Arc::new(pipeline), publisher))
    }
}
