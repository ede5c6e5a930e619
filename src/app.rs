//! Application state and service initialization
//!
//! This module centralizes all service initialization and dependency injection,
//! making it easier to manage the application lifecycle and test services.

use std::sync::Arc;

use crate::model::{Config, PipelineConfig};
use crate::provider::build_providers;
use crate::service::cache::EvidenceStore;
use crate::service::{EvidenceCache, LlmClient, OpenAiLanguageModel, PipelineOrchestrator};

/// Application state containing all services and shared resources
///
/// Capability handles are built once here and shared by every request.
pub struct AppState {
    /// Pipeline shared by concurrent runs
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// Redis cache (optional)
    pub cache: Option<EvidenceCache>,
    pub config: PipelineConfig,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// This performs:
    /// 1. Redis cache initialization (optional)
    /// 2. LLM client initialization (requires OPENAI_API_KEY)
    /// 3. Evidence provider registration from the enabled provider list
    /// 4. Pipeline construction
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        // Initialize Redis cache (optional - will log warning if Redis is unavailable)
        let cache = match EvidenceCache::new().await {
            Ok(cache) => {
                tracing::info!("Redis cache enabled");
                Some(cache)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis cache unavailable, running without cache");
                None
            }
        };

        // Create shared LLM client (required)
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AppError::MissingConfig("OPENAI_API_KEY"))?;

        let llm_client = LlmClient::new(&api_key)
            .map_err(|_| AppError::InvalidConfig("Invalid OPENAI_API_KEY"))?;

        let providers = build_providers(&config.pipeline);
        if providers.is_empty() {
            tracing::warn!("No evidence providers configured, verification will be skipped");
        }

        let orchestrator = PipelineOrchestrator::from_config(
            Arc::new(OpenAiLanguageModel::new(llm_client)),
            providers,
            cache
                .clone()
                .map(|c| Arc::new(c) as Arc<dyn EvidenceStore>),
            &config.pipeline,
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            cache,
            config: config.pipeline.clone(),
        })
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
