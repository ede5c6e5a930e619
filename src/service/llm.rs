//! Shared LLM client and the structured-extraction capability
//!
//! The pipeline only sees the [`LanguageModel`] trait; the OpenAI-backed implementation
//! lives here so the analyzer can be exercised with scripted fakes.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::extractor::ExtractionError;
use rig::providers::openai;

use crate::model::ExtractedAnalysis;

/// Environment variable for the analysis model (defaults to gpt-4o-mini if not set)
const ENV_ANALYSIS_MODEL: &str = "ANALYSIS_MODEL";

/// Default model for content analysis
const DEFAULT_MODEL: &str = openai::GPT_4O_MINI;

/// Failure modes of the generative capability
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum LlmError {
    /// Transport, auth or provider-side failure; the model could not be reached
    #[error("LLM unavailable: {0}")]
    Unavailable(String),

    /// The model answered but the answer did not fit the requested schema
    #[error("LLM returned malformed output: {0}")]
    Malformed(String),
}

/// A single structured-extraction request
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub preamble: &'static str,
    pub prompt: String,
}

/// Generative-language capability used by the analyzer
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier of the underlying model, recorded in each analysis
    fn model_id(&self) -> &str;

    /// Ask the model to fill in an [`ExtractedAnalysis`]
    async fn extract_analysis(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractedAnalysis, LlmError>;
}

/// Shared LLM client wrapper
#[derive(Clone)]
pub struct LlmClient {
    client: openai::Client,
}

impl LlmClient {
    /// Create a new LLM client with the provided API key
    pub fn new(api_key: &str) -> Result<Self, String> {
        let client = openai::Client::new(api_key)
            .map_err(|e| format!("Failed to create OpenAI client: {}", e))?;

        Ok(Self { client })
    }

    /// Get a reference to the underlying OpenAI client
    pub fn openai_client(&self) -> &openai::Client {
        &self.client
    }
}

/// [`LanguageModel`] backed by rig's OpenAI extractor
pub struct OpenAiLanguageModel {
    llm_client: LlmClient,
    model: String,
}

impl OpenAiLanguageModel {
    /// Uses ANALYSIS_MODEL env var if set (defaults to gpt-4o-mini)
    pub fn new(llm_client: LlmClient) -> Self {
        let model =
            std::env::var(ENV_ANALYSIS_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        tracing::info!(model = %model, "Analysis model initialized");

        Self { llm_client, model }
    }
}

#[async_trait]
impl LanguageModel for OpenAiLanguageModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn extract_analysis(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractedAnalysis, LlmError> {
        // temperature=0.0 and a fixed seed for reproducible categorization
        let extractor = self
            .llm_client
            .openai_client()
            .extractor::<ExtractedAnalysis>(&self.model)
            .preamble(request.preamble)
            .additional_params(serde_json::json!({
                "temperature": 0.0,
                "seed": 42
            }))
            .build();

        extractor
            .extract(request.prompt.as_str())
            .await
            .map_err(classify_extraction_error)
    }
}

fn classify_extraction_error(error: ExtractionError) -> LlmError {
    match error {
        ExtractionError::CompletionError(e) => LlmError::Unavailable(e.to_string()),
        other => LlmError::Malformed(other.to_string()),
    }
}
