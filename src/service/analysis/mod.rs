//! Content analysis service using LLM
//!
//! Categorizes content and extracts claims and entities. Every analysis makes at most two
//! model calls: the first attempt and a single retry.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use regex::Regex;

use crate::model::{AnalysisResult, ContentItem, ExtractedAnalysis};
use crate::service::analysis::prompts::{
    ANALYSIS_SYSTEM_PROMPT, STRICT_ANALYSIS_SYSTEM_PROMPT, build_analysis_prompt,
    build_strict_prompt,
};
use crate::service::analysis::validation::{
    MAX_CLAIMS, normalize_category, validate_extracted_analysis,
};
use crate::service::llm::{ExtractionRequest, LanguageModel, LlmError};

pub mod error;
pub mod prompts;
pub mod validation;

pub use error::AnalyzerError;

/// Words flagged as sensational wherever they appear
static SENSATIONAL_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(breaking|exclusive|leaked|secret|shocking)\b")
        .expect("Invalid sensational words regex")
});

/// Outcome of a single model call
enum Attempt {
    Usable(ExtractedAnalysis),
    Malformed(String),
    Unavailable(String),
}

/// Categorizes content through a [`LanguageModel`]
pub struct LanguageAnalyzer {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl LanguageAnalyzer {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Analyze one content item
    ///
    /// A malformed answer is retried once with the strict prompt; an unreachable model is
    /// retried once with the same prompt. The second failure is final.
    pub async fn analyze(&self, content: &ContentItem) -> Result<AnalysisResult, AnalyzerError> {
        let start_time = Instant::now();

        let first = self
            .attempt(ExtractionRequest {
                preamble: ANALYSIS_SYSTEM_PROMPT,
                prompt: build_analysis_prompt(content),
            })
            .await;

        let retry = match first {
            Attempt::Usable(extracted) => {
                return Ok(self.finish(extracted, content, start_time, 1));
            }
            Attempt::Malformed(problem) => {
                tracing::warn!(
                    fingerprint = %content.fingerprint,
                    problem = %problem,
                    "Analysis output unusable, retrying with strict prompt"
                );
                ExtractionRequest {
                    preamble: STRICT_ANALYSIS_SYSTEM_PROMPT,
                    prompt: build_strict_prompt(content, &problem),
                }
            }
            Attempt::Unavailable(reason) => {
                tracing::warn!(
                    fingerprint = %content.fingerprint,
                    reason = %reason,
                    "Analysis model unavailable, retrying once"
                );
                ExtractionRequest {
                    preamble: ANALYSIS_SYSTEM_PROMPT,
                    prompt: build_analysis_prompt(content),
                }
            }
        };

        match self.attempt(retry).await {
            Attempt::Usable(extracted) => Ok(self.finish(extracted, content, start_time, 2)),
            Attempt::Malformed(problem) => {
                tracing::error!(
                    fingerprint = %content.fingerprint,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    problem = %problem,
                    "Analysis failed after retry: malformed output"
                );
                Err(AnalyzerError::MalformedOutput(problem))
            }
            Attempt::Unavailable(reason) => {
                tracing::error!(
                    fingerprint = %content.fingerprint,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    reason = %reason,
                    "Analysis failed after retry: model unavailable"
                );
                Err(AnalyzerError::Unavailable(reason))
            }
        }
    }

    async fn attempt(&self, request: ExtractionRequest) -> Attempt {
        let call_start = Instant::now();

        tracing::debug!(
            model = %self.model.model_id(),
            prompt_length = request.prompt.len(),
            "Initiating LLM call for content analysis"
        );

        let outcome =
            tokio::time::timeout(self.timeout, self.model.extract_analysis(&request)).await;
        let elapsed_ms = call_start.elapsed().as_millis() as u64;

        match outcome {
            Err(_) => Attempt::Unavailable(format!(
                "No response within {} ms",
                self.timeout.as_millis()
            )),
            Ok(Err(LlmError::Unavailable(reason))) => Attempt::Unavailable(reason),
            Ok(Err(LlmError::Malformed(problem))) => Attempt::Malformed(problem),
            Ok(Ok(extracted)) => {
                tracing::info!(
                    model = %self.model.model_id(),
                    elapsed_ms = elapsed_ms,
                    claims = extracted.claims.len(),
                    "LLM analysis call completed"
                );

                let validation = validate_extracted_analysis(&extracted);
                for warning in &validation.warnings {
                    tracing::debug!(warning = %warning, "Analysis validation warning");
                }

                if validation.is_valid {
                    Attempt::Usable(extracted)
                } else {
                    Attempt::Malformed(validation.errors.join("; "))
                }
            }
        }
    }

    fn finish(
        &self,
        extracted: ExtractedAnalysis,
        content: &ContentItem,
        start_time: Instant,
        calls: usize,
    ) -> AnalysisResult {
        let result = normalize(extracted, content, self.model.model_id());

        tracing::info!(
            fingerprint = %content.fingerprint,
            category = %result.category,
            claims = result.claims.len(),
            entities = result.entities.len(),
            calls = calls,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Content analysis completed"
        );

        result
    }
}

/// Convert a validated extraction into the immutable analysis value
fn normalize(extracted: ExtractedAnalysis, content: &ContentItem, model: &str) -> AnalysisResult {
    let category = normalize_category(extracted.category.as_deref().unwrap_or_default());

    let mut seen = std::collections::HashSet::new();
    let claims: Vec<String> = extracted
        .claims
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_string()))
        .take(MAX_CLAIMS)
        .map(str::to_string)
        .collect();

    let entities: BTreeSet<String> = extracted
        .entities
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect();

    let confidence = match extracted.confidence {
        Some(c) if c.is_nan() => 0.0,
        Some(c) => c.clamp(0.0, 1.0),
        None => 0.0,
    };

    let flags: BTreeSet<String> = extracted
        .flags
        .iter()
        .map(|f| normalize_category(f))
        .filter(|f| !f.is_empty())
        .chain(sensational_flags(&content.text))
        .collect();

    AnalysisResult {
        category,
        claims,
        entities,
        confidence,
        summary: extracted.summary.filter(|s| !s.trim().is_empty()),
        language: extracted.language.filter(|l| !l.trim().is_empty()),
        topics: extracted
            .topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        flags: flags.into_iter().collect(),
        model: model.to_string(),
    }
}

fn sensational_flags(text: &str) -> impl Iterator<Item = String> + '_ {
    SENSATIONAL_WORDS
        .find_iter(text)
        .map(|m| format!("sensational_language:{}", m.as_str().to_lowercase()))
}
