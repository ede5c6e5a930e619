//! Content analysis models
//!
//! `ExtractedAnalysis` is the schema the language model fills in; `AnalysisResult` is the
//! normalized, immutable value the rest of the pipeline consumes.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// LLM-extractable analysis structure
///
/// Every field is optional or defaulted so that a partial response still deserializes and
/// can be checked by validation instead of failing opaquely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedAnalysis {
    /// One of: factual, news, research, opinion, blog, social_media, satire, advertisement,
    /// propaganda, conspiracy
    #[serde(default)]
    pub category: Option<String>,
    /// Verifiable factual claims, verbatim or minimally paraphrased
    #[serde(default)]
    pub claims: Vec<String>,
    /// People, organizations, places and products named in the content
    #[serde(default)]
    pub entities: Vec<String>,
    /// Confidence in the categorization, 0.0 to 1.0
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub summary: Option<String>,
    /// ISO 639-1 language code
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Misinformation indicators, snake_case (e.g. unsourced_statistic, emotional_manipulation)
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Normalized analysis of one content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    pub category: String,
    /// Ordered as extracted
    pub claims: Vec<String>,
    #[schema(value_type = Vec<String>)]
    pub entities: BTreeSet<String>,
    /// Always within [0, 1]; 0.0 when the model did not report one
    pub confidence: f64,
    pub summary: Option<String>,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub flags: Vec<String>,
    /// Model that produced the analysis
    pub model: String,
}

impl AnalysisResult {
    pub fn has_category(&self) -> bool {
        !self.category.trim().is_empty()
    }
}
