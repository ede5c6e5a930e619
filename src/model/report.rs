//! The externally visible analysis report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{AnalysisResult, ContentItem, EvidenceRecord, PipelineStage, ProviderId, RiskAssessment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Complete,
    Partial,
    Failed,
}

/// Reason codes for a FAILED report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum FailureCode {
    AnalyzerUnavailable,
    AnalyzerMalformedOutput,
    ScoringContractViolation,
    AggregationContractViolation,
    PipelineCancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FailureDetail {
    pub code: FailureCode,
    /// Human-readable reason
    pub message: String,
    /// Stage the run was in when it failed
    pub stage: PipelineStage,
}

impl FailureDetail {
    pub fn new(code: FailureCode, message: impl Into<String>, stage: PipelineStage) -> Self {
        Self {
            code,
            message: message.into(),
            stage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Report {
    pub id: Uuid,
    pub status: ReportStatus,
    pub content: ContentItem,
    pub analysis: Option<AnalysisResult>,
    pub risk: Option<RiskAssessment>,
    /// One record per configured provider, in configured order
    pub evidence: Vec<EvidenceRecord>,
    /// Providers whose record is not OK
    pub unavailable_providers: Vec<ProviderId>,
    /// 0.5 is neutral; higher means external sources support the content
    pub verification_score: Option<f64>,
    pub recommendations: Vec<String>,
    pub review_required: bool,
    pub failure: Option<FailureDetail>,
    pub generated_at: DateTime<Utc>,
    pub processing_ms: u64,
}
