//! Per-run pipeline state

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AnalysisResult, ContentItem, EvidenceMap, FailureDetail, RiskAssessment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Ingested,
    Analyzing,
    Analyzed,
    Scoring,
    Scored,
    Verifying,
    Verified,
    Aggregating,
    Done,
    Failed,
}

impl PipelineStage {
    /// Fixed transition table of the pipeline state machine
    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;

        match (self, next) {
            (Ingested, Analyzing)
            | (Analyzing, Analyzed)
            | (Analyzed, Scoring)
            | (Scoring, Scored)
            | (Scored, Verifying)
            | (Verifying, Verified)
            | (Verified, Aggregating)
            | (Aggregating, Done) => true,
            // Failure is reachable from every non-terminal stage
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}

/// Mutable accumulator for one orchestrator run
///
/// Owned by exactly one run; never shared between runs.
#[derive(Debug)]
pub struct PipelineState {
    pub content: ContentItem,
    pub analysis: Option<AnalysisResult>,
    pub risk: Option<RiskAssessment>,
    pub evidence: EvidenceMap,
    pub failure: Option<FailureDetail>,
    stage: PipelineStage,
}

impl PipelineState {
    pub fn new(content: ContentItem) -> Self {
        Self {
            content,
            analysis: None,
            risk: None,
            evidence: EvidenceMap::new(),
            failure: None,
            stage: PipelineStage::Ingested,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Move to the next stage
    pub fn enter(&mut self, next: PipelineStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "invalid pipeline transition {:?} -> {:?}",
            self.stage,
            next
        );
        tracing::debug!(
            fingerprint = %self.content.fingerprint,
            from = ?self.stage,
            to = ?next,
            "Pipeline stage transition"
        );
        self.stage = next;
    }

    /// Enter FAILED, discarding partial analysis results
    pub fn fail(&mut self, failure: FailureDetail) {
        self.enter(PipelineStage::Failed);
        self.analysis = None;
        self.risk = None;
        self.failure = Some(failure);
    }
}
