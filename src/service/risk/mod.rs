//! Risk scoring
//!
//! Pure and deterministic: the same analysis, evidence and thresholds always produce the
//! same assessment. The weighting lives behind [`RiskStrategy`] so it can be versioned.

pub mod categories;

use std::sync::Arc;

use thiserror::Error;

use crate::model::{AnalysisResult, EvidenceMap, RiskAssessment, RiskThresholds};

/// Per-claim increment and its cap
const CLAIM_WEIGHT: f64 = 0.04;
const CLAIM_CAP: f64 = 0.20;

/// Per-flag increment and its cap
const FLAG_WEIGHT: f64 = 0.05;
const FLAG_CAP: f64 = 0.15;

/// Per-corroborating-provider decrement and its cap
const CORROBORATION_WEIGHT: f64 = 0.10;
const CORROBORATION_CAP: f64 = 0.20;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("Analysis has no category to score")]
    MissingCategory,

    #[error("Risk cannot be scored before the content is analyzed")]
    MissingAnalysis,
}

/// Raw output of a strategy before level assignment
#[derive(Debug, Clone, PartialEq)]
pub struct RiskBreakdown {
    pub raw_score: f64,
    pub rationale: Vec<String>,
}

/// A versioned risk weighting function
pub trait RiskStrategy: Send + Sync {
    /// Identifier recorded in every assessment, e.g. `weighted-v1`
    fn version(&self) -> &'static str;

    fn evaluate(
        &self,
        analysis: &AnalysisResult,
        evidence: &EvidenceMap,
        thresholds: &RiskThresholds,
    ) -> Result<RiskBreakdown, ScoringError>;
}

/// Category base risk adjusted by claims, flags and corroboration
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedRiskStrategy;

impl RiskStrategy for WeightedRiskStrategy {
    fn version(&self) -> &'static str {
        "weighted-v1"
    }

    fn evaluate(
        &self,
        analysis: &AnalysisResult,
        evidence: &EvidenceMap,
        thresholds: &RiskThresholds,
    ) -> Result<RiskBreakdown, ScoringError> {
        if !analysis.has_category() {
            return Err(ScoringError::MissingCategory);
        }

        let mut rationale = Vec::new();

        let base = match categories::base_risk(&analysis.category) {
            Some(base) => {
                rationale.push(format!(
                    "Category '{}' base risk {:.2}",
                    analysis.category, base
                ));
                base
            }
            None => {
                let base = thresholds.medium_midpoint();
                rationale.push(format!(
                    "Unknown category '{}', default base risk {:.2}",
                    analysis.category, base
                ));
                base
            }
        };

        let claim_delta = (analysis.claims.len() as f64 * CLAIM_WEIGHT).min(CLAIM_CAP);
        if claim_delta > 0.0 {
            rationale.push(format!(
                "{} verifiable claim(s) +{:.2}",
                analysis.claims.len(),
                claim_delta
            ));
        }

        let flag_delta = (analysis.flags.len() as f64 * FLAG_WEIGHT).min(FLAG_CAP);
        if flag_delta > 0.0 {
            rationale.push(format!(
                "Misinformation indicators ({}) +{:.2}",
                analysis.flags.join(", "),
                flag_delta
            ));
        }

        let corroborating = evidence.iter().filter(|r| r.corroborates()).count();
        let corroboration_delta =
            (corroborating as f64 * CORROBORATION_WEIGHT).min(CORROBORATION_CAP);
        if corroboration_delta > 0.0 {
            rationale.push(format!(
                "Corroborated by {} source(s) -{:.2}",
                corroborating, corroboration_delta
            ));
        }

        let unchecked = evidence.non_ok_providers();
        if !unchecked.is_empty() {
            let names: Vec<String> = unchecked.iter().map(|p| p.to_string()).collect();
            rationale.push(format!(
                "Not checked, no adjustment: {}",
                names.join(", ")
            ));
        }

        let raw_score = base + claim_delta + flag_delta - corroboration_delta;

        Ok(RiskBreakdown {
            raw_score,
            rationale,
        })
    }
}

/// Turns analysis output and evidence into a [`RiskAssessment`]
#[derive(Clone)]
pub struct RiskScorer {
    strategy: Arc<dyn RiskStrategy>,
    thresholds: RiskThresholds,
}

impl RiskScorer {
    pub fn new(strategy: Arc<dyn RiskStrategy>, thresholds: RiskThresholds) -> Self {
        Self {
            strategy,
            thresholds,
        }
    }

    /// The default `weighted-v1` strategy with the given thresholds
    pub fn weighted(thresholds: RiskThresholds) -> Self {
        Self::new(Arc::new(WeightedRiskStrategy), thresholds)
    }

    pub fn score(
        &self,
        analysis: &AnalysisResult,
        evidence: &EvidenceMap,
    ) -> Result<RiskAssessment, ScoringError> {
        let breakdown = self
            .strategy
            .evaluate(analysis, evidence, &self.thresholds)?;

        let score = if breakdown.raw_score.is_nan() {
            self.thresholds.medium_midpoint()
        } else {
            breakdown.raw_score.clamp(0.0, 1.0)
        };
        let level = self.thresholds.level_for(score);

        tracing::debug!(
            algorithm = self.strategy.version(),
            score = score,
            level = level.as_str(),
            evidence_records = evidence.len(),
            "Computed risk score"
        );

        Ok(RiskAssessment {
            score,
            level,
            rationale: breakdown.rationale,
            algorithm: self.strategy.version().to_string(),
            thresholds: self.thresholds,
        })
    }
}
