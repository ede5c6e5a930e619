//! Report aggregation and export

use std::fmt::Write as _;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    EvidenceMap, FailureCode, FailureDetail, PipelineState, Report, ReportStatus, RiskLevel,
};

const NEUTRAL_VERIFICATION_SCORE: f64 = 0.5;
const MATCHED_BONUS: f64 = 0.1;
const SUPPORTED_BONUS: f64 = 0.2;
const REFUTED_PENALTY: f64 = 0.3;

/// Checked before the supporting words, which they contain
const REFUTING_RATINGS: &[&str] = &["false", "incorrect", "untrue", "inaccurate", "misleading"];
const SUPPORTING_RATINGS: &[&str] = &["true", "correct", "accurate"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("Cannot aggregate a report without an analysis")]
    MissingAnalysis,

    #[error("Cannot aggregate a report without a risk assessment")]
    MissingRisk,
}

impl AggregationError {
    pub fn failure_code(&self) -> FailureCode {
        FailureCode::AggregationContractViolation
    }
}

/// Builds the immutable [`Report`] from a finished run. Never mutates the state.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportAggregator;

impl ReportAggregator {
    /// Report for a run that reached aggregation
    pub fn aggregate(&self, state: &PipelineState) -> Result<Report, AggregationError> {
        let analysis = state
            .analysis
            .as_ref()
            .ok_or(AggregationError::MissingAnalysis)?;
        let risk = state.risk.as_ref().ok_or(AggregationError::MissingRisk)?;

        let unavailable_providers = state.evidence.non_ok_providers();
        let status = if unavailable_providers.is_empty() {
            ReportStatus::Complete
        } else {
            ReportStatus::Partial
        };

        let mut recommendations = level_recommendations(risk.level);
        if let Some(extra) = category_recommendation(&analysis.category) {
            recommendations.push(extra.to_string());
        }
        if !unavailable_providers.is_empty() {
            let names: Vec<String> = unavailable_providers.iter().map(|p| p.to_string()).collect();
            recommendations.push(format!(
                "Verification incomplete: {} could not be checked",
                names.join(", ")
            ));
        }

        Ok(Report {
            id: Uuid::new_v4(),
            status,
            content: state.content.clone(),
            analysis: Some(analysis.clone()),
            risk: Some(risk.clone()),
            evidence: state.evidence.iter().cloned().collect(),
            unavailable_providers,
            verification_score: verification_score(&state.evidence),
            recommendations,
            review_required: risk.level >= RiskLevel::High,
            failure: None,
            generated_at: Utc::now(),
            processing_ms: elapsed_ms(state),
        })
    }

    /// Report for a run that ended FAILED
    pub fn failed(&self, state: &PipelineState) -> Report {
        let failure = state.failure.clone().unwrap_or_else(|| {
            tracing::error!(
                fingerprint = %state.content.fingerprint,
                "Failed run has no recorded failure detail"
            );
            FailureDetail::new(
                FailureCode::AggregationContractViolation,
                "Run failed without a recorded reason",
                state.stage(),
            )
        });

        Report {
            id: Uuid::new_v4(),
            status: ReportStatus::Failed,
            content: state.content.clone(),
            analysis: None,
            risk: None,
            evidence: state.evidence.iter().cloned().collect(),
            unavailable_providers: state.evidence.non_ok_providers(),
            verification_score: None,
            recommendations: vec![
                "Automated analysis did not complete; review the content manually".to_string(),
            ],
            review_required: true,
            failure: Some(failure),
            generated_at: Utc::now(),
            processing_ms: elapsed_ms(state),
        }
    }
}

fn elapsed_ms(state: &PipelineState) -> u64 {
    (Utc::now() - state.content.submitted_at)
        .num_milliseconds()
        .max(0) as u64
}

fn level_recommendations(level: RiskLevel) -> Vec<String> {
    let items: &[&str] = match level {
        RiskLevel::Critical => &[
            "Do not publish without thorough fact-checking",
            "Verify all claims with primary sources",
            "Consider adding a content warning if published",
            "Monitor engagement and feedback closely",
        ],
        RiskLevel::High => &[
            "Additional fact-checking strongly recommended",
            "Get a second opinion before publication",
            "Monitor audience response if published",
        ],
        RiskLevel::Medium => &[
            "Follow the normal editorial review process",
            "Track content performance regularly",
        ],
        RiskLevel::Low => &["Content appears safe for standard publication"],
    };
    items.iter().map(|s| s.to_string()).collect()
}

fn category_recommendation(category: &str) -> Option<&'static str> {
    match category {
        "news" => Some("Verify publication date and source credibility"),
        "research" => Some("Check for peer review and methodology"),
        "social_media" => Some("Apply higher scrutiny given viral potential"),
        _ => None,
    }
}

/// How well external sources back the content; None when no provider answered
fn verification_score(evidence: &EvidenceMap) -> Option<f64> {
    let answered: Vec<_> = evidence.iter().filter(|r| r.is_ok()).collect();
    if answered.is_empty() {
        return None;
    }

    let mut score = NEUTRAL_VERIFICATION_SCORE;
    if answered.iter().any(|r| !r.items.is_empty()) {
        score += MATCHED_BONUS;
    }

    let ratings: Vec<String> = answered
        .iter()
        .flat_map(|r| r.items.iter())
        .filter_map(|i| i.rating.as_deref())
        .map(str::to_lowercase)
        .collect();

    let refutes = |r: &str| REFUTING_RATINGS.iter().any(|w| r.contains(w));
    let supports = |r: &str| !refutes(r) && SUPPORTING_RATINGS.iter().any(|w| r.contains(w));

    if ratings.iter().any(|r| supports(r.as_str())) {
        score += SUPPORTED_BONUS;
    } else if ratings.iter().any(|r| refutes(r.as_str())) {
        score -= REFUTED_PENALTY;
    }

    Some(score.clamp(0.0, 1.0))
}

/// Render a report as a Markdown document for export
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Content Analysis Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Report ID:** {}", report.id);
    let _ = writeln!(out, "- **Status:** {:?}", report.status);
    let _ = writeln!(
        out,
        "- **Generated:** {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "- **Fingerprint:** `{}`", report.content.fingerprint);
    if let Some(url) = &report.content.source_url {
        let _ = writeln!(out, "- **Source:** {}", url);
    }
    let _ = writeln!(out, "- **Processing time:** {} ms", report.processing_ms);

    if let Some(failure) = &report.failure {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Failure");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:?} during {:?}: {}",
            failure.code, failure.stage, failure.message
        );
    }

    if let Some(risk) = &report.risk {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Risk Assessment");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "**{}** (score {:.2}, {})",
            risk.level.as_str(),
            risk.score,
            risk.algorithm
        );
        let _ = writeln!(out);
        for line in &risk.rationale {
            let _ = writeln!(out, "- {}", line);
        }
    }

    if let Some(analysis) = &report.analysis {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Analysis");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "- **Category:** {} (confidence {:.2})",
            analysis.category, analysis.confidence
        );
        if let Some(summary) = &analysis.summary {
            let _ = writeln!(out, "- **Summary:** {}", summary);
        }
        if !analysis.entities.is_empty() {
            let entities: Vec<&str> = analysis.entities.iter().map(String::as_str).collect();
            let _ = writeln!(out, "- **Entities:** {}", entities.join(", "));
        }
        if !analysis.flags.is_empty() {
            let _ = writeln!(out, "- **Flags:** {}", analysis.flags.join(", "));
        }
        if !analysis.claims.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "### Claims");
            let _ = writeln!(out);
            for (i, claim) in analysis.claims.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, claim);
            }
        }
    }

    if !report.evidence.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Verification");
        let _ = writeln!(out);
        if let Some(score) = report.verification_score {
            let _ = writeln!(out, "Verification score: {:.2}", score);
            let _ = writeln!(out);
        }
        for record in &report.evidence {
            let _ = writeln!(
                out,
                "### {} ({:?}, {} ms)",
                record.provider, record.status, record.elapsed_ms
            );
            let _ = writeln!(out);
            if let Some(error) = &record.error {
                let _ = writeln!(out, "_{}_", error);
                let _ = writeln!(out);
            }
            for item in &record.items {
                let title = match &item.url {
                    Some(url) => format!("[{}]({})", item.title, url),
                    None => item.title.clone(),
                };
                let mut line = format!("- {}", title);
                if let Some(publisher) = &item.publisher {
                    let _ = write!(line, " - {}", publisher);
                }
                if let Some(rating) = &item.rating {
                    let _ = write!(line, " (rated: {})", rating);
                }
                let _ = writeln!(out, "{}", line);
            }
        }
    }

    if !report.recommendations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Recommendations");
        let _ = writeln!(out);
        for rec in &report.recommendations {
            let _ = writeln!(out, "- {}", rec);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::{
        AnalysisResult, ContentItem, EvidenceRecord, PipelineStage, RiskAssessment,
        RiskThresholds,
    };
    use crate::testing::item;

    fn analysis(category: &str) -> AnalysisResult {
        AnalysisResult {
            category: category.to_string(),
            claims: vec!["The tower is 300 m tall.".to_string()],
            entities: BTreeSet::from(["Eiffel Tower".to_string()]),
            confidence: 0.9,
            summary: Some("A statement about a tower".to_string()),
            language: Some("en".to_string()),
            topics: vec![],
            flags: vec![],
            model: "test".to_string(),
        }
    }

    fn risk(level: RiskLevel) -> RiskAssessment {
        RiskAssessment {
            score: 0.3,
            level,
            rationale: vec!["base".to_string()],
            algorithm: "weighted-v1".to_string(),
            thresholds: RiskThresholds::default(),
        }
    }

    fn scored_state(evidence: Vec<EvidenceRecord>) -> PipelineState {
        let content = ContentItem::ingest(
            "The tower is 300 m tall.",
            Some("https://example.com/t".to_string()),
            1000,
        )
        .unwrap();
        let mut state = PipelineState::new(content);
        state.analysis = Some(analysis("news"));
        state.risk = Some(risk(RiskLevel::Medium));
        state.evidence = evidence.into_iter().collect();
        state
    }

    #[test]
    fn test_all_ok_is_complete() {
        let state = scored_state(vec![EvidenceRecord::ok("a".into(), vec![], 3)]);
        let report = ReportAggregator.aggregate(&state).unwrap();

        assert_eq!(report.status, ReportStatus::Complete);
        assert!(report.unavailable_providers.is_empty());
        assert!(!report.review_required);
        assert!(report.failure.is_none());
    }

    #[test]
    fn test_no_providers_is_complete_not_partial() {
        let report = ReportAggregator.aggregate(&scored_state(vec![])).unwrap();
        assert_eq!(report.status, ReportStatus::Complete);
        assert!(report.evidence.is_empty());
        assert!(report.verification_score.is_none());
    }

    #[test]
    fn test_any_non_ok_record_is_partial() {
        let state = scored_state(vec![
            EvidenceRecord::ok("a".into(), vec![], 3),
            EvidenceRecord::unavailable("b".into(), "timeout", 6000),
        ]);
        let report = ReportAggregator.aggregate(&state).unwrap();

        assert_eq!(report.status, ReportStatus::Partial);
        assert_eq!(report.unavailable_providers, vec!["b".into()]);
        assert!(
            report
                .recommendations
                .last()
                .unwrap()
                .contains("b could not be checked")
        );
    }

    #[test]
    fn test_missing_analysis_is_contract_violation() {
        let mut state = scored_state(vec![]);
        state.analysis = None;
        assert_eq!(
            ReportAggregator.aggregate(&state),
            Err(AggregationError::MissingAnalysis)
        );

        let mut state = scored_state(vec![]);
        state.risk = None;
        assert_eq!(
            ReportAggregator.aggregate(&state),
            Err(AggregationError::MissingRisk)
        );
    }

    #[test]
    fn test_recommendations_by_level_and_category() {
        let mut state = scored_state(vec![]);
        state.risk = Some(risk(RiskLevel::Critical));
        let report = ReportAggregator.aggregate(&state).unwrap();

        assert!(report.review_required);
        assert_eq!(report.recommendations.len(), 5);
        assert_eq!(
            report.recommendations[0],
            "Do not publish without thorough fact-checking"
        );
        assert_eq!(
            report.recommendations[4],
            "Verify publication date and source credibility"
        );
    }

    #[test]
    fn test_failed_report_has_no_analysis() {
        let mut state = scored_state(vec![]);
        state.enter(PipelineStage::Analyzing);
        state.fail(FailureDetail::new(
            FailureCode::AnalyzerMalformedOutput,
            "bad json",
            PipelineStage::Analyzing,
        ));

        let report = ReportAggregator.failed(&state);
        assert_eq!(report.status, ReportStatus::Failed);
        assert!(report.analysis.is_none());
        assert!(report.risk.is_none());
        assert_eq!(
            report.failure.unwrap().code,
            FailureCode::AnalyzerMalformedOutput
        );
    }

    #[test]
    fn test_verification_score() {
        let rated = |rating: &str| {
            let mut i = item("review", "claim");
            i.rating = Some(rating.to_string());
            i
        };

        let neutral: EvidenceMap = [EvidenceRecord::ok("a".into(), vec![], 1)]
            .into_iter()
            .collect();
        assert_eq!(verification_score(&neutral), Some(0.5));

        let supported: EvidenceMap =
            [EvidenceRecord::ok("a".into(), vec![rated("Mostly True")], 1)]
                .into_iter()
                .collect();
        assert!((verification_score(&supported).unwrap() - 0.8).abs() < 1e-9);

        let refuted: EvidenceMap = [EvidenceRecord::ok("a".into(), vec![rated("Untrue")], 1)]
            .into_iter()
            .collect();
        assert!((verification_score(&refuted).unwrap() - 0.3).abs() < 1e-9);

        let unchecked: EvidenceMap = [EvidenceRecord::error("a".into(), "boom", 1)]
            .into_iter()
            .collect();
        assert_eq!(verification_score(&unchecked), None);
    }

    #[test]
    fn test_render_markdown() {
        let state = scored_state(vec![EvidenceRecord::ok(
            "fact_check".into(),
            vec![item("Tower height confirmed", "The tower is 300 m tall.")],
            12,
        )]);
        let report = ReportAggregator.aggregate(&state).unwrap();
        let md = render_markdown(&report);

        assert!(md.starts_with("# Content Analysis Report"));
        assert!(md.contains("**MEDIUM**"));
        assert!(md.contains("1. The tower is 300 m tall."));
        assert!(md.contains("### fact_check (Ok, 12 ms)"));
        assert!(md.contains("- Tower height confirmed - Example Wire"));
        assert!(md.contains("https://example.com/t"));
    }
}
