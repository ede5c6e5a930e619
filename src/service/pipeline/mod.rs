//! Analysis-and-verification pipeline
//!
//! Drives one submission through ingestion, analysis, scoring, verification and
//! aggregation. Each run owns its [`PipelineState`]; the orchestrator itself holds only
//! shared capabilities and can serve concurrent runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::model::{
    ContentItem, FailureCode, FailureDetail, PipelineConfig, PipelineStage, PipelineState,
    ProviderId, Report, RiskAssessment,
};
use crate::provider::EvidenceProvider;
use crate::service::analysis::LanguageAnalyzer;
use crate::service::cache::EvidenceStore;
use crate::service::fanout::{VerificationFanout, verification_queries};
use crate::service::llm::LanguageModel;
use crate::service::report::ReportAggregator;
use crate::service::risk::{RiskScorer, ScoringError};

pub mod cancel;
pub mod error;

pub use cancel::CancelSignal;
#[cfg(test)]
pub use cancel::cancellation;
pub use error::PipelineError;

/// Content submitted for analysis
#[derive(Debug, Clone)]
pub struct Submission {
    pub text: String,
    pub source_url: Option<String>,
}

impl Submission {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_url: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

pub struct PipelineOrchestrator {
    analyzer: LanguageAnalyzer,
    scorer: RiskScorer,
    fanout: VerificationFanout,
    aggregator: ReportAggregator,
    max_content_chars: usize,
}

impl PipelineOrchestrator {
    pub fn new(
        analyzer: LanguageAnalyzer,
        scorer: RiskScorer,
        fanout: VerificationFanout,
        max_content_chars: usize,
    ) -> Self {
        Self {
            analyzer,
            scorer,
            fanout,
            aggregator: ReportAggregator,
            max_content_chars,
        }
    }

    /// Wire the pipeline stages from configuration and injected capabilities
    pub fn from_config(
        model: Arc<dyn LanguageModel>,
        providers: Vec<Arc<dyn EvidenceProvider>>,
        cache: Option<Arc<dyn EvidenceStore>>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(
            LanguageAnalyzer::new(model, config.llm_timeout()),
            RiskScorer::weighted(config.risk_thresholds),
            VerificationFanout::new(providers, config.provider_timeout()).with_cache(cache),
            config.max_content_chars,
        )
    }

    pub fn model_id(&self) -> &str {
        self.analyzer.model_id()
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.fanout.provider_ids()
    }

    /// Run one submission to a report
    ///
    /// Only invalid content is an error; every failure after ingestion, cancellation
    /// included, comes back as a FAILED report.
    pub async fn run(
        &self,
        submission: Submission,
        cancel: &CancelSignal,
    ) -> Result<Report, PipelineError> {
        let content = ContentItem::ingest(
            &submission.text,
            submission.source_url,
            self.max_content_chars,
        )
        .inspect_err(|e| tracing::info!(error = %e, "Submission rejected"))?;

        let start_time = Instant::now();
        let mut state = PipelineState::new(content);

        tracing::info!(
            fingerprint = %state.content.fingerprint,
            chars = state.content.text.chars().count(),
            providers = self.fanout.provider_ids().len(),
            "Pipeline run started"
        );

        // ANALYZING
        state.enter(PipelineStage::Analyzing);
        let analyzed = until_cancelled(cancel, self.analyzer.analyze(&state.content)).await;
        match analyzed {
            None => return Ok(self.cancel_run(&mut state, cancel)),
            Some(Err(e)) => {
                let code = e.failure_code();
                return Ok(self.fail_run(&mut state, code, e.to_string()));
            }
            Some(Ok(analysis)) => {
                state.analysis = Some(analysis);
                state.enter(PipelineStage::Analyzed);
            }
        }

        // SCORING: baseline before any evidence exists
        if cancel.is_cancelled() {
            return Ok(self.cancel_run(&mut state, cancel));
        }
        state.enter(PipelineStage::Scoring);
        match self.score(&state) {
            Ok(risk) => {
                state.risk = Some(risk);
                state.enter(PipelineStage::Scored);
            }
            Err(e) => {
                return Ok(self.fail_run(
                    &mut state,
                    FailureCode::ScoringContractViolation,
                    e.to_string(),
                ));
            }
        }

        // VERIFYING
        if cancel.is_cancelled() {
            return Ok(self.cancel_run(&mut state, cancel));
        }
        state.enter(PipelineStage::Verifying);
        if self.fanout.is_empty() {
            tracing::debug!(
                fingerprint = %state.content.fingerprint,
                "No evidence providers configured, skipping verification"
            );
        } else {
            let queries = state
                .analysis
                .as_ref()
                .map(|a| verification_queries(a, &state.content))
                .unwrap_or_default();

            let verified = until_cancelled(cancel, self.fanout.verify(&queries)).await;
            match verified {
                Some(evidence) => state.evidence = evidence,
                None => {
                    state.evidence = self.fanout.abandoned();
                    return Ok(self.cancel_run(&mut state, cancel));
                }
            }
        }
        state.enter(PipelineStage::Verified);

        // Re-score so corroboration is reflected
        match self.score(&state) {
            Ok(risk) => state.risk = Some(risk),
            Err(e) => {
                return Ok(self.fail_run(
                    &mut state,
                    FailureCode::ScoringContractViolation,
                    e.to_string(),
                ));
            }
        }

        // AGGREGATING
        if cancel.is_cancelled() {
            return Ok(self.cancel_run(&mut state, cancel));
        }
        state.enter(PipelineStage::Aggregating);
        match self.aggregator.aggregate(&state) {
            Ok(report) => {
                state.enter(PipelineStage::Done);
                tracing::info!(
                    fingerprint = %state.content.fingerprint,
                    status = ?report.status,
                    risk_level = ?report.risk.as_ref().map(|r| r.level),
                    unavailable = report.unavailable_providers.len(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Pipeline run completed"
                );
                Ok(report)
            }
            Err(e) => {
                let code = e.failure_code();
                Ok(self.fail_run(&mut state, code, e.to_string()))
            }
        }
    }

    fn score(&self, state: &PipelineState) -> Result<RiskAssessment, ScoringError> {
        let analysis = state
            .analysis
            .as_ref()
            .ok_or(ScoringError::MissingAnalysis)?;
        self.scorer.score(analysis, &state.evidence)
    }

    fn fail_run(&self, state: &mut PipelineState, code: FailureCode, message: String) -> Report {
        let stage = state.stage();
        tracing::error!(
            fingerprint = %state.content.fingerprint,
            code = ?code,
            stage = ?stage,
            message = %message,
            "Pipeline run failed"
        );
        state.fail(FailureDetail::new(code, message, stage));
        self.aggregator.failed(state)
    }

    fn cancel_run(&self, state: &mut PipelineState, cancel: &CancelSignal) -> Report {
        let stage = state.stage();
        tracing::warn!(
            fingerprint = %state.content.fingerprint,
            stage = ?stage,
            reason = cancel.reason(),
            "Pipeline run cancelled"
        );
        state.fail(FailureDetail::new(
            FailureCode::PipelineCancelled,
            cancel.reason(),
            stage,
        ));
        self.aggregator.failed(state)
    }
}

/// Drive `fut` unless the signal fires first
async fn until_cancelled<F: Future>(cancel: &CancelSignal, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::model::evidence::EvidenceStatus;
    use crate::model::{ContentError, ExtractedAnalysis, ReportStatus, RiskLevel, RiskThresholds};
    use crate::service::llm::LlmError;
    use crate::testing::{FakeBehavior, FakeProvider, ScriptedModel, extracted, item};

    const TIMEOUT: Duration = Duration::from_millis(100);

    fn orchestrator(
        model: Arc<ScriptedModel>,
        providers: Vec<Arc<FakeProvider>>,
    ) -> PipelineOrchestrator {
        let config = PipelineConfig {
            llm_timeout_ms: 1_000,
            provider_timeout_ms: TIMEOUT.as_millis() as u64,
            ..PipelineConfig::default()
        };
        PipelineOrchestrator::from_config(
            model,
            providers
                .into_iter()
                .map(|p| p as Arc<dyn EvidenceProvider>)
                .collect(),
            None,
            &config,
        )
    }

    #[tokio::test]
    async fn test_empty_content_is_rejected_without_report() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let result = orchestrator(model.clone(), vec![])
            .run(Submission::new(""), &CancelSignal::never())
            .await;

        assert_eq!(
            result.unwrap_err(),
            PipelineError::InvalidContent(ContentError::Empty)
        );
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_content_is_rejected() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let text = "a".repeat(PipelineConfig::default().max_content_chars + 1);
        let result = orchestrator(model, vec![])
            .run(Submission::new(text), &CancelSignal::never())
            .await;

        assert!(matches!(
            result,
            Err(PipelineError::InvalidContent(ContentError::TooLong { .. }))
        ));
    }

    #[tokio::test]
    async fn test_factual_content_without_providers_is_complete() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(extracted(
            "factual",
            &["Water boils at 100 degrees Celsius at sea level."],
        ))]));
        let report = orchestrator(model, vec![])
            .run(
                Submission::new("Water boils at 100 degrees Celsius at sea level.")
                    .with_source_url("https://example.com/physics"),
                &CancelSignal::never(),
            )
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Complete);
        assert!(report.evidence.is_empty());
        let risk = report.risk.unwrap();
        assert!(matches!(risk.level, RiskLevel::Low | RiskLevel::Medium));
        assert!(report.analysis.is_some());
        assert_eq!(
            report.content.source_url.as_deref(),
            Some("https://example.com/physics")
        );
    }

    #[tokio::test]
    async fn test_high_risk_with_one_provider_timing_out_is_partial() {
        let claim = "The moon landing was staged in a studio.";
        let found = Arc::new(FakeProvider::new(
            "fact_check",
            FakeBehavior::Items(vec![item("Moon landing hoax debunked", claim)]),
        ));
        let slow = Arc::new(FakeProvider::new(
            "news_search",
            FakeBehavior::Hang(Duration::from_secs(30)),
        ));

        let model = Arc::new(ScriptedModel::new(vec![Ok(extracted("conspiracy", &[claim]))]));
        let report = orchestrator(model, vec![found.clone(), slow.clone()])
            .run(Submission::new(claim), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Partial);
        assert_eq!(report.evidence.len(), 2);
        assert_eq!(report.evidence[0].status, EvidenceStatus::Ok);
        assert_eq!(report.evidence[0].items.len(), 1);
        assert_eq!(report.evidence[1].status, EvidenceStatus::Unavailable);
        assert_eq!(report.unavailable_providers, vec!["news_search".into()]);
        assert_eq!(found.calls(), 1);
        assert_eq!(slow.calls(), 1);

        // Same score as if the unavailable provider had not been configured at all
        let model = Arc::new(ScriptedModel::new(vec![Ok(extracted("conspiracy", &[claim]))]));
        let found_only = Arc::new(FakeProvider::new(
            "fact_check",
            FakeBehavior::Items(vec![item("Moon landing hoax debunked", claim)]),
        ));
        let reference = orchestrator(model, vec![found_only])
            .run(Submission::new(claim), &CancelSignal::never())
            .await
            .unwrap();

        let risk = report.risk.unwrap();
        assert_eq!(risk.score, reference.risk.unwrap().score);
        assert!(risk.level >= RiskLevel::High);
        assert!(report.review_required);
    }

    #[tokio::test]
    async fn test_analyzer_failing_twice_fails_the_run() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(LlmError::Unavailable("connection reset".to_string())),
            Err(LlmError::Unavailable("connection reset".to_string())),
        ]));
        let provider = Arc::new(FakeProvider::new("p", FakeBehavior::Items(vec![])));
        let report = orchestrator(model.clone(), vec![provider.clone()])
            .run(Submission::new("Some text"), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Failed);
        assert!(report.analysis.is_none());
        assert!(report.risk.is_none());
        let failure = report.failure.unwrap();
        assert_eq!(failure.code, FailureCode::AnalyzerUnavailable);
        assert_eq!(failure.stage, PipelineStage::Analyzing);
        assert_eq!(model.calls(), 2);
        assert_eq!(provider.calls(), 0);
        assert!(report.evidence.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_output_twice_fails_the_run() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(ExtractedAnalysis::default()),
            Ok(ExtractedAnalysis::default()),
        ]));
        let report = orchestrator(model, vec![])
            .run(Submission::new("Some text"), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(
            report.failure.unwrap().code,
            FailureCode::AnalyzerMalformedOutput
        );
    }

    #[tokio::test]
    async fn test_cancellation_mid_verification_fails_the_run() {
        let slow_a = Arc::new(FakeProvider::new(
            "a",
            FakeBehavior::Hang(Duration::from_secs(30)),
        ));
        let slow_b = Arc::new(FakeProvider::new(
            "b",
            FakeBehavior::Hang(Duration::from_secs(30)),
        ));
        let model = Arc::new(ScriptedModel::new(vec![Ok(extracted("news", &["claim"]))]));

        let config = PipelineConfig {
            provider_timeout_ms: 30_000,
            ..PipelineConfig::default()
        };
        let orchestrator = PipelineOrchestrator::from_config(
            model,
            vec![
                slow_a.clone() as Arc<dyn EvidenceProvider>,
                slow_b.clone() as Arc<dyn EvidenceProvider>,
            ],
            None,
            &config,
        );

        let (handle, signal) = cancellation();
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        };
        let (result, _) = tokio::join!(
            orchestrator.run(Submission::new("Breaking news text"), &signal),
            canceller
        );
        let report = result.unwrap();

        assert_eq!(report.status, ReportStatus::Failed);
        assert!(report.analysis.is_none());
        assert!(report.risk.is_none());
        let failure = report.failure.unwrap();
        assert_eq!(failure.code, FailureCode::PipelineCancelled);
        assert_eq!(failure.stage, PipelineStage::Verifying);
        assert_eq!(report.evidence.len(), 2);
        assert!(
            report
                .evidence
                .iter()
                .all(|r| r.status == EvidenceStatus::Unavailable)
        );
        assert_eq!(slow_a.calls(), 1);
    }

    #[tokio::test]
    async fn test_deadline_during_analysis_cancels() {
        let model = Arc::new(
            ScriptedModel::new(vec![Ok(extracted("news", &[]))])
                .with_delay(Duration::from_secs(10)),
        );
        let signal = CancelSignal::never().with_deadline(Duration::from_millis(30));
        let report = orchestrator(model, vec![])
            .run(Submission::new("text"), &signal)
            .await
            .unwrap();

        let failure = report.failure.unwrap();
        assert_eq!(failure.code, FailureCode::PipelineCancelled);
        assert_eq!(failure.stage, PipelineStage::Analyzing);
        assert_eq!(failure.message, "Run deadline exceeded");
    }

    #[tokio::test]
    async fn test_corroboration_lowers_final_score() {
        let claim = "The city council approved the budget.";
        let provider = Arc::new(FakeProvider::new(
            "news_search",
            FakeBehavior::Items(vec![item("Council passes budget", claim)]),
        ));
        let model = Arc::new(ScriptedModel::new(vec![Ok(extracted("news", &[claim]))]));
        let report = orchestrator(model, vec![provider])
            .run(Submission::new(claim), &CancelSignal::never())
            .await
            .unwrap();

        // 0.25 + 0.04 - 0.10
        let risk = report.risk.unwrap();
        assert!((risk.score - 0.19).abs() < 1e-9);
        assert_eq!(risk.thresholds, RiskThresholds::default());
        assert_eq!(report.status, ReportStatus::Complete);
        assert_eq!(report.verification_score, Some(0.6));
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_independent() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(extracted("news", &["first"])),
            Ok(extracted("opinion", &["second"])),
        ]));
        let orchestrator = orchestrator(model, vec![]);
        let signal = CancelSignal::never();

        let (a, b) = tokio::join!(
            orchestrator.run(Submission::new("first text"), &signal),
            orchestrator.run(Submission::new("second text"), &signal),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.id, b.id);
        assert_ne!(a.content.fingerprint, b.content.fingerprint);
        assert_eq!(a.status, ReportStatus::Complete);
        assert_eq!(b.status, ReportStatus::Complete);
    }
}
