//! External verification providers for cross-referencing extracted claims

mod fact_check;
mod news;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::model::{EvidenceItem, EvidenceRecord, PipelineConfig, ProviderId};

pub use fact_check::FactCheckProvider;
pub use news::NewsSearchProvider;

/// Upper bound on claims sent to one provider per run
const MAX_QUERIES_PER_SEARCH: usize = 3;

/// Longest query string sent to an external search API
const MAX_QUERY_CHARS: usize = 100;

const USER_AGENT: &str = "claimcheck/1.0";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Request timed out")]
    Timeout,

    #[error("Provider unreachable: {0}")]
    Unreachable(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Whether the source could not be checked at all, as opposed to answering with an error
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout | ProviderError::Unreachable(_) | ProviderError::RateLimited
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_connect() {
            ProviderError::Unreachable(e.to_string())
        } else if e.is_decode() {
            ProviderError::Parse(e.to_string())
        } else {
            ProviderError::Http(e.to_string())
        }
    }
}

/// Capability wrapping one external verification source
#[async_trait]
pub trait EvidenceProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Look up the claims; `timeout` bounds each outbound request
    async fn search(
        &self,
        claims: &[String],
        timeout: Duration,
    ) -> Result<Vec<EvidenceItem>, ProviderError>;

    /// Query the provider and fold every outcome into an [`EvidenceRecord`]
    ///
    /// A timeout, unreachable host or rate limit yields UNAVAILABLE; any other failure
    /// yields ERROR with the detail preserved.
    async fn query(&self, claims: &[String], timeout: Duration) -> EvidenceRecord {
        let id = self.id();
        let start = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.search(claims, timeout)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(items)) => {
                tracing::debug!(
                    provider = %id,
                    items = items.len(),
                    elapsed_ms = elapsed_ms,
                    "Provider query completed"
                );
                EvidenceRecord::ok(id, items, elapsed_ms)
            }
            Ok(Err(e)) if e.is_unavailable() => {
                tracing::warn!(
                    provider = %id,
                    error = %e,
                    elapsed_ms = elapsed_ms,
                    "Provider unavailable"
                );
                EvidenceRecord::unavailable(id, e.to_string(), elapsed_ms)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    provider = %id,
                    error = %e,
                    elapsed_ms = elapsed_ms,
                    "Provider returned an error"
                );
                EvidenceRecord::error(id, e.to_string(), elapsed_ms)
            }
            Err(_) => {
                tracing::warn!(
                    provider = %id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Provider timed out"
                );
                EvidenceRecord::unavailable(
                    id,
                    format!("No response within {} ms", timeout.as_millis()),
                    elapsed_ms,
                )
            }
        }
    }
}

/// Build the enabled providers in configured order
///
/// A provider without credentials is left out: unconfigured, not failing.
pub fn build_providers(config: &PipelineConfig) -> Vec<Arc<dyn EvidenceProvider>> {
    let mut providers: Vec<Arc<dyn EvidenceProvider>> = Vec::new();

    for id in &config.enabled_providers {
        let provider: Option<Arc<dyn EvidenceProvider>> = match id.as_str() {
            ProviderId::NEWS_SEARCH => NewsSearchProvider::from_env(config.max_items_per_provider)
                .map(|p| Arc::new(p) as Arc<dyn EvidenceProvider>),
            ProviderId::FACT_CHECK => FactCheckProvider::from_env(config.max_items_per_provider)
                .map(|p| Arc::new(p) as Arc<dyn EvidenceProvider>),
            other => {
                tracing::warn!(
                    provider = %other,
                    "Unknown evidence provider in configuration, ignoring"
                );
                continue;
            }
        };

        match provider {
            Some(p) => {
                tracing::info!(provider = %id, "Evidence provider enabled");
                providers.push(p);
            }
            None => {
                tracing::warn!(
                    provider = %id,
                    "Evidence provider has no credentials, not configured"
                );
            }
        }
    }

    providers
}

/// The claims actually sent to a provider, shortened for query strings
fn search_queries(claims: &[String]) -> Vec<String> {
    claims
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .take(MAX_QUERIES_PER_SEARCH)
        .map(|c| c.chars().take(MAX_QUERY_CHARS).collect())
        .collect()
}

/// Merge per-claim results: succeed if any query succeeded, else surface the first error
fn merge_results(
    results: Vec<Result<Vec<EvidenceItem>, ProviderError>>,
) -> Result<Vec<EvidenceItem>, ProviderError> {
    let mut items: Vec<EvidenceItem> = Vec::new();
    let mut first_error = None;
    let mut any_ok = false;

    for result in results {
        match result {
            Ok(found) => {
                any_ok = true;
                for item in found {
                    let duplicate = item.url.is_some()
                        && items.iter().any(|existing| existing.url == item.url);
                    if !duplicate {
                        items.push(item);
                    }
                }
            }
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match (any_ok, first_error) {
        (false, Some(e)) => Err(e),
        _ => Ok(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBehavior, FakeProvider, item};

    #[test]
    fn test_search_queries_limits_and_truncates() {
        let long = "x".repeat(250);
        let claims = vec![
            " ".to_string(),
            long.clone(),
            "b".to_string(),
            "c".to_string(),
            "d".to_string(),
        ];
        let queries = search_queries(&claims);
        assert_eq!(queries.len(), MAX_QUERIES_PER_SEARCH);
        assert_eq!(queries[0].len(), MAX_QUERY_CHARS);
        assert_eq!(queries[1], "b");
    }

    #[test]
    fn test_merge_partial_success_is_ok_and_dedups_urls() {
        let mut a = item("A", "claim 1");
        a.url = Some("https://x.test/1".to_string());
        let mut b = item("A again", "claim 2");
        b.url = Some("https://x.test/1".to_string());

        let merged = merge_results(vec![
            Ok(vec![a]),
            Err(ProviderError::RateLimited),
            Ok(vec![b]),
        ])
        .unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_all_failed_surfaces_first_error() {
        let merged = merge_results(vec![
            Err(ProviderError::Auth("bad key".to_string())),
            Err(ProviderError::Timeout),
        ]);
        assert_eq!(merged, Err(ProviderError::Auth("bad key".to_string())));
    }

    #[test]
    fn test_merge_no_queries_is_empty_ok() {
        assert_eq!(merge_results(vec![]), Ok(vec![]));
    }

    #[tokio::test]
    async fn test_query_maps_unavailable_errors() {
        let provider = FakeProvider::new("p", FakeBehavior::Fail(ProviderError::RateLimited));
        let record = provider.query(&["c".to_string()], Duration::from_secs(1)).await;
        assert_eq!(record.status, crate::model::evidence::EvidenceStatus::Unavailable);
        assert_eq!(record.error.as_deref(), Some("Rate limited"));
    }

    #[tokio::test]
    async fn test_query_preserves_error_detail() {
        let provider = FakeProvider::new(
            "p",
            FakeBehavior::Fail(ProviderError::Auth("invalid API key".to_string())),
        );
        let record = provider.query(&["c".to_string()], Duration::from_secs(1)).await;
        assert_eq!(record.status, crate::model::evidence::EvidenceStatus::Error);
        assert!(record.error.unwrap().contains("invalid API key"));
    }

    #[tokio::test]
    async fn test_query_times_out_as_unavailable() {
        let provider = FakeProvider::new(
            "slow",
            FakeBehavior::Hang(Duration::from_secs(30)),
        );
        let record = provider
            .query(&["c".to_string()], Duration::from_millis(20))
            .await;
        assert_eq!(record.status, crate::model::evidence::EvidenceStatus::Unavailable);
        assert!(record.items.is_empty());
        assert!(record.error.unwrap().contains("20 ms"));
    }

    #[test]
    fn test_build_providers_ignores_unknown_ids() {
        let config = PipelineConfig {
            enabled_providers: vec!["carrier_pigeon".into()],
            ..PipelineConfig::default()
        };
        assert!(build_providers(&config).is_empty());
    }
}
