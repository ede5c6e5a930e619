//! Concurrent verification across all configured evidence providers
//!
//! Every provider yields exactly one record per run. A provider that errors, panics, hangs
//! or is unreachable is contained to its own record and never affects the others.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::join_all;

use crate::model::{AnalysisResult, ContentItem, EvidenceMap, EvidenceRecord, ProviderId};
use crate::provider::EvidenceProvider;
use crate::service::cache::{CacheError, EvidenceStore};
use crate::service::cache_keys::evidence_cache_key;

/// Extra time granted beyond the provider timeout before a call is abandoned
const TIMEOUT_GRACE: Duration = Duration::from_millis(250);

/// Upper bound on a cache read or write; never more than the provider timeout
const CACHE_TIMEOUT: Duration = Duration::from_millis(500);

/// Characters of content used as the query when nothing else is available
const FALLBACK_QUERY_CHARS: usize = 100;

const ABANDONED_DETAIL: &str = "Abandoned: pipeline cancelled";

pub struct VerificationFanout {
    providers: Vec<Arc<dyn EvidenceProvider>>,
    timeout: Duration,
    cache: Option<Arc<dyn EvidenceStore>>,
}

impl VerificationFanout {
    /// Providers are dispatched, and reported, in the given order
    pub fn new(providers: Vec<Arc<dyn EvidenceProvider>>, timeout: Duration) -> Self {
        Self {
            providers,
            timeout,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Option<Arc<dyn EvidenceStore>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Query every provider concurrently and wait for all of them
    pub async fn verify(&self, claims: &[String]) -> EvidenceMap {
        if self.providers.is_empty() {
            return EvidenceMap::new();
        }

        let start_time = Instant::now();

        let futures: Vec<_> = self
            .providers
            .iter()
            .map(|provider| self.query_isolated(provider.as_ref(), claims))
            .collect();

        let evidence: EvidenceMap = join_all(futures).await.into_iter().collect();

        tracing::info!(
            providers = evidence.len(),
            unavailable = evidence.non_ok_providers().len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Verification fanout completed"
        );

        evidence
    }

    /// The records a cancelled run reports: every provider UNAVAILABLE
    pub fn abandoned(&self) -> EvidenceMap {
        self.providers
            .iter()
            .map(|p| EvidenceRecord::unavailable(p.id(), ABANDONED_DETAIL, 0))
            .collect()
    }

    fn cache_timeout(&self) -> Duration {
        self.timeout.min(CACHE_TIMEOUT)
    }

    async fn query_isolated(
        &self,
        provider: &dyn EvidenceProvider,
        claims: &[String],
    ) -> EvidenceRecord {
        let id = provider.id();

        if claims.is_empty() {
            return EvidenceRecord::skipped(id, "No claims to verify");
        }

        let cache_key = evidence_cache_key(&id, claims);
        if let Some(cache) = &self.cache
            && let Some(mut record) = self.cached(cache.as_ref(), &id, &cache_key).await
        {
            tracing::debug!(provider = %id, "Evidence cache hit");
            record.provider = id;
            record.elapsed_ms = 0;
            return record;
        }

        let start = Instant::now();
        let call = AssertUnwindSafe(provider.query(claims, self.timeout)).catch_unwind();

        let mut record = match tokio::time::timeout(self.timeout + TIMEOUT_GRACE, call).await {
            Ok(Ok(record)) => record,
            Ok(Err(panic)) => {
                let detail = panic_message(panic.as_ref());
                tracing::error!(provider = %id, panic = %detail, "Evidence provider panicked");
                EvidenceRecord::error(
                    id.clone(),
                    format!("Provider panicked: {}", detail),
                    start.elapsed().as_millis() as u64,
                )
            }
            Err(_) => {
                tracing::warn!(
                    provider = %id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Evidence provider ignored its timeout, abandoning call"
                );
                EvidenceRecord::unavailable(
                    id.clone(),
                    format!("No response within {} ms", self.timeout.as_millis()),
                    start.elapsed().as_millis() as u64,
                )
            }
        };

        // The record is filed under the id the provider was registered with
        record.provider = id;

        if record.is_ok()
            && let Some(cache) = &self.cache
        {
            self.store_in_background(Arc::clone(cache), cache_key, record.clone());
        }

        record
    }

    /// A cached OK record, or None on a miss, a failure or a slow cache
    async fn cached(
        &self,
        cache: &dyn EvidenceStore,
        id: &ProviderId,
        cache_key: &str,
    ) -> Option<EvidenceRecord> {
        match tokio::time::timeout(self.cache_timeout(), cache.get_evidence(cache_key)).await {
            Ok(Ok(record)) if record.is_ok() => Some(record),
            Ok(Ok(_)) | Ok(Err(CacheError::Miss(_))) => None,
            Ok(Err(e)) => {
                tracing::warn!(provider = %id, error = %e, "Evidence cache read failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    provider = %id,
                    timeout_ms = self.cache_timeout().as_millis() as u64,
                    "Evidence cache read timed out"
                );
                None
            }
        }
    }

    /// Write an OK record without holding up the run
    fn store_in_background(
        &self,
        cache: Arc<dyn EvidenceStore>,
        cache_key: String,
        record: EvidenceRecord,
    ) {
        let timeout = self.cache_timeout();
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, cache.set_evidence(&cache_key, &record)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        provider = %record.provider,
                        error = %e,
                        "Failed to cache evidence"
                    );
                }
                Err(_) => {
                    tracing::warn!(provider = %record.provider, "Evidence cache write timed out");
                }
            }
        });
    }
}

/// Queries sent to providers: the claims, else the entities, else the start of the text
pub fn verification_queries(analysis: &AnalysisResult, content: &ContentItem) -> Vec<String> {
    if !analysis.claims.is_empty() {
        return analysis.claims.clone();
    }

    if !analysis.entities.is_empty() {
        return analysis.entities.iter().cloned().collect();
    }

    let excerpt = content.excerpt(FALLBACK_QUERY_CHARS);
    if excerpt.is_empty() {
        Vec::new()
    } else {
        vec![excerpt]
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
