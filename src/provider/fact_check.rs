//! Google Fact Check Tools claim search provider

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{EvidenceProvider, ProviderError, USER_AGENT, merge_results, search_queries};
use crate::model::{EvidenceItem, ProviderId};

const FACT_CHECK_BASE_URL: &str = "https://factchecktools.googleapis.com/v1alpha1";
const ENV_FACT_CHECK_BASE_URL: &str = "FACT_CHECK_BASE_URL";
const ENV_FACT_CHECK_API_KEY: &str = "GOOGLE_FACT_CHECK_API_KEY";

#[derive(Debug, Deserialize)]
struct ClaimSearchResponse {
    #[serde(default)]
    claims: Vec<FactCheckedClaim>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FactCheckedClaim {
    text: Option<String>,
    #[serde(default)]
    claim_review: Vec<ClaimReview>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimReview {
    publisher: Option<Publisher>,
    url: Option<String>,
    title: Option<String>,
    textual_rating: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    name: Option<String>,
    site: Option<String>,
}

/// Evidence provider backed by the Fact Check Tools `claims:search` endpoint
pub struct FactCheckProvider {
    client: Client,
    base_url: String,
    api_key: String,
    max_items: usize,
}

impl FactCheckProvider {
    /// Create a provider with an explicit API key
    ///
    /// The base URL is resolved from:
    /// 1. `FACT_CHECK_BASE_URL` environment variable
    /// 2. Default Fact Check Tools URL
    pub fn new(api_key: String, max_items: usize) -> Self {
        let base_url =
            env::var(ENV_FACT_CHECK_BASE_URL).unwrap_or_else(|_| FACT_CHECK_BASE_URL.to_string());

        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            api_key,
            max_items: max_items.max(1),
        }
    }

    /// Create a provider from `GOOGLE_FACT_CHECK_API_KEY`; None when the key is absent
    pub fn from_env(max_items: usize) -> Option<Self> {
        env::var(ENV_FACT_CHECK_API_KEY)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|key| Self::new(key, max_items))
    }

    async fn search_claim(
        &self,
        claim: &str,
        timeout: Duration,
    ) -> Result<Vec<EvidenceItem>, ProviderError> {
        let page_size = self.max_items.to_string();
        let url = Url::parse_with_params(
            &format!("{}/claims:search", self.base_url),
            &[
                ("query", claim),
                ("pageSize", page_size.as_str()),
                ("key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| ProviderError::Http(format!("Invalid Fact Check URL: {}", e)))?;

        tracing::debug!(query = %claim, "Searching Fact Check Tools");

        let response = self.client.get(url).timeout(timeout).send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::Auth(format!(
                    "Fact Check Tools HTTP {}",
                    response.status()
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            status if !status.is_success() => {
                // Never echo the request URL: it carries the API key
                return Err(ProviderError::Http(format!("Fact Check Tools HTTP {}", status)));
            }
            _ => {}
        }

        let body = response.text().await?;
        parse_claims(&body, claim, self.max_items)
    }
}

#[async_trait]
impl EvidenceProvider for FactCheckProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderId::FACT_CHECK)
    }

    async fn search(
        &self,
        claims: &[String],
        timeout: Duration,
    ) -> Result<Vec<EvidenceItem>, ProviderError> {
        let queries = search_queries(claims);
        let futures: Vec<_> = queries
            .iter()
            .map(|q| self.search_claim(q, timeout))
            .collect();

        merge_results(join_all(futures).await).map_err(strip_key)
    }
}

/// reqwest errors include the request URL, which carries the API key
fn strip_key(error: ProviderError) -> ProviderError {
    match error {
        ProviderError::Unreachable(_) => {
            ProviderError::Unreachable("Fact Check Tools connection failed".to_string())
        }
        ProviderError::Http(msg) if msg.contains("key=") => {
            ProviderError::Http("Fact Check Tools request failed".to_string())
        }
        other => other,
    }
}

/// Convert a claims:search response body into evidence items, one per reviewed claim
fn parse_claims(
    body: &str,
    claim: &str,
    max_items: usize,
) -> Result<Vec<EvidenceItem>, ProviderError> {
    let response: ClaimSearchResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(format!("Failed to deserialize claims: {}", e)))?;

    Ok(response
        .claims
        .into_iter()
        .filter_map(|fc| {
            let review = fc.claim_review.into_iter().next();
            let title = fc
                .text
                .or_else(|| review.as_ref().and_then(|r| r.title.clone()))?
                .trim()
                .to_string();
            if title.is_empty() {
                return None;
            }

            let (url, publisher, rating) = match review {
                Some(r) => (
                    r.url,
                    r.publisher.and_then(|p| p.name.or(p.site)),
                    r.textual_rating,
                ),
                None => (None, None, None),
            };

            Some(EvidenceItem {
                title,
                url,
                publisher,
                matched_claim: claim.to_string(),
                rating,
            })
        })
        .take(max_items)
        .collect())
}
