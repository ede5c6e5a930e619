//! NewsAPI article search provider
//!
//! Looks for published articles that mention each claim.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use super::{EvidenceProvider, ProviderError, USER_AGENT, merge_results, search_queries};
use crate::model::{EvidenceItem, ProviderId};

const NEWS_API_BASE_URL: &str = "https://newsapi.org/v2";
const ENV_NEWS_API_BASE_URL: &str = "NEWS_API_BASE_URL";
const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";

/// NewsAPI replaces takedown articles with this title
const REMOVED_TITLE: &str = "[Removed]";

// Response models - only the fields we need
#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    url: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// Evidence provider backed by the NewsAPI `everything` endpoint
pub struct NewsSearchProvider {
    client: Client,
    base_url: String,
    api_key: String,
    max_items: usize,
}

impl NewsSearchProvider {
    /// Create a provider with an explicit API key
    ///
    /// The base URL is resolved from:
    /// 1. `NEWS_API_BASE_URL` environment variable
    /// 2. Default NewsAPI URL
    pub fn new(api_key: String, max_items: usize) -> Self {
        let base_url =
            env::var(ENV_NEWS_API_BASE_URL).unwrap_or_else(|_| NEWS_API_BASE_URL.to_string());

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

    /// Create a provider from `NEWS_API_KEY`; None when the key is absent
    pub fn from_env(max_items: usize) -> Option<Self> {
        env::var(ENV_NEWS_API_KEY)
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
            &format!("{}/everything", self.base_url),
            &[
                ("q", claim),
                ("pageSize", page_size.as_str()),
                ("sortBy", "relevancy"),
                ("language", "en"),
            ],
        )
        .map_err(|e| ProviderError::Http(format!("Invalid NewsAPI URL: {}", e)))?;

        tracing::debug!(query = %claim, "Searching NewsAPI");

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .timeout(timeout)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::Auth(format!("NewsAPI HTTP {}", response.status())));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Http(format!(
                    "NewsAPI HTTP {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                )));
            }
            _ => {}
        }

        let body = response.text().await?;
        parse_articles(&body, claim, self.max_items)
    }
}

#[async_trait]
impl EvidenceProvider for NewsSearchProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderId::NEWS_SEARCH)
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

        merge_results(join_all(futures).await)
    }
}

/// Convert a NewsAPI response body into evidence items
fn parse_articles(
    body: &str,
    claim: &str,
    max_items: usize,
) -> Result<Vec<EvidenceItem>, ProviderError> {
    let response: EverythingResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(format!("Failed to deserialize articles: {}", e)))?;

    Ok(response
        .articles
        .into_iter()
        .filter_map(|article| {
            let title = article.title?.trim().to_string();
            if title.is_empty() || title == REMOVED_TITLE {
                return None;
            }
            Some(EvidenceItem {
                title,
                url: article.url,
                publisher: article.source.and_then(|s| s.name),
                matched_claim: claim.to_string(),
                rating: None,
            })
        })
        .take(max_items)
        .collect())
}
