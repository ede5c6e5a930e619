//! Submitted content and ingestion validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Reasons a submission is rejected before any pipeline stage runs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("content is empty")]
    Empty,

    #[error("content is too long: {length} characters (maximum {max})")]
    TooLong { length: usize, max: usize },
}

/// Raw text submitted for analysis
///
/// Created once at ingestion and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContentItem {
    pub text: String,
    /// SHA-256 of the raw text, lowercase hex
    pub fingerprint: String,
    pub source_url: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl ContentItem {
    /// Validate and fingerprint a submission
    pub fn ingest(
        text: &str,
        source_url: Option<String>,
        max_chars: usize,
    ) -> Result<Self, ContentError> {
        if text.trim().is_empty() {
            return Err(ContentError::Empty);
        }

        let length = text.chars().count();
        if length > max_chars {
            return Err(ContentError::TooLong {
                length,
                max: max_chars,
            });
        }

        Ok(Self {
            text: text.to_string(),
            fingerprint: fingerprint(text),
            source_url: source_url.filter(|u| !u.trim().is_empty()),
            submitted_at: Utc::now(),
        })
    }

    /// Leading characters of the text, cut on a char boundary
    pub fn excerpt(&self, max_chars: usize) -> String {
        self.text.trim().chars().take(max_chars).collect()
    }
}

fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
