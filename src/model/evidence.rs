//! Verification evidence models

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity of an evidence provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct ProviderId(String);

impl ProviderId {
    pub const NEWS_SEARCH: &'static str = "news_search";
    pub const FACT_CHECK: &'static str = "fact_check";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceStatus {
    Ok,
    Unavailable,
    Error,
    Skipped,
}

/// One matched article or fact-check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EvidenceItem {
    pub title: String,
    pub url: Option<String>,
    pub publisher: Option<String>,
    /// The claim (or query) this item was found for
    pub matched_claim: String,
    /// Textual rating when the source is a fact-check
    pub rating: Option<String>,
}

/// Outcome of querying one provider during one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EvidenceRecord {
    pub provider: ProviderId,
    pub status: EvidenceStatus,
    pub items: Vec<EvidenceItem>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl EvidenceRecord {
    pub fn ok(provider: ProviderId, items: Vec<EvidenceItem>, elapsed_ms: u64) -> Self {
        Self {
            provider,
            status: EvidenceStatus::Ok,
            items,
            error: None,
            elapsed_ms,
        }
    }

    pub fn unavailable(provider: ProviderId, detail: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            provider,
            status: EvidenceStatus::Unavailable,
            items: Vec::new(),
            error: Some(detail.into()),
            elapsed_ms,
        }
    }

    pub fn error(provider: ProviderId, detail: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            provider,
            status: EvidenceStatus::Error,
            items: Vec::new(),
            error: Some(detail.into()),
            elapsed_ms,
        }
    }

    pub fn skipped(provider: ProviderId, reason: impl Into<String>) -> Self {
        Self {
            provider,
            status: EvidenceStatus::Skipped,
            items: Vec::new(),
            error: Some(reason.into()),
            elapsed_ms: 0,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == EvidenceStatus::Ok
    }

    /// OK and at least one matched item
    pub fn corroborates(&self) -> bool {
        self.is_ok() && !self.items.is_empty()
    }
}

/// Provider id → record, in dispatch order
///
/// Holds at most one record per provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceMap {
    records: Vec<EvidenceRecord>,
}

impl EvidenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any existing record for the same provider in place
    pub fn insert(&mut self, record: EvidenceRecord) {
        match self
            .records
            .iter_mut()
            .find(|r| r.provider == record.provider)
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    #[cfg(test)]
    pub fn get(&self, provider: &ProviderId) -> Option<&EvidenceRecord> {
        self.records.iter().find(|r| &r.provider == provider)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvidenceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[cfg(test)]
    pub fn providers(&self) -> Vec<ProviderId> {
        self.records.iter().map(|r| r.provider.clone()).collect()
    }

    /// Providers whose record is anything but OK
    pub fn non_ok_providers(&self) -> Vec<ProviderId> {
        self.records
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| r.provider.clone())
            .collect()
    }
}

impl FromIterator<EvidenceRecord> for EvidenceMap {
    fn from_iter<I: IntoIterator<Item = EvidenceRecord>>(iter: I) -> Self {
        let mut map = Self::new();
        for record in iter {
            map.insert(record);
        }
        map
    }
}
