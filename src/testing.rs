//! Scripted fakes for the language model, evidence providers and the evidence cache

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::model::{EvidenceItem, EvidenceRecord, ExtractedAnalysis, ProviderId};
use crate::provider::{EvidenceProvider, ProviderError};
use crate::service::cache::{CacheError, EvidenceStore};
use crate::service::llm::{ExtractionRequest, LanguageModel, LlmError};

/// Language model answering from a fixed script, one entry per call
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ExtractedAnalysis, LlmError>>>,
    calls: AtomicUsize,
    preambles: Mutex<Vec<&'static str>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<ExtractedAnalysis, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            preambles: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn preambles(&self) -> Vec<&'static str> {
        self.preambles.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn extract_analysis(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractedAnalysis, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.preambles.lock().unwrap().push(request.preamble);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Unavailable("script exhausted".to_string())))
    }
}

/// A well-formed extraction
pub fn extracted(category: &str, claims: &[&str]) -> ExtractedAnalysis {
    ExtractedAnalysis {
        category: Some(category.to_string()),
        claims: claims.iter().map(|c| c.to_string()).collect(),
        entities: vec!["Acme Corp".to_string()],
        confidence: Some(0.9),
        ..ExtractedAnalysis::default()
    }
}

pub fn item(title: &str, claim: &str) -> EvidenceItem {
    EvidenceItem {
        title: title.to_string(),
        url: None,
        publisher: Some("Example Wire".to_string()),
        matched_claim: claim.to_string(),
        rating: None,
    }
}

#[derive(Debug, Clone)]
pub enum FakeBehavior {
    Items(Vec<EvidenceItem>),
    Fail(ProviderError),
    Hang(Duration),
    Panic,
}

pub struct FakeProvider {
    id: ProviderId,
    behavior: FakeBehavior,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(id: &str, behavior: FakeBehavior) -> Self {
        Self {
            id: ProviderId::new(id),
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EvidenceProvider for FakeProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn search(
        &self,
        _claims: &[String],
        _timeout: Duration,
    ) -> Result<Vec<EvidenceItem>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            FakeBehavior::Items(items) => Ok(items.clone()),
            FakeBehavior::Fail(e) => Err(e.clone()),
            FakeBehavior::Hang(d) => {
                tokio::time::sleep(*d).await;
                Ok(Vec::new())
            }
            FakeBehavior::Panic => panic!("provider {} blew up", self.id),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StoreBehavior {
    /// In-memory map
    Memory,
    /// Every call fails as if Redis refused the connection
    Fail,
    /// Every call waits forever
    Stall,
}

pub struct FakeStore {
    behavior: StoreBehavior,
    entries: Mutex<HashMap<String, EvidenceRecord>>,
    written: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn new(behavior: StoreBehavior) -> Self {
        Self {
            behavior,
            entries: Mutex::new(HashMap::new()),
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, key: &str, record: EvidenceRecord) {
        self.entries.lock().unwrap().insert(key.to_string(), record);
    }

    pub fn stored(&self, key: &str) -> Option<EvidenceRecord> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Keys written through `set_evidence`, in order
    pub fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    async fn misbehave(&self) -> Result<(), CacheError> {
        match self.behavior {
            StoreBehavior::Memory => Ok(()),
            StoreBehavior::Fail => Err(CacheError::Connection(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection refused",
            )))),
            StoreBehavior::Stall => std::future::pending().await,
        }
    }
}

#[async_trait]
impl EvidenceStore for FakeStore {
    async fn get_evidence(&self, key_hash: &str) -> Result<EvidenceRecord, CacheError> {
        self.misbehave().await?;
        self.stored(key_hash)
            .ok_or_else(|| CacheError::Miss(key_hash.to_string()))
    }

    async fn set_evidence(
        &self,
        key_hash: &str,
        record: &EvidenceRecord,
    ) -> Result<(), CacheError> {
        self.misbehave().await?;
        self.written.lock().unwrap().push(key_hash.to_string());
        self.seed(key_hash, record.clone());
        Ok(())
    }
}

/// A TCP server that accepts connections and never answers
pub async fn silent_redis() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    addr
}
