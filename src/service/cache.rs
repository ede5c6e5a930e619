//! Redis cache service for verification evidence

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};

use crate::model::EvidenceRecord;

// Environment variable names
const ENV_REDIS_HOST: &str = "CLAIMCHECK_REDIS_HOST";
const ENV_REDIS_PORT: &str = "CLAIMCHECK_REDIS_PORT";
const ENV_REDIS_PASSWORD: &str = "CLAIMCHECK_REDIS_PASSWORD";
const ENV_REDIS_DB: &str = "CLAIMCHECK_REDIS_DB";
const ENV_CACHE_TTL: &str = "CLAIMCHECK_CACHE_TTL";
const ENV_CACHE_TIMEOUT_MS: &str = "CLAIMCHECK_CACHE_TIMEOUT_MS";

// Default values
const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
const DEFAULT_REDIS_PORT: &str = "6379";
const DEFAULT_REDIS_DB: &str = "0";
const DEFAULT_TTL_SECONDS: u64 = 3600; // 1 hour
const DEFAULT_TIMEOUT_MS: u64 = 500;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cache miss for key: {0}")]
    Miss(String),
}

const PREFIX_EVIDENCE: &str = "evidence:";

/// Storage for OK provider records, keyed by [`evidence_cache_key`]
///
/// [`evidence_cache_key`]: crate::service::cache_keys::evidence_cache_key
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn get_evidence(&self, key_hash: &str) -> Result<EvidenceRecord, CacheError>;

    async fn set_evidence(
        &self,
        key_hash: &str,
        record: &EvidenceRecord,
    ) -> Result<(), CacheError>;
}

/// Redis-based cache for provider results
#[derive(Clone)]
pub struct EvidenceCache {
    client: Client,
    ttl_seconds: u64,
    /// Bounds connecting and every response
    timeout: Duration,
}

impl EvidenceCache {
    /// Create a new cache instance and verify connection
    ///
    /// Configuration via environment variables:
    /// - `CLAIMCHECK_REDIS_HOST` - Redis host (default: 127.0.0.1)
    /// - `CLAIMCHECK_REDIS_PORT` - Redis port (default: 6379)
    /// - `CLAIMCHECK_REDIS_PASSWORD` - Redis password (default: none)
    /// - `CLAIMCHECK_REDIS_DB` - Redis database number (default: 0)
    /// - `CLAIMCHECK_CACHE_TTL` - Cache TTL in seconds (default: 3600)
    /// - `CLAIMCHECK_CACHE_TIMEOUT_MS` - Connect and response timeout (default: 500)
    pub async fn new() -> Result<Self, CacheError> {
        let host = env::var(ENV_REDIS_HOST).unwrap_or_else(|_| DEFAULT_REDIS_HOST.to_string());
        let port = env::var(ENV_REDIS_PORT).unwrap_or_else(|_| DEFAULT_REDIS_PORT.to_string());
        let password = env::var(ENV_REDIS_PASSWORD).ok();
        let db = env::var(ENV_REDIS_DB).unwrap_or_else(|_| DEFAULT_REDIS_DB.to_string());

        let ttl_seconds = env::var(ENV_CACHE_TTL)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TTL_SECONDS);
        let timeout = env::var(ENV_CACHE_TIMEOUT_MS)
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS));

        // redis://[password@]host:port/db
        let redis_url = match password {
            Some(pwd) if !pwd.is_empty() => format!("redis://:{}@{}:{}/{}", pwd, host, port, db),
            _ => format!("redis://{}:{}/{}", host, port, db),
        };

        tracing::debug!(host = %host, port = %port, db = %db, "Connecting to Redis");

        let cache = Self::with_url(&redis_url, ttl_seconds, timeout)?;
        cache.ping().await?;

        tracing::info!(host = %host, port = %port, "Redis connection established");

        Ok(cache)
    }

    /// Build a cache for `redis_url` without connecting
    pub fn with_url(
        redis_url: &str,
        ttl_seconds: u64,
        timeout: Duration,
    ) -> Result<Self, CacheError> {
        Ok(Self {
            client: Client::open(redis_url)?,
            ttl_seconds,
            timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let conn = self
            .client
            .get_multiplexed_async_connection_with_timeouts(self.timeout, self.timeout)
            .await?;
        Ok(conn)
    }

    /// Round-trip a PING, used at startup and by the readiness probe
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get_with_prefix<T: DeserializeOwned>(
        &self,
        prefix: &str,
        key: &str,
    ) -> Result<T, CacheError> {
        let full_key = format!("{}{}", prefix, key);
        let mut conn = self.connection().await?;

        let data: Option<String> = conn.get(&full_key).await?;

        match data {
            Some(json) => {
                serde_json::from_str(&json).map_err(|e| CacheError::Serialization(e.to_string()))
            }
            None => Err(CacheError::Miss(key.to_string())),
        }
    }

    async fn set_with_prefix<T: Serialize>(
        &self,
        prefix: &str,
        key: &str,
        data: &T,
    ) -> Result<(), CacheError> {
        let full_key = format!("{}{}", prefix, key);
        let json =
            serde_json::to_string(data).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(&full_key, json, self.ttl_seconds).await?;

        tracing::debug!(key = %full_key, ttl = self.ttl_seconds, "Cached data");
        Ok(())
    }
}

#[async_trait]
impl EvidenceStore for EvidenceCache {
    async fn get_evidence(&self, key_hash: &str) -> Result<EvidenceRecord, CacheError> {
        self.get_with_prefix(PREFIX_EVIDENCE, key_hash).await
    }

    async fn set_evidence(
        &self,
        key_hash: &str,
        record: &EvidenceRecord,
    ) -> Result<(), CacheError> {
        self.set_with_prefix(PREFIX_EVIDENCE, key_hash, record).await
    }
}
