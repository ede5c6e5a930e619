//! Cache key generation for provider evidence

use sha2::{Digest, Sha256};

use crate::model::ProviderId;

/// Bumped when the shape of cached records changes
const EVIDENCE_KEY_VERSION: &str = "v1";

/// Generate cache key hash for one provider's answer to a set of claims
///
/// The key is based on:
/// - provider id
/// - claims, trimmed, in query order
/// - key version
pub fn evidence_cache_key(provider: &ProviderId, claims: &[String]) -> String {
    let claims: Vec<&str> = claims.iter().map(|c| c.trim()).collect();

    let key_components = format!(
        "{}|{}|{}",
        provider,
        claims.join("\u{1f}"),
        EVIDENCE_KEY_VERSION
    );

    hash_string(&key_components)
}

/// Hash a string to a hex string using SHA256
fn hash_string(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}
