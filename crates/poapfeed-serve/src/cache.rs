//! In-memory response caching with moka.
//!
//! The cache sits in front of the upstream POAP client: every feed render
//! attempts at most one upstream fetch sequence per distinct resource per
//! TTL window, which is the primary defense against upstream rate limits
//! and latency.
//!
//! Entries carry an explicit `expires_at` timestamp compared on read: an
//! expired entry is simply a miss and gets overwritten by the next
//! successful fetch. There is no background sweep; moka's own
//! `time_to_live` reclaims space for keys nobody asks about again.
//!
//! ## Cache keys
//!
//! - `event_{id}` - drop metadata
//! - `claims_{id}` - recent claims for a drop
//! - `address_{address}` - a wallet's collection (address lowercased)

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::FeedError;

/// Cached upstream response with its expiry.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    /// Serialized JSON payload.
    pub payload: String,
    /// Instant past which this entry is dead and must not be served.
    pub expires_at: DateTime<Utc>,
}

/// Type alias for the upstream response cache.
pub type FeedCache = Cache<String, CacheEntry>;

/// Create a new response cache.
///
/// `ttl_backstop` should comfortably exceed the per-entry TTL; it only
/// exists so moka eventually reclaims entries for keys never read again.
pub fn new_cache(capacity: u64, ttl_backstop: Duration) -> FeedCache {
    Cache::builder()
        .max_capacity(capacity)
        .time_to_live(ttl_backstop.max(Duration::from_secs(1)))
        .build()
}

/// Cache key for drop metadata.
pub fn event_key(event_id: u64) -> String {
    format!("event_{event_id}")
}

/// Cache key for a drop's recent claims.
pub fn claims_key(event_id: u64) -> String {
    format!("claims_{event_id}")
}

/// Cache key for an address collection. Case-normalized so `0xAB..` and
/// `0xab..` share an entry.
pub fn address_key(address: &str) -> String {
    format!("address_{}", address.to_lowercase())
}

/// Get a live cached value or fetch and cache it.
///
/// 1. A cached entry whose `expires_at` is still in the future is
///    deserialized and returned without invoking `fetch`.
/// 2. Otherwise `fetch` runs; on success the result is stored with
///    `expires_at = now + ttl` and returned.
/// 3. A failed fetch propagates its error and caches nothing.
///
/// Concurrent misses on one key may race to fetch-and-store; both compute
/// the same value and the last writer wins.
pub async fn get_or_fetch<T, F, Fut>(
    cache: &FeedCache,
    key: &str,
    ttl: chrono::Duration,
    fetch: F,
) -> Result<T, FeedError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    if let Some(entry) = cache.get(key).await {
        if entry.expires_at > Utc::now() {
            match serde_json::from_str(&entry.payload) {
                Ok(value) => {
                    tracing::debug!(key = %key, expires_at = %entry.expires_at, "cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    // Corrupted entry - log and fall through to refetch
                    tracing::warn!(key = %key, error = %e, "failed to deserialize cached entry");
                }
            }
        } else {
            tracing::debug!(key = %key, "cache entry expired");
        }
    }

    tracing::debug!(key = %key, "cache miss, fetching upstream");
    let value = fetch().await?;

    match serde_json::to_string(&value) {
        Ok(payload) => {
            let entry = CacheEntry {
                payload,
                expires_at: Utc::now() + ttl,
            };
            cache.insert(key.to_string(), entry).await;
        }
        Err(e) => {
            // Failed to serialize - log but still return the value
            tracing::warn!(key = %key, error = %e, "failed to serialize for cache");
        }
    }

    Ok(value)
}
