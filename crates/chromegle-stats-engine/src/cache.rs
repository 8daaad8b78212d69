//! TTL read-through caching.
//!
//! The cache is never a correctness dependency: a cache that cannot be read is
//! treated as a miss, and a value that cannot be stored is still returned. Stale
//! data is bounded only by the TTL; there is no explicit invalidation.
//!
//! Concurrent misses are not deduplicated. Several callers may recompute and
//! overwrite the same entry, which is harmless because recomputation is
//! idempotent.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// A value could not be encoded or decoded.
    #[error("cache serialization error: {0}")]
    Serialization(String),
}

/// A key-value cache with per-entry expiry over byte-string values.
#[async_trait]
pub trait KvCache: Send + Sync {
    /// Get a live value.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if the backend cannot be reached.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if the backend cannot be reached.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// An in-process cache backend.
///
/// The lock is held only for the map access itself, never across an await.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until overwritten or purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl KvCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }
}

/// Read `key` through the cache, computing and storing it on a miss.
///
/// Cache failures and undecodable entries degrade to a miss. Errors from
/// `compute` propagate and nothing is cached.
///
/// # Errors
///
/// Returns whatever `compute` returns on failure.
pub async fn read_through<C, T, E, F, Fut>(
    cache: &C,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<T, E>
where
    C: KvCache + ?Sized,
    T: Serialize + DeserializeOwned + Send,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
{
    match cache.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => {
                tracing::trace!(key = %key, "Cache hit");
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
            }
        },
        Ok(None) => {
            tracing::debug!(key = %key, "Cache miss");
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Cache read failed, computing directly");
        }
    }

    let value = compute().await?;

    match serde_json::to_vec(&value) {
        Ok(bytes) => {
            if let Err(e) = cache.set(key, bytes, ttl).await {
                tracing::warn!(key = %key, error = %e, "Cache write failed");
            }
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to encode value for cache");
        }
    }

    Ok(value)
}
