//! Remote shared cache port
//!
//! String-valued key/value capability backed by Redis in production.
//! Callers serialize values themselves (JSON); any error from this port is
//! treated as a cache miss by the cache manager, never propagated upward.

use async_trait::async_trait;

/// Remote cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Result type for remote cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Remote shared cache capability
#[async_trait]
pub trait RemoteCache: Send + Sync {
    /// Get the value at `key`
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set `key` to `value`, with an optional TTL in seconds
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> CacheResult<()>;

    /// Atomically set `key` only if it does not exist; returns whether the
    /// write happened. This is the cooldown check-and-set primitive.
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<bool>;

    /// Delete a key; returns whether it existed
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Delete many keys; returns how many existed
    async fn delete_many(&self, keys: &[String]) -> CacheResult<u64>;

    /// Cursor-scan keys matching a glob pattern
    async fn scan(&self, pattern: &str, count: usize) -> CacheResult<Vec<String>>;

    /// Refresh the TTL on an existing key; returns whether the key existed
    async fn refresh_ttl(&self, key: &str, ttl_secs: u64) -> CacheResult<bool>;
}
