//! Redis connection pool using deadpool-redis.
//!
//! The pool is the concrete tier-2 cache: it implements the `RemoteCache`
//! port from xp-core, so the service layer never names Redis directly.

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use std::sync::Arc;

use xp_core::{CacheError, CacheResult, RemoteCache};

/// Batch size for chunked multi-key deletes, bounding any single
/// operation's latency during cleanup passes
const DELETE_CHUNK_SIZE: usize = 100;

/// Redis pool configuration
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// Redis connection URL (e.g., `redis://localhost:6379`)
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: usize,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 16,
        }
    }
}

impl From<&xp_common::RedisConfig> for RedisPoolConfig {
    fn from(config: &xp_common::RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections as usize,
        }
    }
}

/// Error type for Redis pool operations
#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Failed to get connection from pool: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RedisPoolError> for CacheError {
    fn from(e: RedisPoolError) -> Self {
        match e {
            RedisPoolError::GetConnection(err) => CacheError::Connection(err.to_string()),
            RedisPoolError::Serialization(err) => CacheError::Serialization(err.to_string()),
            other => CacheError::Backend(other.to_string()),
        }
    }
}

/// Result type for Redis pool operations
pub type RedisResult<T> = Result<T, RedisPoolError>;

/// Managed Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl RedisPool {
    /// Create a new Redis pool with the given configuration
    pub fn new(config: RedisPoolConfig) -> RedisResult<Self> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?;

        // Redact credentials from URL for logging
        let safe_url = config.url.split('@').next_back().unwrap_or(&config.url);
        tracing::info!(
            url = %safe_url,
            max_connections = config.max_connections,
            "Redis pool created"
        );

        Ok(Self { pool })
    }

    /// Create a new Redis pool from xp-common config
    pub fn from_config(config: &xp_common::RedisConfig) -> RedisResult<Self> {
        Self::new(RedisPoolConfig::from(config))
    }

    /// Get a connection from the pool
    pub async fn connection(&self) -> RedisResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(RedisPoolError::GetConnection)
    }

    /// Check if the pool is healthy by pinging Redis
    pub async fn health_check(&self) -> RedisResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Serialize a value as JSON and store it with an optional TTL
    pub async fn set_json<V: serde::Serialize>(
        &self,
        key: &str,
        value: &V,
        ttl_seconds: Option<u64>,
    ) -> RedisResult<()> {
        let serialized = serde_json::to_string(value)?;
        self.set_raw(key, &serialized, ttl_seconds).await
    }

    /// Fetch and deserialize a JSON value
    pub async fn get_json<V: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> RedisResult<Option<V>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => Ok(Some(serde_json::from_str(&v)?)),
            None => Ok(None),
        }
    }

    /// Store a raw string with an optional TTL
    pub async fn set_raw(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> RedisResult<()> {
        let mut conn = self.connection().await?;
        match ttl_seconds {
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(key, value, ttl).await?;
            }
            None => {
                conn.set::<_, _, ()>(key, value).await?;
            }
        }
        Ok(())
    }

    /// `SET key value NX EX ttl` - the atomic check-and-set used by the
    /// cooldown gate. Returns true when this call won the write.
    pub async fn set_nx(&self, key: &str, value: &str, ttl_seconds: u64) -> RedisResult<bool> {
        let mut conn = self.connection().await?;
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;
        Ok(result.is_some())
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> RedisResult<bool> {
        let mut conn = self.connection().await?;
        let deleted: i32 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    /// Delete multiple keys in bounded chunks
    pub async fn delete_chunked(&self, keys: &[String]) -> RedisResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let mut total: u64 = 0;
        for chunk in keys.chunks(DELETE_CHUNK_SIZE) {
            let deleted: u64 = conn.del(chunk).await?;
            total += deleted;
        }
        Ok(total)
    }

    /// Set TTL for an existing key
    pub async fn expire(&self, key: &str, ttl_seconds: u64) -> RedisResult<bool> {
        let ttl = i64::try_from(ttl_seconds)
            .map_err(|_| RedisPoolError::CreatePool("TTL value too large".to_string()))?;
        let mut conn = self.connection().await?;
        let result: bool = conn.expire(key, ttl).await?;
        Ok(result)
    }

    /// Scan keys matching a pattern using cursor-based iteration.
    ///
    /// Cursor SCAN rather than KEYS: safe against large key spaces.
    pub async fn scan_keys(&self, pattern: &str, count: usize) -> RedisResult<Vec<String>> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut all_keys = Vec::new();

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(count)
                .query_async(&mut conn)
                .await?;

            all_keys.extend(keys);
            cursor = next_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(all_keys)
    }
}

#[async_trait]
impl RemoteCache for RedisPool {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection().await.map_err(CacheError::from)?;
        let value: Option<String> = conn.get(key).await.map_err(RedisPoolError::from)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> CacheResult<()> {
        self.set_raw(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<bool> {
        Ok(self.set_nx(key, value, ttl_secs).await?)
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(RedisPool::delete(self, key).await?)
    }

    async fn delete_many(&self, keys: &[String]) -> CacheResult<u64> {
        Ok(self.delete_chunked(keys).await?)
    }

    async fn scan(&self, pattern: &str, count: usize) -> CacheResult<Vec<String>> {
        Ok(self.scan_keys(pattern, count).await?)
    }

    async fn refresh_ttl(&self, key: &str, ttl_secs: u64) -> CacheResult<bool> {
        Ok(self.expire(key, ttl_secs).await?)
    }
}

/// Shared Redis pool wrapped in Arc for easy cloning
pub type SharedRedisPool = Arc<RedisPool>;

/// Create a shared Redis pool
pub fn create_shared_pool(config: RedisPoolConfig) -> RedisResult<SharedRedisPool> {
    Ok(Arc::new(RedisPool::new(config)?))
}
