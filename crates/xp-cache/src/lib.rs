//! # xp-cache
//!
//! Caching infrastructure for the XP subsystem:
//!
//! - **RedisPool**: managed deadpool-redis pool implementing the
//!   `RemoteCache` port (tier 2 of the two-tier cache)
//! - **LocalCache**: capacity-bounded process-local TTL cache (tier 1)
//! - **Key schema**: the `keys` module owns every Redis key format
//! - **CooldownStore**: atomic message-cooldown check-and-set
//!
//! The read path the service layer builds on top: local hit, else remote
//! hit (populate local), else storage (populate both). Any cache failure
//! degrades to a miss.

pub mod cooldown;
pub mod keys;
pub mod local;
pub mod pool;

// Re-export pool types
pub use pool::{create_shared_pool, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult,
    SharedRedisPool};

// Re-export local cache
pub use local::LocalCache;

// Re-export cooldown store
pub use cooldown::CooldownStore;
