//! Redis connection pool module.
//!
//! Provides connection pooling for Redis using deadpool-redis and the
//! `RemoteCache` port implementation over it.

mod redis_pool;

pub use redis_pool::{
    create_shared_pool, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool,
};
