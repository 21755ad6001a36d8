//! Cache stores for resolved athlete names
//!
//! A cache store is a flat key-value service with per-entry expiry. Redis is
//! the production backend; the file store keeps entries on local disk for
//! running without a Redis server.

mod file;
mod redis;

pub use self::file::FileStore;
pub use self::redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to a cache store
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis command or connection failed
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// Reading or writing a cache file failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cache file could not be encoded
    #[error("Failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),

    /// The requested expiry cannot be represented
    #[error("Invalid cache TTL: {0:?}")]
    InvalidTtl(Duration),
}

/// Key-value store with TTL-based expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, expiring after `ttl`
    async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> Result<(), CacheError>;
}
