//! Key/value caching.
//!
//! `MemoryCache` keeps entries in process with a sliding expiry; `RedisCache` stores them in
//! Redis under a key prefix. Values are JSON strings; `get_json`/`set_json` do the typing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Sliding expiry applied by `MemoryCache` when no ttl is given.
pub const DEFAULT_SLIDING_EXPIRY: Duration = Duration::from_secs(30 * 60);

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait CacheService: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value`; `ttl` is an absolute lifetime, `None` uses the backend default.
    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

pub async fn get_json<T: DeserializeOwned>(cache: &dyn CacheService, key: &str) -> Result<Option<T>, CacheError> {
    match cache.get_raw(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize + Sync + ?Sized>(
    cache: &dyn CacheService,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value)?;
    cache.set_raw(key, raw, ttl).await
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
    /// Set for sliding entries; each read pushes the expiry forward by this much.
    sliding: Option<Duration>,
}

/// In-process cache.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    sliding_expiry: Duration,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_sliding_expiry(DEFAULT_SLIDING_EXPIRY)
    }

    pub fn with_sliding_expiry(sliding_expiry: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            sliding_expiry,
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries().values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries();
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                if let Some(window) = entry.sliding {
                    entry.expires_at = now + window;
                }
                Ok(Some(entry.value.clone()))
            }
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        let (lifetime, sliding) = match ttl {
            Some(ttl) => (ttl, None),
            None => (self.sliding_expiry, Some(self.sliding_expiry)),
        };
        self.entries().insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + lifetime,
                sliding,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Redis-backed cache. Keys are stored as `{prefix}{key}`.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    prefix: String,
    default_ttl: Duration,
}

impl RedisCache {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            prefix: "foodx:".to_string(),
            default_ttl: DEFAULT_SLIDING_EXPIRY,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut con = self.connection.clone();
        let value: Option<String> = con.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        let seconds = ttl.unwrap_or(self.default_ttl).as_secs().max(1);
        let _: () = redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut con)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        let _: () = con.del(self.key(key)).await?;
        Ok(())
    }
}

/// `redis` connects to `redis_url`, falling back to memory when Redis is unreachable.
/// Anything else gives an in-process cache.
pub async fn build_cache(backend: &str, redis_url: &str, default_ttl: Duration) -> Arc<dyn CacheService> {
    if backend.eq_ignore_ascii_case("redis") {
        match crate::redis::create_redis_pool(redis_url).await {
            Ok(connection) => return Arc::new(RedisCache::new(connection).with_default_ttl(default_ttl)),
            Err(e) => tracing::warn!(error = %e, "Redis cache unavailable, using in-memory cache"),
        }
    }
    Arc::new(MemoryCache::with_sliding_expiry(default_ttl))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Lookup {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_json_round_trip_through_memory_cache() {
        let cache = MemoryCache::new();
        let value = Lookup {
            name: "Grains".into(),
            count: 3,
        };

        set_json(&cache, "lookup", &value, None).await.unwrap();
        let cached: Option<Lookup> = get_json(&cache, "lookup").await.unwrap();

        assert_eq!(cached, Some(value));
    }

    #[tokio::test]
    async fn test_absolute_ttl_expires() {
        let cache = MemoryCache::new();
        cache
            .set_raw("short", "v".into(), Some(Duration::from_millis(10)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get_raw("short").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_backend_builds_memory_cache() {
        let cache = build_cache("memory", "redis://unused", DEFAULT_SLIDING_EXPIRY).await;
        cache.set_raw("k", "v".into(), None).await.unwrap();
        assert_eq!(cache.get_raw("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_remove_drops_entry() {
        let cache = MemoryCache::new();
        cache.set_raw("k", "v".into(), None).await.unwrap();
        cache.remove("k").await.unwrap();
        assert_eq!(cache.get_raw("k").await.unwrap(), None);
    }
}
