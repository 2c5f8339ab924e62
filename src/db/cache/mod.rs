use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppResult;

pub mod key;
pub mod memory;
pub mod redis_store;

mod macros;

pub use self::key::CacheKey;
pub use self::memory::MemoryCacheStore;
pub use self::redis_store::{create_redis_client, RedisCacheStore};

/// Key-value backend with TTL
///
/// Backends surface their own failures; [`Cache`] decides which of them the
/// request path is allowed to ignore.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Deletes every key starting with `prefix`
    async fn delete_by_prefix(&self, prefix: &str) -> AppResult<()>;
}

/// Typed, best-effort view over a [`CacheStore`]
///
/// Reads and writes never fail the caller: a backend error or an undecodable
/// payload is logged and treated as a miss. Deletions are reported so admin
/// tooling can tell whether an invalidation went through.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Retrieves and deserializes a cached value, `None` on miss or failure
    pub async fn get_from_cache<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let key = key.to_string();

        let payload = match self.store.get(&key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, falling through to store");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Serializes and stores a value; failures are logged and dropped
    pub async fn set_in_cache<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let key = key.to_string();

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };

        match self.store.set(&key, json, ttl).await {
            Ok(()) => tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "Cached"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Cache write failed"),
        }
    }

    pub async fn delete(&self, key: &CacheKey) -> AppResult<()> {
        self.store.delete(&key.to_string()).await
    }

    pub async fn delete_by_prefix(&self, prefix: &str) -> AppResult<()> {
        self.store.delete_by_prefix(prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::ContentKind;

    fn unavailable() -> AppError {
        AppError::CacheUnavailable(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )))
    }

    #[tokio::test]
    async fn test_read_failure_is_a_miss() {
        let mut store = MockCacheStore::new();
        store.expect_get().returning(|_| Err(unavailable()));

        let cache = Cache::new(Arc::new(store));
        let value: Option<Vec<i64>> = cache
            .get_from_cache(&CacheKey::detail(ContentKind::Movie, 1))
            .await;

        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_a_miss() {
        let mut store = MockCacheStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some("not json".to_string())));

        let cache = Cache::new(Arc::new(store));
        let value: Option<Vec<i64>> = cache.get_from_cache(&CacheKey::HomeBanners).await;

        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let mut store = MockCacheStore::new();
        store
            .expect_set()
            .times(1)
            .returning(|_, _, _| Err(unavailable()));

        let cache = Cache::new(Arc::new(store));
        cache
            .set_in_cache(&CacheKey::HomeBanners, &vec![1, 2, 3], Duration::from_secs(60))
            .await;
    }

    #[tokio::test]
    async fn test_round_trip_through_memory_store() {
        let cache = Cache::new(Arc::new(MemoryCacheStore::new()));
        let key = CacheKey::detail(ContentKind::Anime, 3);

        cache
            .set_in_cache(&key, &vec!["a".to_string()], Duration::from_secs(60))
            .await;
        let value: Option<Vec<String>> = cache.get_from_cache(&key).await;

        assert_eq!(value, Some(vec!["a".to_string()]));
    }
}
