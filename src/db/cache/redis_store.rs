use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ErrorKind, RedisError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::CacheStore;
use crate::error::{AppError, AppResult};

/// Keys fetched per SCAN round trip during prefix deletion
const SCAN_BATCH: usize = 200;

/// Upper bound on a single connection attempt
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Minimum gap between connection attempts while Redis is unreachable
const RECONNECT_COOLDOWN: Duration = Duration::from_secs(5);

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

#[derive(Default)]
struct Link {
    manager: Option<ConnectionManager>,
    last_attempt: Option<Instant>,
}

/// Redis-backed cache store
///
/// The multiplexed [`ConnectionManager`] is established lazily: when Redis is
/// unreachable every call fails with `CacheUnavailable` and a new connection
/// is attempted at most once per cooldown. Once connected, the manager
/// reconnects on its own; clones share the same connection.
#[derive(Clone)]
pub struct RedisCacheStore {
    client: Client,
    link: Arc<Mutex<Link>>,
}

fn unavailable(reason: &'static str) -> AppError {
    AppError::CacheUnavailable(RedisError::from((ErrorKind::IoError, reason)))
}

impl RedisCacheStore {
    /// Attempts an initial connection; failure is logged and retried on use
    pub async fn connect(client: Client) -> Self {
        let store = Self {
            client,
            link: Arc::new(Mutex::new(Link::default())),
        };

        if let Err(e) = store.connection().await {
            tracing::warn!(error = %e, "Redis unreachable, starting without cache");
        }

        store
    }

    async fn connection(&self) -> AppResult<ConnectionManager> {
        let mut link = self.link.lock().await;

        if let Some(manager) = &link.manager {
            return Ok(manager.clone());
        }
        if link
            .last_attempt
            .is_some_and(|at| at.elapsed() < RECONNECT_COOLDOWN)
        {
            return Err(unavailable("Redis connection is not established"));
        }

        link.last_attempt = Some(Instant::now());
        let manager =
            match tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(self.client.clone()))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(unavailable("Timed out connecting to Redis")),
            };

        tracing::info!("Connected to Redis cache");
        link.manager = Some(manager.clone());
        Ok(manager)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection().await?;
        // SETEX rejects a zero expiry
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key).await?;
        tracing::debug!(key = %key, "Deleted cache key");
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut deleted = 0usize;

        // SCAN, never KEYS
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let _: () = conn.del(&keys).await?;
                deleted += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        tracing::debug!(prefix = %prefix, deleted, "Deleted cache keys by prefix");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::{Cache, CacheKey};

    // Requires a running Redis; skipped unless REDIS_URL is set.
    async fn connect() -> Option<RedisCacheStore> {
        let redis_url = std::env::var("REDIS_URL").ok()?;
        let client = create_redis_client(&redis_url).ok()?;
        Some(RedisCacheStore::connect(client).await)
    }

    #[tokio::test]
    async fn test_unreachable_redis_degrades_to_misses() {
        let client = create_redis_client("redis://127.0.0.1:1/").unwrap();
        let store = RedisCacheStore::connect(client).await;

        assert!(matches!(
            store.get("movie:detail:1").await,
            Err(AppError::CacheUnavailable(_))
        ));
        assert!(matches!(
            store.delete_by_prefix("movie:list:").await,
            Err(AppError::CacheUnavailable(_))
        ));

        let cache = Cache::new(Arc::new(store));
        let key = CacheKey::detail(crate::models::ContentKind::Movie, 1);
        cache.set_in_cache(&key, &1, Duration::from_secs(60)).await;
        assert_eq!(cache.get_from_cache::<i32>(&key).await, None);
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let Some(store) = connect().await else {
            return;
        };

        store
            .set("test:redis_store:key", "value".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.get("test:redis_store:key").await.unwrap(),
            Some("value".to_string())
        );

        store.delete("test:redis_store:key").await.unwrap();
        assert_eq!(store.get("test:redis_store:key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_by_prefix_leaves_other_prefixes() {
        let Some(store) = connect().await else {
            return;
        };

        for i in 0..5 {
            store
                .set(&format!("test:prefix_a:{}", i), "a".to_string(), Duration::from_secs(60))
                .await
                .unwrap();
        }
        store
            .set("test:prefix_b:0", "b".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        store.delete_by_prefix("test:prefix_a:").await.unwrap();

        assert_eq!(store.get("test:prefix_a:3").await.unwrap(), None);
        assert_eq!(
            store.get("test:prefix_b:0").await.unwrap(),
            Some("b".to_string())
        );

        store.delete("test:prefix_b:0").await.unwrap();
    }
}
