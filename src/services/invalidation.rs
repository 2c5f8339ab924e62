use tracing::instrument;

use crate::{
    db::{Cache, CacheKey},
    error::AppResult,
    models::ContentKind,
};

/// Removes derived entries after catalog mutations.
///
/// Every deletion is attempted even if an earlier one failed; the first
/// failure is returned once all of them have run. Deletions are idempotent.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Cache,
}

/// Deferred deletion of one cache entry or key prefix
enum Target {
    Key(CacheKey),
    Prefix(String),
}

impl CacheInvalidator {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Drops the item's detail view, every list page of its kind and the
    /// home feed
    #[instrument(skip(self))]
    pub async fn invalidate(&self, kind: ContentKind, id: i64) -> AppResult<()> {
        self.run(vec![
            Target::Key(CacheKey::detail(kind, id)),
            Target::Prefix(CacheKey::list_prefix(kind)),
            Target::Key(CacheKey::HomeBanners),
        ])
        .await
    }

    #[instrument(skip(self))]
    pub async fn invalidate_home(&self) -> AppResult<()> {
        self.run(vec![Target::Key(CacheKey::HomeBanners)]).await
    }

    /// Drops every list page of every kind and the home feed
    #[instrument(skip(self))]
    pub async fn flush_all(&self) -> AppResult<()> {
        let mut targets: Vec<Target> = ContentKind::ALL
            .iter()
            .map(|kind| Target::Prefix(CacheKey::list_prefix(*kind)))
            .collect();
        targets.push(Target::Key(CacheKey::HomeBanners));

        self.run(targets).await
    }

    async fn run(&self, targets: Vec<Target>) -> AppResult<()> {
        let mut first_error = None;

        for target in targets {
            let (label, result) = match &target {
                Target::Key(key) => (key.to_string(), self.cache.delete(key).await),
                Target::Prefix(prefix) => {
                    (format!("{}*", prefix), self.cache.delete_by_prefix(prefix).await)
                }
            };

            match result {
                Ok(()) => tracing::debug!(entry = %label, "Invalidated"),
                Err(e) => {
                    tracing::error!(entry = %label, error = %e, "Cache invalidation failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cache::MockCacheStore;
    use crate::db::MemoryCacheStore;
    use crate::error::AppError;
    use crate::models::ListFilter;
    use mockall::predicate::eq;
    use std::sync::Arc;
    use std::time::Duration;

    async fn seeded() -> (CacheInvalidator, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = Cache::new(store.clone());
        let ttl = Duration::from_secs(600);

        for kind in ContentKind::ALL {
            let list = CacheKey::list(kind, &ListFilter::default()).unwrap();
            cache.set_in_cache(&list, &1, ttl).await;
            cache.set_in_cache(&CacheKey::detail(kind, 1), &1, ttl).await;
            cache.set_in_cache(&CacheKey::detail(kind, 2), &1, ttl).await;
        }
        cache.set_in_cache(&CacheKey::HomeBanners, &1, ttl).await;

        (CacheInvalidator::new(cache), store)
    }

    #[tokio::test]
    async fn test_invalidate_scope() {
        let (invalidator, store) = seeded().await;

        invalidator.invalidate(ContentKind::Tv, 1).await.unwrap();

        let keys = store.keys().await;
        assert!(!keys.contains(&"tv:detail:1".to_string()));
        assert!(!keys.contains(&"home:banners".to_string()));
        assert!(!keys.iter().any(|k| k.starts_with("tv:list:")));

        assert!(keys.contains(&"tv:detail:2".to_string()));
        assert!(keys.contains(&"movie:detail:1".to_string()));
        assert!(keys.iter().any(|k| k.starts_with("movie:list:")));
        assert!(keys.iter().any(|k| k.starts_with("anime:list:")));
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let (invalidator, store) = seeded().await;

        invalidator.invalidate(ContentKind::Anime, 1).await.unwrap();
        let after_first = store.keys().await;
        invalidator.invalidate(ContentKind::Anime, 1).await.unwrap();

        assert_eq!(store.keys().await, after_first);
    }

    #[tokio::test]
    async fn test_flush_all_keeps_details() {
        let (invalidator, store) = seeded().await;

        invalidator.flush_all().await.unwrap();

        let keys = store.keys().await;
        assert_eq!(keys.len(), 6);
        assert!(keys.iter().all(|k| k.contains(":detail:")));
    }

    #[tokio::test]
    async fn test_invalidate_home_only_touches_home() {
        let (invalidator, store) = seeded().await;

        invalidator.invalidate_home().await.unwrap();

        let keys = store.keys().await;
        assert_eq!(keys.len(), 9);
        assert!(!keys.contains(&"home:banners".to_string()));
    }

    #[tokio::test]
    async fn test_failure_reported_after_remaining_deletions() {
        let mut store = MockCacheStore::new();
        store
            .expect_delete()
            .with(eq("movie:detail:4"))
            .times(1)
            .returning(|_| {
                Err(AppError::CacheUnavailable(redis::RedisError::from((
                    redis::ErrorKind::IoError,
                    "broken pipe",
                ))))
            });
        store
            .expect_delete_by_prefix()
            .with(eq("movie:list:"))
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_delete()
            .with(eq("home:banners"))
            .times(1)
            .returning(|_| Ok(()));

        let invalidator = CacheInvalidator::new(Cache::new(Arc::new(store)));
        let result = invalidator.invalidate(ContentKind::Movie, 4).await;

        assert!(matches!(result, Err(AppError::CacheUnavailable(_))));
    }
}
