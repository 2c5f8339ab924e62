use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::{
    cached,
    db::{Cache, CacheKey, CatalogStore},
    error::AppResult,
    models::{ContentKind, MediaCard, PagedResult, Pagination, RawListFilter},
    services::{normalizer::normalize, query::compile},
};

/// Filtered, paginated listings with read-through caching
#[derive(Clone)]
pub struct ListService {
    store: Arc<dyn CatalogStore>,
    cache: Cache,
    ttl: Duration,
}

impl ListService {
    pub fn new(store: Arc<dyn CatalogStore>, cache: Cache, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    /// Returns one page of `kind` matching `raw`.
    ///
    /// Equivalent filters share a cache entry. A hit is returned verbatim; a
    /// store failure propagates and leaves the cache untouched.
    #[instrument(skip(self, raw))]
    pub async fn get_list(
        &self,
        kind: ContentKind,
        raw: &RawListFilter,
    ) -> AppResult<PagedResult<MediaCard>> {
        let filter = normalize(raw).scoped_to(kind);
        let key = CacheKey::list(kind, &filter)?;

        cached!(self.cache, key, self.ttl, async {
            let query = compile(kind, &filter)?;

            let total = self.store.count(kind, &query).await?;
            let data = self.store.fetch_cards(kind, &query).await?;

            tracing::debug!(total, returned = data.len(), "Built list page");

            Ok::<_, crate::error::AppError>(PagedResult {
                data,
                pagination: Pagination::new(filter.page, filter.page_size, total),
            })
        })
    }
}
