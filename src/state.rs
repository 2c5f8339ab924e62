use std::sync::Arc;

use crate::config::CacheTtls;
use crate::db::{Cache, CatalogStore};
use crate::services::{
    CacheInvalidator, DetailService, HomeService, ListService, SimilarityRecommender, UrlRewriter,
};

/// Shared application state
///
/// Every service shares the same store and cache handles; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub lists: ListService,
    pub details: DetailService,
    pub recommender: SimilarityRecommender,
    pub home: HomeService,
    pub invalidator: CacheInvalidator,
    pub urls: UrlRewriter,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        cache: Cache,
        ttls: CacheTtls,
        similar_limit: usize,
        urls: UrlRewriter,
    ) -> Self {
        Self {
            lists: ListService::new(store.clone(), cache.clone(), ttls.list),
            details: DetailService::new(store.clone(), cache.clone(), ttls.detail, similar_limit),
            recommender: SimilarityRecommender::new(store.clone()),
            home: HomeService::new(store, cache.clone(), ttls.home),
            invalidator: CacheInvalidator::new(cache),
            urls,
        }
    }
}
