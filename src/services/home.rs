use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::{
    cached,
    db::{Cache, CacheKey, CatalogStore},
    error::AppResult,
    models::{ContentKind, HomeFeed, MediaCard},
    services::query::CompiledQuery,
};

/// Cards per hot list on the home feed
pub const HOT_LIST_SIZE: u32 = 8;

/// Landing page feed: active banners plus the most popular items per section
#[derive(Clone)]
pub struct HomeService {
    store: Arc<dyn CatalogStore>,
    cache: Cache,
    ttl: Duration,
}

impl HomeService {
    pub fn new(store: Arc<dyn CatalogStore>, cache: Cache, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    #[instrument(skip(self))]
    pub async fn get_home(&self) -> AppResult<HomeFeed> {
        cached!(self.cache, CacheKey::HomeBanners, self.ttl, self.build())
    }

    async fn build(&self) -> AppResult<HomeFeed> {
        let (banners, hot_movies, hot_tv, hot_anime_cn, hot_anime_jp) = tokio::try_join!(
            self.store.fetch_active_banners(),
            self.hot(ContentKind::Movie, None),
            self.hot(ContentKind::Tv, None),
            self.hot(ContentKind::Anime, Some("cn")),
            self.hot(ContentKind::Anime, Some("jp")),
        )?;

        tracing::debug!(banners = banners.len(), "Assembled home feed");

        Ok(HomeFeed {
            banners,
            hot_movies,
            hot_tv,
            hot_anime_cn,
            hot_anime_jp,
        })
    }

    async fn hot(&self, kind: ContentKind, origin: Option<&str>) -> AppResult<Vec<MediaCard>> {
        let query = CompiledQuery::hot(origin, HOT_LIST_SIZE);
        self.store.fetch_cards(kind, &query).await
    }
}
