use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    AwardMention, Banner, ContentKind, CreditRow, FranchiseRef, MediaCard, MediaRecord,
    SeasonSummary, SimilarityCandidate, Video,
};
use crate::services::query::CompiledQuery;

/// Read access to the persistent catalog
///
/// Every method that returns catalog entries only returns published,
/// non-deleted rows of the requested kind. Errors surface as
/// `AppError::StoreUnavailable`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Exact number of rows matching the query predicates (window ignored)
    async fn count(&self, kind: ContentKind, query: &CompiledQuery) -> AppResult<u64>;

    /// One ordered, windowed page of rows matching the query predicates
    async fn fetch_cards(&self, kind: ContentKind, query: &CompiledQuery)
        -> AppResult<Vec<MediaCard>>;

    async fn fetch_record(&self, kind: ContentKind, id: i64) -> AppResult<Option<MediaRecord>>;

    /// Credits joined with people, ordered by display order
    async fn fetch_credits(&self, kind: ContentKind, id: i64) -> AppResult<Vec<CreditRow>>;

    async fn fetch_awards(&self, kind: ContentKind, id: i64) -> AppResult<Vec<AwardMention>>;

    /// Videos, newest first
    async fn fetch_videos(&self, kind: ContentKind, id: i64) -> AppResult<Vec<Video>>;

    /// Position of `movie_id` within its franchise
    async fn fetch_franchise(&self, franchise_id: i64, movie_id: i64)
        -> AppResult<Option<FranchiseRef>>;

    /// Season summaries ordered by season number
    async fn fetch_seasons(&self, kind: ContentKind, id: i64) -> AppResult<Vec<SeasonSummary>>;

    /// Tag (keyword) ids associated with an item
    async fn fetch_tag_ids(&self, kind: ContentKind, id: i64) -> AppResult<Vec<i64>>;

    /// Genres of a published item; empty when the item is absent
    async fn fetch_genres(&self, kind: ContentKind, id: i64) -> AppResult<Vec<String>>;

    /// Items other than `id` sharing at least one of `tag_ids`, with the
    /// number of shared tags, best `limit` by (overlap, score) descending.
    ///
    /// Items sharing no tag are never returned, even when fewer than `limit`
    /// items qualify; those are reached only through `genre_candidates`.
    async fn tag_overlap_candidates(
        &self,
        kind: ContentKind,
        id: i64,
        tag_ids: &[i64],
        limit: usize,
    ) -> AppResult<Vec<SimilarityCandidate>>;

    /// Items other than `id` and `exclude` whose genres intersect `genres`,
    /// best `limit` by score descending
    async fn genre_candidates(
        &self,
        kind: ContentKind,
        id: i64,
        genres: &[String],
        exclude: &[i64],
        limit: usize,
    ) -> AppResult<Vec<MediaCard>>;

    /// Banners currently inside their display window, resolved against
    /// published content and ordered by display order
    async fn fetch_active_banners(&self) -> AppResult<Vec<Banner>>;
}
