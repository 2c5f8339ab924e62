use std::sync::Arc;
use tracing::instrument;

use crate::{
    db::CatalogStore,
    error::AppResult,
    models::{ContentKind, MediaCard},
};

/// Ranks items related to a source item of the same kind.
///
/// Items sharing tags come first, most shared tags first. When that leaves
/// the list short, it is topped up with the best-scored items sharing a
/// genre with the source.
#[derive(Clone)]
pub struct SimilarityRecommender {
    store: Arc<dyn CatalogStore>,
}

impl SimilarityRecommender {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn similar(
        &self,
        kind: ContentKind,
        id: i64,
        limit: usize,
    ) -> AppResult<Vec<MediaCard>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let tag_ids = self.store.fetch_tag_ids(kind, id).await?;

        let mut chosen: Vec<MediaCard> = if tag_ids.is_empty() {
            Vec::new()
        } else {
            self.store
                .tag_overlap_candidates(kind, id, &tag_ids, limit)
                .await?
                .into_iter()
                .map(|candidate| candidate.card)
                .collect()
        };
        chosen.truncate(limit);

        if chosen.len() < limit {
            let genres = self.store.fetch_genres(kind, id).await?;
            if genres.is_empty() {
                return Ok(chosen);
            }

            let exclude: Vec<i64> = chosen.iter().map(|card| card.id).collect();
            let fallback = self
                .store
                .genre_candidates(kind, id, &genres, &exclude, limit - chosen.len())
                .await?;

            tracing::debug!(
                primary = chosen.len(),
                fallback = fallback.len(),
                "Topped up similar items by genre"
            );
            chosen.extend(fallback);
            chosen.truncate(limit);
        }

        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::fixtures::item;
    use crate::db::store::MockCatalogStore;
    use crate::db::MemoryStore;
    use crate::error::AppError;

    fn ids(cards: &[MediaCard]) -> Vec<i64> {
        cards.iter().map(|c| c.id).collect()
    }

    async fn tagged(store: &MemoryStore, id: i64, tags: &[i64], score: Option<f64>, genres: &[&str]) {
        let mut entry = item(ContentKind::Movie, id, genres, score, Some(2010));
        entry.tag_ids = tags.to_vec();
        store.upsert(entry).await;
    }

    #[tokio::test]
    async fn test_ranks_by_overlap_then_score() {
        let store = Arc::new(MemoryStore::new());
        tagged(&store, 1, &[10, 20, 30], Some(7.0), &["Drama"]).await;
        // two shared tags, lower score
        tagged(&store, 2, &[10, 20], Some(7.0), &[]).await;
        // two shared tags, higher score
        tagged(&store, 3, &[20, 30], Some(8.0), &[]).await;
        // one shared tag, best score
        tagged(&store, 4, &[30], Some(9.5), &[]).await;

        let recommender = SimilarityRecommender::new(store);
        let cards = recommender.similar(ContentKind::Movie, 1, 6).await.unwrap();

        assert_eq!(ids(&cards), vec![3, 2, 4]);
    }

    #[tokio::test]
    async fn test_genre_fallback_fills_remaining_quota() {
        let store = Arc::new(MemoryStore::new());
        tagged(&store, 1, &[10], Some(7.0), &["Drama", "Crime"]).await;
        tagged(&store, 2, &[10], Some(6.0), &["Comedy"]).await;
        tagged(&store, 3, &[], Some(9.0), &["Crime"]).await;
        tagged(&store, 4, &[], None, &["Drama"]).await;
        tagged(&store, 5, &[], Some(9.9), &["Horror"]).await;
        tagged(&store, 6, &[], Some(8.0), &["Drama"]).await;

        let recommender = SimilarityRecommender::new(store);
        let cards = recommender.similar(ContentKind::Movie, 1, 3).await.unwrap();

        assert_eq!(ids(&cards), vec![2, 3, 6]);
    }

    #[tokio::test]
    async fn test_never_returns_source_or_duplicates() {
        let store = Arc::new(MemoryStore::new());
        tagged(&store, 1, &[10], Some(7.0), &["Drama"]).await;
        tagged(&store, 2, &[10], Some(6.0), &["Drama"]).await;
        tagged(&store, 3, &[], Some(5.0), &["Drama"]).await;

        let recommender = SimilarityRecommender::new(store);
        let cards = recommender.similar(ContentKind::Movie, 1, 10).await.unwrap();

        assert_eq!(ids(&cards), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_other_kinds_and_unpublished_are_excluded() {
        let store = Arc::new(MemoryStore::new());
        tagged(&store, 1, &[10], Some(7.0), &["Drama"]).await;
        tagged(&store, 2, &[10], Some(6.0), &["Drama"]).await;
        let mut tv = item(ContentKind::Tv, 3, &["Drama"], Some(9.0), Some(2010));
        tv.tag_ids = vec![10];
        store.upsert(tv).await;
        store
            .update(ContentKind::Movie, 2, |entry| entry.published = false)
            .await;

        let recommender = SimilarityRecommender::new(store);
        let cards = recommender.similar(ContentKind::Movie, 1, 6).await.unwrap();

        assert!(cards.is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit_makes_no_store_calls() {
        let mut store = MockCatalogStore::new();
        store.expect_fetch_tag_ids().never();
        store.expect_fetch_genres().never();

        let recommender = SimilarityRecommender::new(Arc::new(store));
        let cards = recommender.similar(ContentKind::Anime, 1, 0).await.unwrap();

        assert!(cards.is_empty());
    }

    #[tokio::test]
    async fn test_full_primary_skips_genre_lookup() {
        let mut store = MockCatalogStore::new();
        store.expect_fetch_tag_ids().returning(|_, _| Ok(vec![1, 2]));
        store
            .expect_tag_overlap_candidates()
            .returning(|kind, _, _, limit| {
                Ok((0..limit as i64)
                    .map(|i| crate::models::SimilarityCandidate {
                        card: crate::db::memory::fixtures::record(kind, 100 + i, "x").to_card(),
                        tag_overlap: 1,
                    })
                    .collect())
            });
        store.expect_fetch_genres().never();

        let recommender = SimilarityRecommender::new(Arc::new(store));
        let cards = recommender.similar(ContentKind::Tv, 1, 2).await.unwrap();

        assert_eq!(ids(&cards), vec![100, 101]);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockCatalogStore::new();
        store
            .expect_fetch_tag_ids()
            .returning(|_, _| Err(AppError::StoreUnavailable(sqlx::Error::PoolClosed)));

        let recommender = SimilarityRecommender::new(Arc::new(store));
        let result = recommender.similar(ContentKind::Movie, 1, 6).await;

        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }
}
