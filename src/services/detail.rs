use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::{
    cached,
    db::{Cache, CacheKey, CatalogStore},
    error::{AppError, AppResult},
    models::{ContentKind, CreditGroups, CreditRow, MediaDetail},
    services::SimilarityRecommender,
};

/// Maximum people kept per credit group
pub const CREDIT_GROUP_CAP: usize = 20;

/// Assembles full detail views of single catalog items
#[derive(Clone)]
pub struct DetailService {
    store: Arc<dyn CatalogStore>,
    cache: Cache,
    recommender: SimilarityRecommender,
    ttl: Duration,
    similar_limit: usize,
}

impl DetailService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        cache: Cache,
        ttl: Duration,
        similar_limit: usize,
    ) -> Self {
        Self {
            recommender: SimilarityRecommender::new(store.clone()),
            store,
            cache,
            ttl,
            similar_limit,
        }
    }

    /// Detail view of one published item.
    ///
    /// Missing items are reported as `NotFound` and never cached. Any failing
    /// auxiliary fetch fails the whole view.
    #[instrument(skip(self))]
    pub async fn get_detail(&self, kind: ContentKind, id: i64) -> AppResult<MediaDetail> {
        let key = CacheKey::detail(kind, id);
        cached!(self.cache, key, self.ttl, self.build(kind, id))
    }

    async fn build(&self, kind: ContentKind, id: i64) -> AppResult<MediaDetail> {
        let record = self
            .store
            .fetch_record(kind, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", kind, id)))?;

        let franchise = async {
            match record.franchise_id {
                Some(franchise_id) if kind.has_franchise() => {
                    self.store.fetch_franchise(franchise_id, id).await
                }
                _ => Ok(None),
            }
        };

        let seasons = async {
            if kind.has_seasons() {
                self.store.fetch_seasons(kind, id).await
            } else {
                Ok(Vec::new())
            }
        };

        let (credits, awards, videos, franchise, seasons, similar) = tokio::try_join!(
            self.store.fetch_credits(kind, id),
            self.store.fetch_awards(kind, id),
            self.store.fetch_videos(kind, id),
            franchise,
            seasons,
            self.recommender.similar(kind, id, self.similar_limit),
        )?;

        tracing::debug!(
            id,
            credits = credits.len(),
            similar = similar.len(),
            "Assembled detail"
        );

        Ok(MediaDetail {
            record,
            credits: group_credits(credits),
            awards,
            videos,
            franchise,
            seasons,
            similar,
            poster_url: None,
            backdrop_url: None,
        })
    }
}

enum CreditGroup {
    Director,
    Writer,
    Cast,
    Producer,
    Other,
}

fn classify(row: &CreditRow) -> CreditGroup {
    let role = row.role.trim().to_lowercase();
    let department = row
        .department
        .as_deref()
        .map(|d| d.trim().to_lowercase())
        .unwrap_or_default();

    let is = |names: &[&str]| names.contains(&role.as_str()) || names.contains(&department.as_str());

    if is(&["director", "directing"]) {
        CreditGroup::Director
    } else if is(&["writer", "writing"]) {
        CreditGroup::Writer
    } else if is(&["cast", "actor", "acting"]) {
        CreditGroup::Cast
    } else if is(&["producer", "production"]) {
        CreditGroup::Producer
    } else {
        CreditGroup::Other
    }
}

/// Splits credit rows into display groups, each ordered by display order
/// and capped at [`CREDIT_GROUP_CAP`]
pub fn group_credits(mut rows: Vec<CreditRow>) -> CreditGroups {
    rows.sort_by_key(|row| row.display_order);

    let mut groups = CreditGroups::default();
    for row in rows {
        let group = match classify(&row) {
            CreditGroup::Director => &mut groups.directors,
            CreditGroup::Writer => &mut groups.writers,
            CreditGroup::Cast => &mut groups.cast,
            CreditGroup::Producer => &mut groups.producers,
            CreditGroup::Other => &mut groups.others,
        };

        if group.len() < CREDIT_GROUP_CAP {
            group.push(row.into());
        }
    }

    groups
}
