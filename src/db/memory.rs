use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tokio::sync::RwLock;

use super::store::CatalogStore;
use crate::error::AppResult;
use crate::models::{
    AwardMention, Banner, ContentKind, CreditRow, FranchiseRef, MediaCard, MediaRecord,
    SeasonSummary, SimilarityCandidate, Video,
};
use crate::services::query::{CompiledQuery, Predicate, SortKey};

/// One catalog entry together with everything hanging off it
#[derive(Debug, Clone)]
pub struct MemoryItem {
    pub record: MediaRecord,
    pub popularity: f64,
    pub published: bool,
    pub deleted: bool,
    /// Regional release dates beyond `record.release_date`, movies only
    pub release_dates: Vec<NaiveDate>,
    pub tag_ids: Vec<i64>,
    pub credits: Vec<CreditRow>,
    pub awards: Vec<AwardMention>,
    pub videos: Vec<Video>,
    pub seasons: Vec<SeasonSummary>,
    /// Position inside the record's franchise, movies only
    pub franchise_order: i32,
}

impl MemoryItem {
    /// A published, non-deleted item with no associations
    pub fn new(record: MediaRecord) -> Self {
        Self {
            record,
            popularity: 0.0,
            published: true,
            deleted: false,
            release_dates: Vec::new(),
            tag_ids: Vec::new(),
            credits: Vec::new(),
            awards: Vec::new(),
            videos: Vec::new(),
            seasons: Vec::new(),
            franchise_order: 0,
        }
    }

    fn visible(&self) -> bool {
        self.published && !self.deleted
    }

    fn matches(&self, predicate: &Predicate) -> bool {
        let record = &self.record;
        let any_of = |values: &[String], wanted: &[String]| {
            values
                .iter()
                .any(|v| wanted.iter().any(|w| v.to_lowercase() == *w))
        };

        match predicate {
            Predicate::NotDeleted => !self.deleted,
            Predicate::Published => self.published,
            Predicate::GenresOverlap(genres) => any_of(&record.genres, genres),
            Predicate::RegionsOverlap(regions) => any_of(&record.regions, regions),
            Predicate::LanguageContains(language) => {
                any_of(&record.languages, std::slice::from_ref(language))
            }
            Predicate::MinScore(min) => record.douban_score.is_some_and(|s| s >= *min),
            Predicate::ReleaseYearBetween { start, end } => record
                .release_date
                .iter()
                .chain(&self.release_dates)
                .any(|d| (*start..=*end).contains(&d.year())),
            Predicate::AirStatusIn(statuses) => record
                .air_status
                .as_ref()
                .is_some_and(|s| statuses.contains(&s.to_lowercase())),
            Predicate::Origin(origin) => record.origin.as_deref() == Some(origin.as_str()),
        }
    }
}

/// Descending comparison with missing values last
fn desc_nulls_last<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(ordering: SortKey, a: &MemoryItem, b: &MemoryItem) -> Ordering {
    let primary = match ordering {
        SortKey::Popularity => desc_nulls_last(Some(a.popularity), Some(b.popularity)),
        SortKey::Score => desc_nulls_last(a.record.douban_score, b.record.douban_score),
        SortKey::ReleaseDate => desc_nulls_last(a.record.release_date, b.record.release_date),
    };

    primary.then_with(|| a.record.id.cmp(&b.record.id))
}

#[derive(Default)]
struct Catalog {
    items: HashMap<(ContentKind, i64), MemoryItem>,
    franchises: HashMap<i64, String>,
    banners: Vec<Banner>,
}

impl Catalog {
    fn visible(&self, kind: ContentKind, id: i64) -> Option<&MemoryItem> {
        self.items.get(&(kind, id)).filter(|item| item.visible())
    }

    fn of_kind(&self, kind: ContentKind) -> impl Iterator<Item = &MemoryItem> {
        self.items
            .iter()
            .filter(move |((k, _), _)| *k == kind)
            .map(|(_, item)| item)
    }
}

/// In-process catalog store
///
/// Evaluates compiled queries with the same semantics as the PostgreSQL
/// adapter. Used by tests and local runs without a database; counts every
/// store call so cache behaviour can be observed.
#[derive(Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(AtomicOrdering::SeqCst)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, AtomicOrdering::SeqCst);
    }

    pub async fn upsert(&self, item: MemoryItem) {
        let mut catalog = self.catalog.write().await;
        catalog
            .items
            .insert((item.record.kind, item.record.id), item);
    }

    /// Applies `change` to an item; returns `false` if it does not exist
    pub async fn update<F>(&self, kind: ContentKind, id: i64, change: F) -> bool
    where
        F: FnOnce(&mut MemoryItem),
    {
        let mut catalog = self.catalog.write().await;
        match catalog.items.get_mut(&(kind, id)) {
            Some(item) => {
                change(item);
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, kind: ContentKind, id: i64) -> Option<MemoryItem> {
        self.catalog.write().await.items.remove(&(kind, id))
    }

    pub async fn add_franchise(&self, id: i64, name_cn: impl Into<String>) {
        self.catalog
            .write()
            .await
            .franchises
            .insert(id, name_cn.into());
    }

    /// Banners are stored unresolved; titles and artwork come from the item
    pub async fn add_banner(&self, banner: Banner) {
        self.catalog.write().await.banners.push(banner);
    }

    async fn matching(&self, kind: ContentKind, query: &CompiledQuery) -> Vec<MemoryItem> {
        let catalog = self.catalog.read().await;
        let mut items: Vec<MemoryItem> = catalog
            .of_kind(kind)
            .filter(|item| query.predicates.iter().all(|p| item.matches(p)))
            .cloned()
            .collect();

        items.sort_by(|a, b| compare(query.ordering, a, b));
        items
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn count(&self, kind: ContentKind, query: &CompiledQuery) -> AppResult<u64> {
        self.record_read();
        Ok(self.matching(kind, query).await.len() as u64)
    }

    async fn fetch_cards(
        &self,
        kind: ContentKind,
        query: &CompiledQuery,
    ) -> AppResult<Vec<MediaCard>> {
        self.record_read();
        let offset = usize::try_from(query.window.offset).unwrap_or(usize::MAX);

        Ok(self
            .matching(kind, query)
            .await
            .iter()
            .skip(offset)
            .take(query.window.limit as usize)
            .map(|item| item.record.to_card())
            .collect())
    }

    async fn fetch_record(&self, kind: ContentKind, id: i64) -> AppResult<Option<MediaRecord>> {
        self.record_read();
        let catalog = self.catalog.read().await;
        Ok(catalog.visible(kind, id).map(|item| item.record.clone()))
    }

    async fn fetch_credits(&self, kind: ContentKind, id: i64) -> AppResult<Vec<CreditRow>> {
        self.record_read();
        let catalog = self.catalog.read().await;
        let mut credits = catalog
            .items
            .get(&(kind, id))
            .map(|item| item.credits.clone())
            .unwrap_or_default();
        credits.sort_by_key(|c| c.display_order);
        Ok(credits)
    }

    async fn fetch_awards(&self, kind: ContentKind, id: i64) -> AppResult<Vec<AwardMention>> {
        self.record_read();
        let catalog = self.catalog.read().await;
        Ok(catalog
            .items
            .get(&(kind, id))
            .map(|item| item.awards.clone())
            .unwrap_or_default())
    }

    async fn fetch_videos(&self, kind: ContentKind, id: i64) -> AppResult<Vec<Video>> {
        self.record_read();
        let catalog = self.catalog.read().await;
        let mut videos = catalog
            .items
            .get(&(kind, id))
            .map(|item| item.videos.clone())
            .unwrap_or_default();
        videos.sort_by(|a, b| desc_nulls_last(a.published_at, b.published_at).then(a.id.cmp(&b.id)));
        Ok(videos)
    }

    async fn fetch_franchise(
        &self,
        franchise_id: i64,
        movie_id: i64,
    ) -> AppResult<Option<FranchiseRef>> {
        self.record_read();
        let catalog = self.catalog.read().await;

        let Some(name_cn) = catalog.franchises.get(&franchise_id) else {
            return Ok(None);
        };

        let members: Vec<&MemoryItem> = catalog
            .of_kind(ContentKind::Movie)
            .filter(|item| item.record.franchise_id == Some(franchise_id))
            .collect();

        let order = members
            .iter()
            .find(|item| item.record.id == movie_id)
            .map(|item| item.franchise_order)
            .unwrap_or(0);
        let total = members.iter().filter(|item| item.visible()).count();

        Ok(Some(FranchiseRef {
            id: franchise_id,
            name_cn: name_cn.clone(),
            order,
            total: i32::try_from(total).unwrap_or(i32::MAX),
        }))
    }

    async fn fetch_seasons(&self, kind: ContentKind, id: i64) -> AppResult<Vec<SeasonSummary>> {
        self.record_read();
        let catalog = self.catalog.read().await;
        let mut seasons = catalog
            .items
            .get(&(kind, id))
            .map(|item| item.seasons.clone())
            .unwrap_or_default();
        seasons.sort_by_key(|s| s.season_number);
        Ok(seasons)
    }

    async fn fetch_tag_ids(&self, kind: ContentKind, id: i64) -> AppResult<Vec<i64>> {
        self.record_read();
        let catalog = self.catalog.read().await;
        let mut tags = catalog
            .items
            .get(&(kind, id))
            .map(|item| item.tag_ids.clone())
            .unwrap_or_default();
        tags.sort_unstable();
        tags.dedup();
        Ok(tags)
    }

    async fn fetch_genres(&self, kind: ContentKind, id: i64) -> AppResult<Vec<String>> {
        self.record_read();
        let catalog = self.catalog.read().await;
        Ok(catalog
            .visible(kind, id)
            .map(|item| item.record.genres.clone())
            .unwrap_or_default())
    }

    async fn tag_overlap_candidates(
        &self,
        kind: ContentKind,
        id: i64,
        tag_ids: &[i64],
        limit: usize,
    ) -> AppResult<Vec<SimilarityCandidate>> {
        self.record_read();
        let catalog = self.catalog.read().await;

        let mut scored: Vec<(&MemoryItem, u32)> = catalog
            .of_kind(kind)
            .filter(|item| item.visible() && item.record.id != id)
            .filter_map(|item| {
                let mut shared: Vec<i64> = item
                    .tag_ids
                    .iter()
                    .copied()
                    .filter(|t| tag_ids.contains(t))
                    .collect();
                shared.sort_unstable();
                shared.dedup();
                let overlap = u32::try_from(shared.len()).unwrap_or(u32::MAX);
                (overlap > 0).then_some((item, overlap))
            })
            .collect();

        scored.sort_by(|(a, oa), (b, ob)| {
            ob.cmp(oa)
                .then_with(|| desc_nulls_last(a.record.douban_score, b.record.douban_score))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(item, tag_overlap)| SimilarityCandidate {
                card: item.record.to_card(),
                tag_overlap,
            })
            .collect())
    }

    async fn genre_candidates(
        &self,
        kind: ContentKind,
        id: i64,
        genres: &[String],
        exclude: &[i64],
        limit: usize,
    ) -> AppResult<Vec<MediaCard>> {
        self.record_read();
        let catalog = self.catalog.read().await;

        let mut matches: Vec<&MemoryItem> = catalog
            .of_kind(kind)
            .filter(|item| {
                item.visible()
                    && item.record.id != id
                    && !exclude.contains(&item.record.id)
                    && item.record.genres.iter().any(|g| genres.contains(g))
            })
            .collect();

        matches.sort_by(|a, b| compare(SortKey::Score, a, b));

        Ok(matches
            .into_iter()
            .take(limit)
            .map(|item| item.record.to_card())
            .collect())
    }

    async fn fetch_active_banners(&self) -> AppResult<Vec<Banner>> {
        self.record_read();
        let catalog = self.catalog.read().await;

        let mut resolved: BTreeMap<(i32, i64), Banner> = BTreeMap::new();
        for banner in &catalog.banners {
            let Some(item) = catalog.visible(banner.content_type, banner.content_id) else {
                continue;
            };

            resolved.insert(
                (banner.display_order, banner.id),
                Banner {
                    title_cn: item.record.title_cn.clone(),
                    poster_key: item.record.poster_key.clone(),
                    backdrop_key: item.record.backdrop_key.clone(),
                    backdrop_url: None,
                    ..banner.clone()
                },
            );
        }

        Ok(resolved.into_values().collect())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn record(kind: ContentKind, id: i64, title: &str) -> MediaRecord {
        MediaRecord {
            id,
            kind,
            title_cn: title.to_string(),
            title_original: None,
            title_aliases: Vec::new(),
            tagline: None,
            synopsis: None,
            genres: Vec::new(),
            regions: Vec::new(),
            languages: Vec::new(),
            release_date: None,
            last_air_date: None,
            air_status: None,
            origin: None,
            studio: None,
            number_of_seasons: None,
            number_of_episodes: None,
            douban_score: None,
            douban_rating_count: None,
            imdb_score: None,
            imdb_id: None,
            poster_key: Some(format!("posters/{}/{}.jpg", kind, id)),
            backdrop_key: None,
            extra_posters: Vec::new(),
            extra_backdrops: Vec::new(),
            production_companies: Vec::new(),
            franchise_id: None,
        }
    }

    pub fn item(
        kind: ContentKind,
        id: i64,
        genres: &[&str],
        score: Option<f64>,
        year: Option<i32>,
    ) -> MemoryItem {
        let mut record = record(kind, id, &format!("{} {}", kind, id));
        record.genres = genres.iter().map(|g| g.to_string()).collect();
        record.douban_score = score;
        record.release_date = year.and_then(|y| NaiveDate::from_ymd_opt(y, 6, 1));
        MemoryItem::new(record)
    }
}
