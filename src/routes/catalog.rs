use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::str::FromStr;

use crate::{
    error::{AppError, AppResult},
    models::{ContentKind, HomeFeed, MediaCard, MediaDetail, PagedResult, RawListFilter},
    state::AppState,
};

/// Default and maximum `limit` of the similar endpoint
const DEFAULT_SIMILAR_LIMIT: i64 = 6;
const MAX_SIMILAR_LIMIT: i64 = 50;

/// List query string; multi-value fields are comma separated.
///
/// Scalars arrive as text so malformed values are reported as JSON errors.
/// Unparsable paging falls back to the defaults; an unparsable `year` or
/// `min_score` is rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    genres: Option<String>,
    regions: Option<String>,
    air_status: Option<String>,
    decade: Option<String>,
    year: Option<String>,
    language: Option<String>,
    min_score: Option<String>,
    sort: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
}

fn split_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

/// Blank values count as absent
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_strict<T: FromStr>(name: &str, value: Option<String>) -> AppResult<Option<T>> {
    present(value)
        .map(|v| {
            v.parse()
                .map_err(|_| AppError::InvalidInput(format!("{} must be a number, got '{}'", name, v)))
        })
        .transpose()
}

fn parse_lenient(value: Option<String>) -> Option<i64> {
    present(value).and_then(|v| v.parse().ok())
}

impl TryFrom<ListQuery> for RawListFilter {
    type Error = AppError;

    fn try_from(query: ListQuery) -> AppResult<Self> {
        Ok(Self {
            genres: split_csv(query.genres),
            regions: split_csv(query.regions),
            decade: query.decade,
            year: parse_strict("year", query.year)?,
            language: query.language,
            min_score: parse_strict("min_score", query.min_score)?,
            sort: query.sort,
            page: parse_lenient(query.page),
            page_size: parse_lenient(query.page_size),
            air_statuses: split_csv(query.air_status),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SimilarQuery {
    limit: Option<String>,
}

impl SimilarQuery {
    /// Requested limit clamped to `0..=MAX_SIMILAR_LIMIT`
    fn limit(self) -> AppResult<usize> {
        let limit = parse_strict::<i64>("limit", self.limit)?
            .unwrap_or(DEFAULT_SIMILAR_LIMIT)
            .clamp(0, MAX_SIMILAR_LIMIT);

        Ok(limit as usize)
    }
}

fn parse_id(id: &str) -> AppResult<i64> {
    id.parse()
        .map_err(|_| AppError::InvalidInput(format!("Invalid id: {}", id)))
}

/// Handler for filtered catalog listings
pub async fn list(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PagedResult<MediaCard>>> {
    let kind: ContentKind = kind.parse()?;
    let raw = RawListFilter::try_from(query)?;
    let page = state.lists.get_list(kind, &raw).await?;

    Ok(Json(PagedResult {
        data: state.urls.cards(page.data),
        pagination: page.pagination,
    }))
}

/// Handler for a single item's detail view
pub async fn detail(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> AppResult<Json<MediaDetail>> {
    let kind: ContentKind = kind.parse()?;
    let detail = state.details.get_detail(kind, parse_id(&id)?).await?;

    Ok(Json(state.urls.detail(detail)))
}

/// Handler for items related to a single item
pub async fn similar(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<SimilarQuery>,
) -> AppResult<Json<Vec<MediaCard>>> {
    let kind: ContentKind = kind.parse()?;
    let id = parse_id(&id)?;
    let limit = query.limit()?;

    let cards = state.recommender.similar(kind, id, limit).await?;
    Ok(Json(state.urls.cards(cards)))
}

/// Handler for the home feed
pub async fn home(State(state): State<AppState>) -> AppResult<Json<HomeFeed>> {
    let feed = state.home.get_home().await?;
    Ok(Json(state.urls.home(feed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_splits_multi_value_fields() {
        let raw = RawListFilter::try_from(ListQuery {
            genres: Some("Drama,,Crime".to_string()),
            air_status: Some("airing".to_string()),
            page: Some("2".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(raw.genres, vec!["Drama", "", "Crime"]);
        assert!(raw.regions.is_empty());
        assert_eq!(raw.air_statuses, vec!["airing"]);
        assert_eq!(raw.page, Some(2));
    }

    #[test]
    fn test_unparsable_paging_is_dropped() {
        let raw = RawListFilter::try_from(ListQuery {
            page: Some("two".to_string()),
            page_size: Some("abc".to_string()),
            year: Some(" ".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(raw.page, None);
        assert_eq!(raw.page_size, None);
        assert_eq!(raw.year, None);
    }

    #[test]
    fn test_malformed_year_and_score_are_rejected() {
        let year = RawListFilter::try_from(ListQuery {
            year: Some("abc".to_string()),
            ..Default::default()
        });
        assert!(matches!(year, Err(AppError::InvalidInput(_))));

        let score = RawListFilter::try_from(ListQuery {
            min_score: Some("high".to_string()),
            ..Default::default()
        });
        assert!(matches!(score, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_similar_limit_is_clamped() {
        let limit = |value: Option<&str>| {
            SimilarQuery {
                limit: value.map(str::to_string),
            }
            .limit()
        };

        assert_eq!(limit(None).unwrap(), 6);
        assert_eq!(limit(Some("-1")).unwrap(), 0);
        assert_eq!(limit(Some("500")).unwrap(), 50);
        assert!(matches!(limit(Some("many")), Err(AppError::InvalidInput(_))));
    }
}
