//! Typed list queries.
//!
//! A normalized [`ListFilter`] compiles into a [`CompiledQuery`]: a conjunction
//! of predicates, an ordering and a limit/offset window. Store adapters
//! translate it; nothing here knows about SQL.

use crate::error::{AppError, AppResult};
use crate::models::{ContentKind, ListFilter, Sort};

/// Earliest year a release date can fall in
pub const MIN_RELEASE_YEAR: i32 = 1888;

/// One condition a row must satisfy. Multi-value predicates match when any
/// value matches, compared case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    NotDeleted,
    Published,
    GenresOverlap(Vec<String>),
    RegionsOverlap(Vec<String>),
    LanguageContains(String),
    MinScore(f64),
    /// Year of the earliest known release date, inclusive bounds
    ReleaseYearBetween { start: i32, end: i32 },
    AirStatusIn(Vec<String>),
    Origin(String),
}

/// Descending sort key; nulls always sort last and ties break on `id` ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Popularity,
    Score,
    ReleaseDate,
}

impl From<Sort> for SortKey {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Popularity => SortKey::Popularity,
            Sort::Score => SortKey::Score,
            Sort::ReleaseDate => SortKey::ReleaseDate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub predicates: Vec<Predicate>,
    pub ordering: SortKey,
    pub window: Window,
}

impl CompiledQuery {
    /// Published, not deleted, nothing else
    fn scoped() -> Vec<Predicate> {
        vec![Predicate::NotDeleted, Predicate::Published]
    }

    /// Most popular items, optionally restricted to one origin
    pub fn hot(origin: Option<&str>, limit: u32) -> Self {
        let mut predicates = Self::scoped();
        if let Some(origin) = origin {
            predicates.push(Predicate::Origin(origin.to_string()));
        }

        Self {
            predicates,
            ordering: SortKey::Popularity,
            window: Window { limit, offset: 0 },
        }
    }
}

/// Inclusive year range of a decade token
pub fn decade_range(decade: &str) -> AppResult<(i32, i32)> {
    match decade {
        "2020s" => Ok((2020, 2029)),
        "2010s" => Ok((2010, 2019)),
        "2000s" => Ok((2000, 2009)),
        "1990s" | "90s" => Ok((1990, 1999)),
        "earlier" => Ok((MIN_RELEASE_YEAR, 1989)),
        other => Err(AppError::InvalidInput(format!("Unknown decade: {}", other))),
    }
}

/// Compiles a normalized filter for one content kind.
///
/// Fails only with `InvalidInput`, before any store access.
pub fn compile(kind: ContentKind, filter: &ListFilter) -> AppResult<CompiledQuery> {
    let mut predicates = CompiledQuery::scoped();

    if !filter.genres.is_empty() {
        predicates.push(Predicate::GenresOverlap(
            filter.genres.iter().cloned().collect(),
        ));
    }

    if !filter.regions.is_empty() {
        predicates.push(Predicate::RegionsOverlap(
            filter.regions.iter().cloned().collect(),
        ));
    }

    if let Some(language) = &filter.language {
        predicates.push(Predicate::LanguageContains(language.clone()));
    }

    if let Some(min_score) = filter.min_score {
        predicates.push(Predicate::MinScore(min_score));
    }

    if let Some(year) = filter.year {
        predicates.push(Predicate::ReleaseYearBetween {
            start: year,
            end: year,
        });
    } else if let Some(decade) = &filter.decade {
        let (start, end) = decade_range(decade)?;
        predicates.push(Predicate::ReleaseYearBetween { start, end });
    }

    if kind.has_air_status() && !filter.air_statuses.is_empty() {
        predicates.push(Predicate::AirStatusIn(
            filter.air_statuses.iter().cloned().collect(),
        ));
    }

    Ok(CompiledQuery {
        predicates,
        ordering: filter.sort.into(),
        window: Window {
            limit: filter.page_size,
            offset: filter.offset(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawListFilter;
    use crate::services::normalizer::normalize;
    use tokio_test::assert_err;

    fn compile_raw(kind: ContentKind, raw: RawListFilter) -> AppResult<CompiledQuery> {
        compile(kind, &normalize(&raw))
    }

    #[test]
    fn test_default_filter_is_scoped_only() {
        let query = compile_raw(ContentKind::Movie, RawListFilter::default()).unwrap();

        assert_eq!(
            query.predicates,
            vec![Predicate::NotDeleted, Predicate::Published]
        );
        assert_eq!(query.ordering, SortKey::Popularity);
        assert_eq!(query.window, Window { limit: 24, offset: 0 });
    }

    #[test]
    fn test_each_active_field_adds_one_predicate() {
        let query = compile_raw(
            ContentKind::Tv,
            RawListFilter {
                genres: vec!["Drama".into(), "Crime".into()],
                regions: vec!["US".into()],
                language: Some("English".into()),
                min_score: Some(8.0),
                air_statuses: vec!["airing".into()],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            query.predicates,
            vec![
                Predicate::NotDeleted,
                Predicate::Published,
                Predicate::GenresOverlap(vec!["crime".into(), "drama".into()]),
                Predicate::RegionsOverlap(vec!["us".into()]),
                Predicate::LanguageContains("english".into()),
                Predicate::MinScore(8.0),
                Predicate::AirStatusIn(vec!["airing".into()]),
            ]
        );
    }

    #[test]
    fn test_air_status_ignored_for_movies() {
        let query = compile_raw(
            ContentKind::Movie,
            RawListFilter {
                air_statuses: vec!["airing".into()],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(query.predicates.len(), 2);
    }

    #[test]
    fn test_decade_resolution() {
        let range = |decade: &str| {
            compile_raw(
                ContentKind::Movie,
                RawListFilter {
                    decade: Some(decade.to_string()),
                    ..Default::default()
                },
            )
            .map(|q| q.predicates[2].clone())
        };

        assert_eq!(
            range("2010s").unwrap(),
            Predicate::ReleaseYearBetween {
                start: 2010,
                end: 2019
            }
        );
        assert_eq!(
            range("earlier").unwrap(),
            Predicate::ReleaseYearBetween {
                start: MIN_RELEASE_YEAR,
                end: 1989
            }
        );
        assert_eq!(
            range("90s").unwrap(),
            Predicate::ReleaseYearBetween {
                start: 1990,
                end: 1999
            }
        );

        let err = assert_err!(range("1970s"));
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_year_wins_over_decade() {
        let query = compile_raw(
            ContentKind::Anime,
            RawListFilter {
                decade: Some("bogus".to_string()),
                year: Some(2016),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            query.predicates[2],
            Predicate::ReleaseYearBetween {
                start: 2016,
                end: 2016
            }
        );
    }

    #[test]
    fn test_window_and_ordering() {
        let query = compile_raw(
            ContentKind::Movie,
            RawListFilter {
                page: Some(3),
                page_size: Some(20),
                sort: Some("score".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(query.window, Window { limit: 20, offset: 40 });
        assert_eq!(query.ordering, SortKey::Score);
    }

    #[test]
    fn test_hot_query() {
        let query = CompiledQuery::hot(Some("jp"), 8);
        assert_eq!(query.predicates[2], Predicate::Origin("jp".to_string()));
        assert_eq!(query.window, Window { limit: 8, offset: 0 });
    }
}
