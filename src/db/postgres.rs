use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};

use super::store::CatalogStore;
use crate::error::AppResult;
use crate::models::{
    AwardMention, Banner, ContentKind, CreditRow, FranchiseRef, MediaCard, MediaRecord,
    SeasonSummary, SimilarityCandidate, Video,
};
use crate::services::query::{CompiledQuery, Predicate, SortKey};

/// Creates a PostgreSQL connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Catalog store backed by PostgreSQL
///
/// Catalog tables are aliased `c` in every statement so predicate and
/// ordering fragments can be shared between kinds.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Expression yielding the earliest known release date of `c`
fn release_expr(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Movie => {
            "(SELECT MIN((rd->>'date')::date) FROM jsonb_array_elements(c.release_dates) rd \
             WHERE rd->>'date' IS NOT NULL)"
        }
        ContentKind::Tv | ContentKind::Anime => "c.first_air_date",
    }
}

fn card_columns(kind: ContentKind) -> String {
    format!(
        "c.id, c.title_cn, EXTRACT(YEAR FROM {})::int AS year, c.poster_cos_key AS poster_key, \
         c.douban_score::float8 AS score, c.genres",
        release_expr(kind)
    )
}

fn push_predicates(qb: &mut QueryBuilder<'_, Postgres>, kind: ContentKind, predicates: &[Predicate]) {
    for (i, predicate) in predicates.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });

        match predicate {
            Predicate::NotDeleted => {
                qb.push("c.deleted_at IS NULL");
            }
            Predicate::Published => {
                qb.push("c.status = 'published'");
            }
            Predicate::GenresOverlap(genres) => {
                qb.push("EXISTS (SELECT 1 FROM unnest(c.genres) AS g(v) WHERE lower(g.v) = ANY(");
                qb.push_bind(genres.clone());
                qb.push("))");
            }
            Predicate::RegionsOverlap(regions) => {
                qb.push("EXISTS (SELECT 1 FROM unnest(c.region) AS r(v) WHERE lower(r.v) = ANY(");
                qb.push_bind(regions.clone());
                qb.push("))");
            }
            Predicate::LanguageContains(language) => {
                qb.push("EXISTS (SELECT 1 FROM unnest(c.language) AS l(v) WHERE lower(l.v) = ");
                qb.push_bind(language.clone());
                qb.push(")");
            }
            Predicate::MinScore(score) => {
                qb.push("c.douban_score::float8 >= ");
                qb.push_bind(*score);
            }
            // A movie matches when any of its release dates falls in the window
            Predicate::ReleaseYearBetween { start, end } => match kind {
                ContentKind::Movie => {
                    qb.push(
                        "EXISTS (SELECT 1 FROM jsonb_array_elements(c.release_dates) rd \
                         WHERE rd->>'date' IS NOT NULL AND (rd->>'date')::date BETWEEN make_date(",
                    );
                    qb.push_bind(*start);
                    qb.push(", 1, 1) AND make_date(");
                    qb.push_bind(*end);
                    qb.push(", 12, 31))");
                }
                ContentKind::Tv | ContentKind::Anime => {
                    qb.push(format!("EXTRACT(YEAR FROM {})::int BETWEEN ", release_expr(kind)));
                    qb.push_bind(*start);
                    qb.push(" AND ");
                    qb.push_bind(*end);
                }
            },
            Predicate::AirStatusIn(statuses) => {
                qb.push("lower(c.air_status) = ANY(");
                qb.push_bind(statuses.clone());
                qb.push(")");
            }
            Predicate::Origin(origin) => {
                qb.push("c.origin = ");
                qb.push_bind(origin.clone());
            }
        }
    }
}

fn order_by(kind: ContentKind, ordering: SortKey) -> String {
    match ordering {
        SortKey::Popularity => " ORDER BY c.popularity DESC, c.id ASC".to_string(),
        SortKey::Score => " ORDER BY c.douban_score DESC NULLS LAST, c.id ASC".to_string(),
        SortKey::ReleaseDate => format!(
            " ORDER BY {} DESC NULLS LAST, c.id ASC",
            release_expr(kind)
        ),
    }
}

fn record_sql(kind: ContentKind) -> String {
    let specific = match kind {
        ContentKind::Movie => {
            "c.tagline, NULL::date AS last_air_date, NULL::text AS air_status, NULL::text AS origin, \
             NULL::text AS studio, NULL::int AS number_of_seasons, NULL::int AS number_of_episodes, \
             c.production_companies, c.franchise_id"
        }
        ContentKind::Tv => {
            "NULL::text AS tagline, c.last_air_date, c.air_status, NULL::text AS origin, \
             NULL::text AS studio, c.number_of_seasons, c.number_of_episodes, \
             ARRAY[]::text[] AS production_companies, NULL::bigint AS franchise_id"
        }
        ContentKind::Anime => {
            "NULL::text AS tagline, c.last_air_date, c.air_status, c.origin, \
             c.studio, c.number_of_seasons, c.number_of_episodes, \
             c.production_companies, NULL::bigint AS franchise_id"
        }
    };

    format!(
        "SELECT c.id, c.title_cn, c.title_original, c.title_aliases, c.synopsis, c.genres, \
         c.region AS regions, c.language AS languages, {release} AS release_date, \
         c.douban_score::float8 AS douban_score, c.douban_rating_count, \
         c.imdb_score::float8 AS imdb_score, c.imdb_id, \
         c.poster_cos_key AS poster_key, c.backdrop_cos_key AS backdrop_key, \
         c.extra_posters, c.extra_backdrops, {specific} \
         FROM {table} c \
         WHERE c.id = $1 AND c.deleted_at IS NULL AND c.status = 'published'",
        release = release_expr(kind),
        specific = specific,
        table = kind.table(),
    )
}

#[derive(sqlx::FromRow)]
struct CardRow {
    id: i64,
    title_cn: String,
    year: Option<i32>,
    poster_key: Option<String>,
    score: Option<f64>,
    genres: Vec<String>,
}

impl CardRow {
    fn into_card(self, kind: ContentKind) -> MediaCard {
        MediaCard {
            id: self.id,
            content_type: kind,
            title_cn: self.title_cn,
            year: self.year,
            poster_key: self.poster_key,
            score: self.score,
            genres: self.genres,
            poster_url: None,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OverlapRow {
    #[sqlx(flatten)]
    card: CardRow,
    tag_overlap: i64,
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: i64,
    title_cn: String,
    title_original: Option<String>,
    title_aliases: Vec<String>,
    tagline: Option<String>,
    synopsis: Option<String>,
    genres: Vec<String>,
    regions: Vec<String>,
    languages: Vec<String>,
    release_date: Option<NaiveDate>,
    last_air_date: Option<NaiveDate>,
    air_status: Option<String>,
    origin: Option<String>,
    studio: Option<String>,
    number_of_seasons: Option<i32>,
    number_of_episodes: Option<i32>,
    douban_score: Option<f64>,
    douban_rating_count: Option<i32>,
    imdb_score: Option<f64>,
    imdb_id: Option<String>,
    poster_key: Option<String>,
    backdrop_key: Option<String>,
    extra_posters: Vec<String>,
    extra_backdrops: Vec<String>,
    production_companies: Vec<String>,
    franchise_id: Option<i64>,
}

impl RecordRow {
    fn into_record(self, kind: ContentKind) -> MediaRecord {
        MediaRecord {
            id: self.id,
            kind,
            title_cn: self.title_cn,
            title_original: self.title_original,
            title_aliases: self.title_aliases,
            tagline: self.tagline,
            synopsis: self.synopsis,
            genres: self.genres,
            regions: self.regions,
            languages: self.languages,
            release_date: self.release_date,
            last_air_date: self.last_air_date,
            air_status: self.air_status,
            origin: self.origin,
            studio: self.studio,
            number_of_seasons: self.number_of_seasons,
            number_of_episodes: self.number_of_episodes,
            douban_score: self.douban_score,
            douban_rating_count: self.douban_rating_count,
            imdb_score: self.imdb_score,
            imdb_id: self.imdb_id,
            poster_key: self.poster_key,
            backdrop_key: self.backdrop_key,
            extra_posters: self.extra_posters,
            extra_backdrops: self.extra_backdrops,
            production_companies: self.production_companies,
            franchise_id: self.franchise_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BannerRow {
    id: i64,
    content_type: String,
    content_id: i64,
    title_cn: String,
    poster_key: Option<String>,
    backdrop_key: Option<String>,
    display_order: i32,
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn count(&self, kind: ContentKind, query: &CompiledQuery) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {} c", kind.table()));
        push_predicates(&mut qb, kind, &query.predicates);

        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }

    async fn fetch_cards(
        &self,
        kind: ContentKind,
        query: &CompiledQuery,
    ) -> AppResult<Vec<MediaCard>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM {} c",
            card_columns(kind),
            kind.table()
        ));
        push_predicates(&mut qb, kind, &query.predicates);
        qb.push(order_by(kind, query.ordering));
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(query.window.limit));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(query.window.offset).unwrap_or(i64::MAX));

        let rows: Vec<CardRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        tracing::debug!(kind = %kind, rows = rows.len(), "Fetched list page");

        Ok(rows.into_iter().map(|row| row.into_card(kind)).collect())
    }

    async fn fetch_record(&self, kind: ContentKind, id: i64) -> AppResult<Option<MediaRecord>> {
        let row: Option<RecordRow> = sqlx::query_as(&record_sql(kind))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.into_record(kind)))
    }

    async fn fetch_credits(&self, kind: ContentKind, id: i64) -> AppResult<Vec<CreditRow>> {
        let rows = sqlx::query_as::<_, CreditRow>(
            r#"
            SELECT cr.person_id, p.name_cn, p.name_en, p.avatar_cos_key AS avatar_key,
                   cr.role, cr.department, cr.character_name, cr.display_order
            FROM credits cr
            INNER JOIN people p ON p.id = cr.person_id
            WHERE cr.content_type = $1
              AND cr.content_id = $2
              AND cr.deleted_at IS NULL
              AND p.deleted_at IS NULL
            ORDER BY cr.display_order ASC
            "#,
        )
        .bind(kind.content_type())
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn fetch_awards(&self, kind: ContentKind, id: i64) -> AppResult<Vec<AwardMention>> {
        let rows = sqlx::query_as::<_, AwardMention>(
            r#"
            SELECT e.name_cn AS event_name, ac.edition_number, n.category, n.is_winner
            FROM award_nominations n
            INNER JOIN award_ceremonies ac ON ac.id = n.ceremony_id
            INNER JOIN award_events e ON e.id = ac.event_id
            WHERE n.content_type = $1
              AND n.content_id = $2
              AND n.deleted_at IS NULL
            ORDER BY ac.edition_number DESC, n.is_winner DESC, n.category ASC
            "#,
        )
        .bind(kind.content_type())
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn fetch_videos(&self, kind: ContentKind, id: i64) -> AppResult<Vec<Video>> {
        let rows = sqlx::query_as::<_, Video>(
            r#"
            SELECT v.id, v.title, v.url, v.type AS video_type, v.published_at
            FROM media_videos v
            WHERE v.content_type = $1
              AND v.content_id = $2
              AND v.deleted_at IS NULL
            ORDER BY v.published_at DESC NULLS LAST, v.id ASC
            "#,
        )
        .bind(kind.content_type())
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn fetch_franchise(
        &self,
        franchise_id: i64,
        movie_id: i64,
    ) -> AppResult<Option<FranchiseRef>> {
        let row = sqlx::query_as::<_, FranchiseRef>(
            r#"
            SELECT f.id, f.name_cn,
                   COALESCE((SELECT m.franchise_order FROM movies m WHERE m.id = $2), 0)::int AS "order",
                   (SELECT COUNT(*) FROM movies m
                     WHERE m.franchise_id = f.id
                       AND m.deleted_at IS NULL
                       AND m.status = 'published')::int AS total
            FROM franchises f
            WHERE f.id = $1 AND f.deleted_at IS NULL
            "#,
        )
        .bind(franchise_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn fetch_seasons(&self, kind: ContentKind, id: i64) -> AppResult<Vec<SeasonSummary>> {
        let (table, parent) = match kind {
            ContentKind::Tv => ("tv_seasons", "series_id"),
            ContentKind::Anime => ("anime_seasons", "anime_id"),
            ContentKind::Movie => return Ok(Vec::new()),
        };

        let sql = format!(
            "SELECT s.id, s.season_number, s.name, s.episode_count, s.first_air_date, \
             s.poster_cos_key AS poster_key, s.overview \
             FROM {} s WHERE s.{} = $1 AND s.deleted_at IS NULL \
             ORDER BY s.season_number ASC",
            table, parent
        );

        let rows = sqlx::query_as::<_, SeasonSummary>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn fetch_tag_ids(&self, kind: ContentKind, id: i64) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT DISTINCT keyword_id
            FROM content_keywords
            WHERE content_type = $1 AND content_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(kind.content_type())
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn fetch_genres(&self, kind: ContentKind, id: i64) -> AppResult<Vec<String>> {
        let sql = format!(
            "SELECT c.genres FROM {} c \
             WHERE c.id = $1 AND c.deleted_at IS NULL AND c.status = 'published'",
            kind.table()
        );

        let genres: Option<Vec<String>> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(genres.unwrap_or_default())
    }

    async fn tag_overlap_candidates(
        &self,
        kind: ContentKind,
        id: i64,
        tag_ids: &[i64],
        limit: usize,
    ) -> AppResult<Vec<SimilarityCandidate>> {
        let sql = format!(
            "SELECT {columns}, COUNT(DISTINCT ck.keyword_id) AS tag_overlap \
             FROM {table} c \
             INNER JOIN content_keywords ck \
                ON ck.content_type = $1 \
               AND ck.content_id = c.id \
               AND ck.keyword_id = ANY($2) \
               AND ck.deleted_at IS NULL \
             WHERE c.id <> $3 AND c.deleted_at IS NULL AND c.status = 'published' \
             GROUP BY c.id \
             ORDER BY tag_overlap DESC, c.douban_score DESC NULLS LAST, c.id ASC \
             LIMIT $4",
            columns = card_columns(kind),
            table = kind.table(),
        );

        let rows = sqlx::query_as::<_, OverlapRow>(&sql)
            .bind(kind.content_type())
            .bind(tag_ids)
            .bind(id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| SimilarityCandidate {
                card: row.card.into_card(kind),
                tag_overlap: u32::try_from(row.tag_overlap).unwrap_or(u32::MAX),
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
        let sql = format!(
            "SELECT {columns} FROM {table} c \
             WHERE c.id <> $1 \
               AND NOT (c.id = ANY($2)) \
               AND c.deleted_at IS NULL \
               AND c.status = 'published' \
               AND c.genres && $3::text[] \
             ORDER BY c.douban_score DESC NULLS LAST, c.id ASC \
             LIMIT $4",
            columns = card_columns(kind),
            table = kind.table(),
        );

        let rows = sqlx::query_as::<_, CardRow>(&sql)
            .bind(id)
            .bind(exclude)
            .bind(genres)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.into_card(kind)).collect())
    }

    async fn fetch_active_banners(&self) -> AppResult<Vec<Banner>> {
        let rows = sqlx::query_as::<_, BannerRow>(
            r#"
            SELECT b.id, b.content_type, b.content_id,
                   COALESCE(m.title_cn, t.title_cn, a.title_cn) AS title_cn,
                   COALESCE(m.poster_cos_key, t.poster_cos_key, a.poster_cos_key) AS poster_key,
                   COALESCE(m.backdrop_cos_key, t.backdrop_cos_key, a.backdrop_cos_key) AS backdrop_key,
                   b.display_order
            FROM featured_banners b
            LEFT JOIN movies m
              ON b.content_type = 'movie' AND m.id = b.content_id
             AND m.deleted_at IS NULL AND m.status = 'published'
            LEFT JOIN tv_series t
              ON b.content_type = 'tv' AND t.id = b.content_id
             AND t.deleted_at IS NULL AND t.status = 'published'
            LEFT JOIN anime a
              ON b.content_type = 'anime' AND a.id = b.content_id
             AND a.deleted_at IS NULL AND a.status = 'published'
            WHERE (b.start_at IS NULL OR b.start_at <= now())
              AND (b.end_at IS NULL OR b.end_at > now())
              AND COALESCE(m.id, t.id, a.id) IS NOT NULL
            ORDER BY b.display_order ASC, b.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut banners = Vec::with_capacity(rows.len());
        for row in rows {
            let Ok(kind) = row.content_type.parse::<ContentKind>() else {
                tracing::warn!(banner_id = row.id, content_type = %row.content_type, "Skipping banner with unknown content type");
                continue;
            };

            banners.push(Banner {
                id: row.id,
                content_type: kind,
                content_id: row.content_id,
                title_cn: row.title_cn,
                poster_key: row.poster_key,
                backdrop_key: row.backdrop_key,
                display_order: row.display_order,
                backdrop_url: None,
            });
        }

        Ok(banners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListFilter, RawListFilter};
    use crate::services::{normalizer::normalize, query::compile};

    fn compiled_sql(kind: ContentKind, filter: &ListFilter) -> String {
        let query = compile(kind, filter).unwrap();
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {} c", kind.table()));
        push_predicates(&mut qb, kind, &query.predicates);
        qb.push(order_by(kind, query.ordering));
        qb.sql().to_string()
    }

    #[test]
    fn test_scoping_predicates_always_present() {
        let sql = compiled_sql(ContentKind::Movie, &ListFilter::default());
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM movies c WHERE c.deleted_at IS NULL AND c.status = 'published' \
             ORDER BY c.popularity DESC, c.id ASC"
        );
    }

    #[test]
    fn test_filters_are_bound_not_interpolated() {
        let filter = normalize(&RawListFilter {
            genres: vec!["'; DROP TABLE movies; --".to_string()],
            min_score: Some(7.5),
            year: Some(2019),
            sort: Some("score".to_string()),
            ..Default::default()
        });

        let sql = compiled_sql(ContentKind::Tv, &filter);
        assert!(!sql.contains("DROP TABLE"));
        assert!(sql.contains("lower(g.v) = ANY($1)"));
        assert!(sql.contains("c.douban_score::float8 >= $2"));
        assert!(sql.contains("EXTRACT(YEAR FROM c.first_air_date)::int BETWEEN $3 AND $4"));
        assert!(sql.ends_with("ORDER BY c.douban_score DESC NULLS LAST, c.id ASC"));
    }

    #[test]
    fn test_movie_year_matches_any_release_date() {
        let filter = normalize(&RawListFilter {
            year: Some(2020),
            ..Default::default()
        });

        let sql = compiled_sql(ContentKind::Movie, &filter);
        assert!(sql.contains(
            "EXISTS (SELECT 1 FROM jsonb_array_elements(c.release_dates) rd \
             WHERE rd->>'date' IS NOT NULL AND (rd->>'date')::date \
             BETWEEN make_date($1, 1, 1) AND make_date($2, 12, 31))"
        ));
        assert!(!sql.contains("EXTRACT(YEAR FROM"));
    }

    #[test]
    fn test_movie_release_ordering_uses_earliest_date() {
        let filter = normalize(&RawListFilter {
            sort: Some("releaseDate".to_string()),
            ..Default::default()
        });

        let sql = compiled_sql(ContentKind::Movie, &filter);
        assert!(sql.contains("MIN((rd->>'date')::date)"));
        assert!(sql.ends_with("DESC NULLS LAST, c.id ASC"));
    }

    #[test]
    fn test_record_sql_is_scoped() {
        for kind in ContentKind::ALL {
            let sql = record_sql(kind);
            assert!(sql.contains(&format!("FROM {} c", kind.table())));
            assert!(sql.contains("c.deleted_at IS NULL AND c.status = 'published'"));
        }
    }
}
