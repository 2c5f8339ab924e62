use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ContentKind;

/// Lightweight projection returned by list and similarity queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCard {
    pub id: i64,
    pub content_type: ContentKind,
    pub title_cn: String,
    pub year: Option<i32>,
    pub poster_key: Option<String>,
    pub score: Option<f64>,
    pub genres: Vec<String>,
    /// Filled in when shaping a response, never cached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total: u64) -> Self {
        let total_pages = if total == 0 || page_size == 0 {
            0
        } else {
            total.div_ceil(u64::from(page_size))
        };

        Self {
            page,
            page_size,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Primary row of a published catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: i64,
    pub kind: ContentKind,
    pub title_cn: String,
    pub title_original: Option<String>,
    pub title_aliases: Vec<String>,
    pub tagline: Option<String>,
    pub synopsis: Option<String>,
    pub genres: Vec<String>,
    pub regions: Vec<String>,
    pub languages: Vec<String>,
    /// Earliest known release date (first air date for series)
    pub release_date: Option<NaiveDate>,
    pub last_air_date: Option<NaiveDate>,
    pub air_status: Option<String>,
    pub origin: Option<String>,
    pub studio: Option<String>,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
    pub douban_score: Option<f64>,
    pub douban_rating_count: Option<i32>,
    pub imdb_score: Option<f64>,
    pub imdb_id: Option<String>,
    pub poster_key: Option<String>,
    pub backdrop_key: Option<String>,
    pub extra_posters: Vec<String>,
    pub extra_backdrops: Vec<String>,
    pub production_companies: Vec<String>,
    pub franchise_id: Option<i64>,
}

impl MediaRecord {
    pub fn to_card(&self) -> MediaCard {
        MediaCard {
            id: self.id,
            content_type: self.kind,
            title_cn: self.title_cn.clone(),
            year: self.release_date.map(|d| chrono::Datelike::year(&d)),
            poster_key: self.poster_key.clone(),
            score: self.douban_score,
            genres: self.genres.clone(),
            poster_url: None,
        }
    }
}

/// One credit row joined with its person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditRow {
    pub person_id: i64,
    pub name_cn: String,
    pub name_en: Option<String>,
    pub avatar_key: Option<String>,
    pub role: String,
    pub department: Option<String>,
    pub character_name: Option<String>,
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPerson {
    pub person_id: i64,
    pub name_cn: String,
    pub name_en: Option<String>,
    pub avatar_key: Option<String>,
    pub character_name: Option<String>,
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<CreditRow> for CreditPerson {
    fn from(row: CreditRow) -> Self {
        Self {
            person_id: row.person_id,
            name_cn: row.name_cn,
            name_en: row.name_en,
            avatar_key: row.avatar_key,
            character_name: row.character_name,
            display_order: row.display_order,
            avatar_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditGroups {
    pub directors: Vec<CreditPerson>,
    pub writers: Vec<CreditPerson>,
    pub cast: Vec<CreditPerson>,
    pub producers: Vec<CreditPerson>,
    pub others: Vec<CreditPerson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AwardMention {
    pub event_name: String,
    pub edition_number: i32,
    pub category: String,
    pub is_winner: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i64,
    pub title: Option<String>,
    pub url: String,
    pub video_type: String,
    pub published_at: Option<NaiveDate>,
}

/// Position of a movie inside its franchise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FranchiseRef {
    pub id: i64,
    pub name_cn: String,
    pub order: i32,
    pub total: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SeasonSummary {
    pub id: i64,
    pub season_number: i32,
    pub name: Option<String>,
    pub episode_count: i32,
    pub first_air_date: Option<NaiveDate>,
    pub poster_key: Option<String>,
    pub overview: Option<String>,
}

/// Assembled detail view; built on demand and cached, never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDetail {
    #[serde(flatten)]
    pub record: MediaRecord,
    pub credits: CreditGroups,
    pub awards: Vec<AwardMention>,
    pub videos: Vec<Video>,
    pub franchise: Option<FranchiseRef>,
    pub seasons: Vec<SeasonSummary>,
    pub similar: Vec<MediaCard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,
}

/// Tag-overlap candidate produced while ranking similar items
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityCandidate {
    pub card: MediaCard,
    pub tag_overlap: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: i64,
    pub content_type: ContentKind,
    pub content_id: i64,
    pub title_cn: String,
    pub poster_key: Option<String>,
    pub backdrop_key: Option<String>,
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeFeed {
    pub banners: Vec<Banner>,
    pub hot_movies: Vec<MediaCard>,
    pub hot_tv: Vec<MediaCard>,
    pub hot_anime_cn: Vec<MediaCard>,
    pub hot_anime_jp: Vec<MediaCard>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_zero_when_empty() {
        assert_eq!(Pagination::new(1, 24, 0).total_pages, 0);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 24, 25).total_pages, 2);
        assert_eq!(Pagination::new(1, 24, 24).total_pages, 1);
        assert_eq!(Pagination::new(3, 10, 21).total_pages, 3);
    }

    #[test]
    fn test_card_serializes_camel_case_without_url() {
        let card = MediaCard {
            id: 1,
            content_type: ContentKind::Tv,
            title_cn: "漫长的季节".to_string(),
            year: Some(2023),
            poster_key: Some("posters/1.jpg".to_string()),
            score: Some(9.4),
            genres: vec!["剧情".to_string()],
            poster_url: None,
        };

        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["contentType"], "tv");
        assert_eq!(json["titleCn"], "漫长的季节");
        assert!(json.get("posterUrl").is_none());
    }
}
