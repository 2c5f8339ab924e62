use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ContentKind;

pub const DEFAULT_PAGE_SIZE: u32 = 24;
pub const MAX_PAGE_SIZE: u32 = 100;

/// List ordering requested by the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Sort {
    #[default]
    Popularity,
    Score,
    ReleaseDate,
}

/// List filter exactly as received from a client
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawListFilter {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    pub decade: Option<String>,
    pub year: Option<i32>,
    pub language: Option<String>,
    pub min_score: Option<f64>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    #[serde(default)]
    pub air_statuses: Vec<String>,
}

/// Canonical list filter.
///
/// Field declaration order is the canonical serialization order used to
/// derive list cache keys; reordering fields changes every list key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    pub genres: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    pub decade: Option<String>,
    pub year: Option<i32>,
    pub language: Option<String>,
    pub min_score: Option<f64>,
    pub sort: Sort,
    pub page: u32,
    pub page_size: u32,
    pub air_statuses: BTreeSet<String>,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            genres: BTreeSet::new(),
            regions: BTreeSet::new(),
            decade: None,
            year: None,
            language: None,
            min_score: None,
            sort: Sort::Popularity,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            air_statuses: BTreeSet::new(),
        }
    }
}

impl ListFilter {
    /// Drops fields that do not apply to the given kind
    pub fn scoped_to(mut self, kind: ContentKind) -> Self {
        if !kind.has_air_status() {
            self.air_statuses.clear();
        }
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}
