use std::collections::BTreeSet;

use crate::models::{ListFilter, RawListFilter, Sort, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

const MAX_SCORE: f64 = 10.0;

/// Canonicalizes a raw list filter.
///
/// Total: every input maps to a valid filter. Unknown decade tokens are kept
/// so the query compiler can reject them instead of silently widening the
/// result set. Applying it to an already-normalized filter is a no-op, which
/// keeps derived cache keys stable.
pub fn normalize(raw: &RawListFilter) -> ListFilter {
    let year = raw.year;

    ListFilter {
        genres: canonical_set(&raw.genres),
        regions: canonical_set(&raw.regions),
        // year wins over decade
        decade: if year.is_some() {
            None
        } else {
            raw.decade.as_deref().and_then(canonical_decade)
        },
        year,
        language: raw
            .language
            .as_deref()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty()),
        min_score: raw.min_score.and_then(canonical_score),
        sort: raw.sort.as_deref().map(parse_sort).unwrap_or_default(),
        page: clamp_page(raw.page),
        page_size: clamp_page_size(raw.page_size),
        air_statuses: canonical_set(&raw.air_statuses),
    }
}

/// Trims, lower-cases, drops blanks and de-duplicates
fn canonical_set(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn canonical_decade(token: &str) -> Option<String> {
    let token = token.trim().to_lowercase();
    match token.as_str() {
        "" => None,
        "90s" => Some("1990s".to_string()),
        _ => Some(token),
    }
}

fn canonical_score(score: f64) -> Option<f64> {
    if !score.is_finite() {
        return None;
    }
    let rounded = (score.clamp(0.0, MAX_SCORE) * 100.0).round() / 100.0;
    // -0.0 would serialize differently from 0.0
    Some(if rounded == 0.0 { 0.0 } else { rounded })
}

fn parse_sort(sort: &str) -> Sort {
    match sort.trim().to_lowercase().as_str() {
        "score" | "douban_score" => Sort::Score,
        "releasedate" | "release_date" | "first_air_date" => Sort::ReleaseDate,
        _ => Sort::Popularity,
    }
}

fn clamp_page(page: Option<i64>) -> u32 {
    match page {
        Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
        _ => 1,
    }
}

fn clamp_page_size(page_size: Option<i64>) -> u32 {
    match page_size {
        Some(size) if size < 1 => DEFAULT_PAGE_SIZE,
        Some(size) if size > i64::from(MAX_PAGE_SIZE) => MAX_PAGE_SIZE,
        Some(size) => size as u32,
        None => DEFAULT_PAGE_SIZE,
    }
}
