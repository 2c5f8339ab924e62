use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

/// Content category served by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Movie,
    Tv,
    Anime,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Movie, ContentKind::Tv, ContentKind::Anime];

    /// Namespace segment used in cache keys (`movie:list:...`)
    pub fn cache_namespace(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Tv => "tv",
            ContentKind::Anime => "anime",
        }
    }

    /// Content-type tag stored in association tables (credits, keywords, videos)
    pub fn content_type(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Tv => "tv_series",
            ContentKind::Anime => "anime",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movies",
            ContentKind::Tv => "tv_series",
            ContentKind::Anime => "anime",
        }
    }

    /// Air status only exists for serialized content
    pub fn has_air_status(&self) -> bool {
        !matches!(self, ContentKind::Movie)
    }

    pub fn has_seasons(&self) -> bool {
        !matches!(self, ContentKind::Movie)
    }

    pub fn has_franchise(&self) -> bool {
        matches!(self, ContentKind::Movie)
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cache_namespace())
    }
}

impl FromStr for ContentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" => Ok(ContentKind::Movie),
            "tv" | "tv_series" => Ok(ContentKind::Tv),
            "anime" => Ok(ContentKind::Anime),
            other => Err(AppError::InvalidInput(format!(
                "Unsupported content type: {}",
                other
            ))),
        }
    }
}
