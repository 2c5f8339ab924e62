use sha2::{Digest, Sha256};
use std::fmt::Display;

use crate::error::AppResult;
use crate::models::{ContentKind, ListFilter};

const HOME_BANNERS: &str = "home:banners";

/// Width of the list fingerprint in bytes (128 bits)
const FINGERPRINT_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    List {
        kind: ContentKind,
        fingerprint: String,
    },
    Detail {
        kind: ContentKind,
        id: i64,
    },
    HomeBanners,
}

impl CacheKey {
    /// Key of one filtered list page. The filter must already be normalized.
    pub fn list(kind: ContentKind, filter: &ListFilter) -> AppResult<Self> {
        Ok(CacheKey::List {
            kind,
            fingerprint: fingerprint(filter)?,
        })
    }

    pub fn detail(kind: ContentKind, id: i64) -> Self {
        CacheKey::Detail { kind, id }
    }

    /// Prefix shared by every list page of a kind
    pub fn list_prefix(kind: ContentKind) -> String {
        format!("{}:list:", kind.cache_namespace())
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::List { kind, fingerprint } => {
                write!(f, "{}{}", Self::list_prefix(*kind), fingerprint)
            }
            CacheKey::Detail { kind, id } => write!(f, "{}:detail:{}", kind.cache_namespace(), id),
            CacheKey::HomeBanners => write!(f, "{}", HOME_BANNERS),
        }
    }
}

/// Canonical bytes of a normalized filter: compact JSON in field declaration
/// order, sets already sorted.
pub fn canonical_bytes(filter: &ListFilter) -> AppResult<Vec<u8>> {
    Ok(serde_json::to_vec(filter)?)
}

/// Lower-case hex of the first 128 bits of SHA-256 over the canonical bytes
pub fn fingerprint(filter: &ListFilter) -> AppResult<String> {
    let digest = Sha256::digest(canonical_bytes(filter)?);
    Ok(hex::encode(&digest[..FINGERPRINT_BYTES]))
}
