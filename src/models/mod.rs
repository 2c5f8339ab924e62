pub mod filter;
pub mod kind;
pub mod media;

pub use filter::{ListFilter, RawListFilter, Sort, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use kind::ContentKind;
pub use media::{
    AwardMention, Banner, CreditGroups, CreditPerson, CreditRow, FranchiseRef, HomeFeed,
    MediaCard, MediaDetail, MediaRecord, PagedResult, Pagination, SeasonSummary,
    SimilarityCandidate, Video,
};
