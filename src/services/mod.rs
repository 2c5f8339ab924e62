pub mod detail;
pub mod home;
pub mod invalidation;
pub mod listing;
pub mod normalizer;
pub mod query;
pub mod similar;
pub mod url;

pub use detail::DetailService;
pub use home::HomeService;
pub use invalidation::CacheInvalidator;
pub use listing::ListService;
pub use similar::SimilarityRecommender;
pub use url::UrlRewriter;
