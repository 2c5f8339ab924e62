pub mod cache;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cache::{create_redis_client, Cache, CacheKey, CacheStore, MemoryCacheStore, RedisCacheStore};
pub use memory::{MemoryItem, MemoryStore};
pub use postgres::{create_pool, PgCatalogStore};
pub use store::CatalogStore;
