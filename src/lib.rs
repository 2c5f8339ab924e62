//! Content catalog query and recommendation service.
//!
//! Normalized list filters, deterministic cache keys, typed store queries,
//! detail assembly, similar-item ranking and prefix-based cache invalidation
//! over PostgreSQL and Redis.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::create_router;
pub use state::AppState;
