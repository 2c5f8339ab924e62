use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};
use crate::state::AppState;

pub mod admin;
pub mod catalog;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .nest("/admin", admin_routes())
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// Public catalog routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(catalog::home))
        .route("/:kind", get(catalog::list))
        .route("/:kind/:id", get(catalog::detail))
        .route("/:kind/:id/similar", get(catalog::similar))
}

/// Cache maintenance routes under /admin
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/cache/flush", post(admin::flush))
        .route("/cache/home/invalidate", post(admin::invalidate_home))
        .route("/cache/:kind/:id/invalidate", post(admin::invalidate))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
