use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::{error::AppResult, models::ContentKind, state::AppState};

/// Drops every list page and the home feed
pub async fn flush(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.invalidator.flush_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Drops everything derived from one item
pub async fn invalidate(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
) -> AppResult<StatusCode> {
    let kind: ContentKind = kind.parse()?;
    state.invalidator.invalidate(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn invalidate_home(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.invalidator.invalidate_home().await?;
    Ok(StatusCode::NO_CONTENT)
}
