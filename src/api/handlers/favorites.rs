use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::images::FileView;
use super::BatchResponse;
use crate::api::response::{ApiError, AppJson, AppQuery, PageParams, Paginated};
use crate::auth::AuthUser;
use crate::storage::FavoriteIndex;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStatus {
    pub file_id: String,
    pub favorited: bool,
    pub favorited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteAction {
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFavoritesRequest {
    pub action: FavoriteAction,
    #[serde(default)]
    pub file_ids: Vec<String>,
}

pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<Paginated<FileView>>, ApiError> {
    let favorites = state.db.list_favorites(&user.id)?;
    Paginated::page(&favorites, params, |(entry, record)| {
        let mut view = FileView::for_viewer(record, &FavoriteIndex::new());
        view.favorite = true;
        view.favorited_at = Some(entry.favorited_at);
        view
    })
}

pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    let entry = state.db.add_favorite(&user.id, &id)?;

    tracing::debug!(file_id = %id, user_id = %user.id, "Added favorite");
    Ok(Json(FavoriteStatus {
        file_id: entry.file_id,
        favorited: true,
        favorited_at: Some(entry.favorited_at),
    }))
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    state.db.remove_favorite(&user.id, &id)?;

    tracing::debug!(file_id = %id, user_id = %user.id, "Removed favorite");
    Ok(Json(FavoriteStatus {
        file_id: id,
        favorited: false,
        favorited_at: None,
    }))
}

pub async fn favorite_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    let entry = state.db.favorite_status(&user.id, &id)?;
    Ok(Json(FavoriteStatus {
        file_id: id,
        favorited: entry.is_some(),
        favorited_at: entry.map(|e| e.favorited_at),
    }))
}

pub async fn batch_favorites(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<BatchFavoritesRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    if req.file_ids.is_empty() {
        return Err(ApiError::bad_request("fileIds must not be empty"));
    }

    let outcome =
        state
            .db
            .batch_favorites(&user.id, &req.file_ids, req.action == FavoriteAction::Add)?;

    tracing::debug!(
        user_id = %user.id,
        action = ?req.action,
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "Batch favorites"
    );
    Ok(Json(BatchResponse::from(outcome)))
}
