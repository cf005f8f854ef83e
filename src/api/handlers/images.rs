use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{success, SuccessResponse};
use crate::api::response::{ApiError, AppJson, AppQuery, PageParams, Paginated};
use crate::auth::AuthUser;
use crate::storage::models::{FileRecord, ListType, Visibility};
use crate::storage::{FavoriteIndex, FileFilter, FilePatch};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub id: String,
    pub src: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub upload_time: DateTime<Utc>,
    pub visibility: Visibility,
    pub tags: Vec<String>,
    pub favorite: bool,
    pub favorited_at: Option<DateTime<Utc>>,
    pub share_count: usize,
}

impl FileView {
    /// Render a record against the viewer's favorites index.
    pub fn for_viewer(record: &FileRecord, favorites: &FavoriteIndex) -> Self {
        let favorited_at = favorites.get(&record.id).copied();
        Self {
            id: record.id.clone(),
            src: format!("/file/{}", record.id),
            file_name: record.file_name.clone(),
            file_size: record.file_size,
            mime_type: record.mime_type.clone(),
            upload_time: record.upload_time,
            visibility: record.visibility,
            tags: record.tags.clone(),
            favorite: favorited_at.is_some(),
            favorited_at,
            share_count: record.share_ids.len(),
        }
    }
}

/// Moderation view of a record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedFileView {
    pub id: String,
    pub src: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub upload_time: DateTime<Utc>,
    pub owner_id: String,
    pub visibility: Visibility,
    pub list_type: ListType,
    pub label: Option<String>,
    pub blocked: bool,
}

impl From<&FileRecord> for ManagedFileView {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id.clone(),
            src: format!("/file/{}", record.id),
            file_name: record.file_name.clone(),
            file_size: record.file_size,
            mime_type: record.mime_type.clone(),
            upload_time: record.upload_time,
            owner_id: record.owner_id.clone(),
            visibility: record.visibility,
            list_type: record.moderation.list_type,
            label: record.moderation.label.clone(),
            blocked: record.moderation.is_blocked(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageRequest {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub favorite: Option<bool>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl SearchParams {
    fn split(self) -> (FileFilter, PageParams) {
        let defaults = PageParams::default();
        let page = PageParams {
            limit: self.limit.unwrap_or(defaults.limit),
            offset: self.offset.unwrap_or(defaults.offset),
        };
        let filter = FileFilter {
            q: self.q,
            tag: self.tag,
            favorite: self.favorite,
            visibility: self.visibility,
        };
        (filter, page)
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_images(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<Paginated<FileView>>, ApiError> {
    let files = state.db.list_user_files(&user.id)?;
    let favorites = state.db.favorite_index(&user.id)?;
    Paginated::page(&files, params, |record| FileView::for_viewer(record, &favorites))
}

pub async fn search_images(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<Json<Paginated<FileView>>, ApiError> {
    let (filter, page) = params.split();
    let files = state.db.search_user_files(&user.id, &filter)?;
    let favorites = state.db.favorite_index(&user.id)?;
    Paginated::page(&files, page, |record| FileView::for_viewer(record, &favorites))
}

pub async fn update_image(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateImageRequest>,
) -> Result<Json<FileView>, ApiError> {
    let patch = FilePatch {
        file_name: req.file_name,
        tags: req.tags,
        visibility: req.visibility,
    };
    if patch.is_empty() {
        return Err(ApiError::bad_request(
            "at least one field (fileName, tags, visibility) must be provided",
        ));
    }

    let record = state.db.update_file(&id, &patch, &user.id)?;

    tracing::debug!(file_id = %id, user_id = %user.id, "Updated file");
    let favorites = state.db.favorite_index(&user.id)?;
    Ok(Json(FileView::for_viewer(&record, &favorites)))
}

pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.db.delete_file(&id, &user.id)?;

    tracing::info!(file_id = %id, user_id = %user.id, "Deleted file");
    Ok(success())
}
