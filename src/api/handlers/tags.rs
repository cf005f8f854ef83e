use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::images::FileView;
use super::nullable;
use crate::api::response::{ApiError, AppJson, AppQuery, PageParams, Paginated};
use crate::auth::AuthUser;
use crate::storage::models::Tag;
use crate::storage::{TagMode, TagUsage};
use crate::AppState;

const COLOR_MAX: usize = 32;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagView {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub file_count: usize,
}

impl TagView {
    fn new(tag: &Tag, file_count: usize) -> Self {
        Self {
            id: tag.id.clone(),
            name: tag.name.clone(),
            color: tag.color.clone(),
            created_at: tag.created_at,
            file_count,
        }
    }
}

impl From<&TagUsage> for TagView {
    fn from(usage: &TagUsage) -> Self {
        TagView::new(&usage.tag, usage.file_count)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub color: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagChangeResponse {
    pub tag: Option<TagView>,
    pub updated_files: usize,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum TagBatchRequest {
    Add {
        #[serde(rename = "fileIds", default)]
        file_ids: Vec<String>,
        #[serde(default)]
        tags: Vec<String>,
    },
    Remove {
        #[serde(rename = "fileIds", default)]
        file_ids: Vec<String>,
        #[serde(default)]
        tags: Vec<String>,
    },
    Delete {
        #[serde(rename = "tagIds", default)]
        tag_ids: Vec<String>,
    },
    Merge {
        #[serde(rename = "sourceIds", default)]
        source_ids: Vec<String>,
        #[serde(rename = "targetId")]
        target_id: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagBatchResponse {
    pub succeeded: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_files: Option<usize>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<Paginated<TagView>>, ApiError> {
    let tags = state.db.list_tags(&user.id)?;
    Paginated::page(&tags, params, |usage| TagView::from(usage))
}

pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagView>), ApiError> {
    let color = normalize_color(req.color)?;
    let tag = state.db.create_tag(&user.id, &req.name, color)?;

    tracing::debug!(user_id = %user.id, tag = %tag.name, "Created tag");
    Ok((StatusCode::CREATED, Json(TagView::new(&tag, 0))))
}

pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateTagRequest>,
) -> Result<Json<TagChangeResponse>, ApiError> {
    if req.name.is_none() && req.color.is_none() {
        return Err(ApiError::bad_request(
            "at least one field (name, color) must be provided",
        ));
    }
    let color = req.color.map(normalize_color).transpose()?;

    let change = state
        .db
        .update_tag(&user.id, &id, req.name.as_deref(), color)?;

    tracing::debug!(
        user_id = %user.id,
        tag_id = %id,
        updated_files = change.updated_files,
        "Updated tag"
    );
    let tag = state
        .db
        .list_tags(&user.id)?
        .iter()
        .find(|usage| usage.tag.id == id)
        .map(TagView::from);
    Ok(Json(TagChangeResponse {
        tag,
        updated_files: change.updated_files,
    }))
}

pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TagChangeResponse>, ApiError> {
    let change = state.db.delete_tag(&user.id, &id)?;

    tracing::debug!(
        user_id = %user.id,
        tag_id = %id,
        updated_files = change.updated_files,
        "Deleted tag"
    );
    Ok(Json(TagChangeResponse {
        tag: None,
        updated_files: change.updated_files,
    }))
}

pub async fn batch_tags(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<TagBatchRequest>,
) -> Result<Json<TagBatchResponse>, ApiError> {
    let response = match req {
        TagBatchRequest::Add { file_ids, tags } => {
            tag_files(&state, &user, &file_ids, &tags, TagMode::Add)?
        }
        TagBatchRequest::Remove { file_ids, tags } => {
            tag_files(&state, &user, &file_ids, &tags, TagMode::Remove)?
        }
        TagBatchRequest::Delete { tag_ids } => {
            if tag_ids.is_empty() {
                return Err(ApiError::bad_request("tagIds must not be empty"));
            }
            let outcome = state.db.delete_tags(&user.id, &tag_ids)?;
            TagBatchResponse {
                succeeded: outcome.succeeded,
                failed: outcome.failed,
                updated_files: None,
            }
        }
        TagBatchRequest::Merge {
            source_ids,
            target_id,
        } => {
            let change = state.db.merge_tags(&user.id, &source_ids, &target_id)?;
            tracing::info!(
                user_id = %user.id,
                target = %target_id,
                sources = source_ids.len(),
                updated_files = change.updated_files,
                "Merged tags"
            );
            TagBatchResponse {
                succeeded: source_ids.len(),
                failed: 0,
                updated_files: Some(change.updated_files),
            }
        }
    };

    Ok(Json(response))
}

pub async fn tag_images(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<Paginated<FileView>>, ApiError> {
    let (_, files) = state.db.files_with_tag(&user.id, &id)?;
    let favorites = state.db.favorite_index(&user.id)?;
    Paginated::page(&files, params, |record| FileView::for_viewer(record, &favorites))
}

// ============================================================================
// Helpers
// ============================================================================

fn tag_files(
    state: &AppState,
    user: &AuthUser,
    file_ids: &[String],
    tags: &[String],
    mode: TagMode,
) -> Result<TagBatchResponse, ApiError> {
    if file_ids.is_empty() {
        return Err(ApiError::bad_request("fileIds must not be empty"));
    }
    let outcome = state.db.tag_files(&user.id, file_ids, tags, mode)?;

    tracing::debug!(
        user_id = %user.id,
        mode = ?mode,
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "Batch tag update"
    );
    Ok(TagBatchResponse {
        succeeded: outcome.succeeded,
        failed: outcome.failed,
        updated_files: None,
    })
}

/// Blank colors clear the field.
fn normalize_color(color: Option<String>) -> Result<Option<String>, ApiError> {
    let color = color
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if color.as_deref().is_some_and(|c| c.len() > COLOR_MAX) {
        return Err(ApiError::bad_request(format!(
            "color must be at most {COLOR_MAX} characters"
        )));
    }
    Ok(color)
}
