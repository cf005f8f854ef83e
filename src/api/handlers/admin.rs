use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::images::ManagedFileView;
use super::{success, SuccessResponse};
use crate::api::extract::AdminAuth;
use crate::api::response::{ApiError, AppJson, AppQuery, PageParams, Paginated};
use crate::storage::models::ListType;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    #[serde(default)]
    pub label: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn manage_list(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<Paginated<ManagedFileView>>, ApiError> {
    let mut files = state.db.list_all_files()?;
    files.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
    Paginated::page(&files, params, |record| ManagedFileView::from(record))
}

pub async fn manage_block(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<ManagedFileView>, ApiError> {
    let record = state.db.set_list_type(&id, ListType::Block)?;
    Ok(Json(ManagedFileView::from(&record)))
}

pub async fn manage_white(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<ManagedFileView>, ApiError> {
    let record = state.db.set_list_type(&id, ListType::White)?;
    Ok(Json(ManagedFileView::from(&record)))
}

pub async fn manage_label(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
    AppJson(req): AppJson<LabelRequest>,
) -> Result<Json<ManagedFileView>, ApiError> {
    let record = state.db.set_label(&id, req.label)?;
    Ok(Json(ManagedFileView::from(&record)))
}

pub async fn manage_delete(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.db.remove_file(&id)?;

    tracing::warn!(file_id = %id, "Admin removed file");
    Ok(success())
}
