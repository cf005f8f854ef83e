use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::extract::MaybeUser;
use crate::api::response::ApiError;
use crate::storage::models::FileRecord;
use crate::upload::{upload_files, IncomingFile};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub src: String,
}

#[derive(Debug, Serialize)]
pub struct PicgoResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<PicgoData>,
}

#[derive(Debug, Serialize)]
pub struct PicgoData {
    pub url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /upload`: every `file` field is uploaded; the response lists the
/// ones that succeeded.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    multipart: Multipart,
) -> Result<Json<Vec<UploadedFile>>, ApiError> {
    let files = read_files(&state, multipart).await?;
    let records = upload_files(&state, files, user.as_ref()).await?;

    Ok(Json(
        records
            .iter()
            .map(|record| UploadedFile {
                src: format!("/file/{}", record.id),
            })
            .collect(),
    ))
}

/// `POST /api/picgo/upload`: single-file upload in the shape PicGo expects.
pub async fn picgo_upload(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    multipart: Multipart,
) -> Response {
    let result: Result<FileRecord, ApiError> = async {
        let mut files = read_files(&state, multipart).await?;
        files.truncate(1);
        let records = upload_files(&state, files, user.as_ref()).await?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::internal("Upload failed"))
    }
    .await;

    match result {
        Ok(record) => Json(PicgoResponse {
            success: true,
            message: "Upload successful".to_string(),
            data: Some(PicgoData {
                url: state.config.public_url(&format!("/file/{}", record.id)),
            }),
        })
        .into_response(),
        Err(ApiError::Fail(status, message)) => picgo_failure(status, message),
        Err(ApiError::Error(status, message)) => {
            tracing::error!(error = %message, "PicGo upload failed");
            picgo_failure(status, "Upload failed".to_string())
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn picgo_failure(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(PicgoResponse {
            success: false,
            message,
            data: None,
        }),
    )
        .into_response()
}

async fn read_files(state: &AppState, mut multipart: Multipart) -> Result<Vec<IncomingFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

        if data.len() as u64 > state.config.max_upload_size {
            return Err(ApiError::payload_too_large(format!(
                "File exceeds maximum upload size of {} bytes",
                state.config.max_upload_size
            )));
        }

        files.push(IncomingFile {
            file_name,
            content_type,
            data,
        });
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("file field is required"));
    }
    Ok(files)
}
