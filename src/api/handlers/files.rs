use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

use crate::access::{authorize_read, ReadAccess, ShareCredentials};
use crate::api::extract::MaybeUser;
use crate::api::response::{ApiError, AppQuery};
use crate::blob_store::BlobStoreError;
use crate::storage::models::{FileRecord, Visibility};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ServeParams {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub grant: Option<String>,
}

/// Serve file content through the access evaluator.
/// Route: GET /file/:id
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    MaybeUser(user): MaybeUser,
    AppQuery(params): AppQuery<ServeParams>,
) -> Result<Response, ApiError> {
    let credentials = ShareCredentials {
        token: params.token.filter(|t| !t.is_empty()),
        grant: params.grant.filter(|g| !g.is_empty()),
    };

    let (mut file, unregistered) = match authorize_read(&state, &id, user.as_ref(), &credentials)? {
        ReadAccess::Granted {
            record,
            unregistered,
        } => (record, unregistered),
        ReadAccess::Blocked => return Ok(blocked_redirect(&state.config.files.blocked_redirect_url)),
    };

    let data = state
        .blob_store
        .resolve(&file.blob_ref)
        .await
        .map_err(|e| match e {
            BlobStoreError::NotFound(_) => ApiError::not_found("File not found"),
            _ => ApiError::internal(format!("Failed to retrieve file: {e}")),
        })?;

    if unregistered {
        file.file_size = data.len() as u64;
        if state.db.register_unknown_file(&file)? {
            tracing::info!(file_id = %file.id, "Registered previously unknown file");
        }
    }

    // Build response with appropriate headers
    let content_length = data.len() as u64;
    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        content_type(&file)
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));

    let filename = file.file_name.replace(['"', '\\'], "");
    if let Ok(value) = format!("inline; filename=\"{filename}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    let cache_control = if file.visibility == Visibility::Public {
        "public, max-age=3600"
    } else {
        "private, no-store"
    };
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));

    Ok(response)
}

fn content_type(file: &FileRecord) -> String {
    if !file.mime_type.is_empty() && file.mime_type != "application/octet-stream" {
        return file.mime_type.clone();
    }
    mime_guess::from_path(&file.id)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn blocked_redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::FORBIDDEN, "Content blocked").into_response(),
    }
}
