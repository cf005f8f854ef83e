use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{success, SuccessResponse};
use crate::api::extract::MaybeUser;
use crate::api::response::{ApiError, AppJson, AppQuery, PageParams, Paginated};
use crate::auth::AuthUser;
use crate::sharing::{self, CreateShare, PublicShareInfo, ShareView};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AccessShareRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessShareResponse {
    pub success: bool,
    pub image_id: String,
    pub access_url: String,
}

pub async fn create_share(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<CreateShare>,
) -> Result<(StatusCode, Json<ShareView>), ApiError> {
    let share = sharing::create_share(&state, &user, &req)?;
    Ok((StatusCode::CREATED, Json(ShareView::from(&share))))
}

pub async fn get_share_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PublicShareInfo>, ApiError> {
    Ok(Json(sharing::share_info(&state, &id)?))
}

/// Unauthenticated, but a bearer token is used when present. The body is
/// optional; public shares need none.
pub async fn access_share(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    MaybeUser(user): MaybeUser,
    body: Bytes,
) -> Result<Json<AccessShareResponse>, ApiError> {
    let req: AccessShareRequest = if body.iter().all(u8::is_ascii_whitespace) {
        AccessShareRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))?
    };

    let access = sharing::access_share(&state, &id, req.password.as_deref(), user.as_ref())?;

    Ok(Json(AccessShareResponse {
        success: true,
        image_id: access.image_id,
        access_url: access.access_url,
    }))
}

pub async fn delete_share(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    sharing::delete_share(&state, &id, &user)?;
    Ok(success())
}

pub async fn list_shares(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<Paginated<ShareView>>, ApiError> {
    let shares = sharing::list_shares(&state, &user)?;
    Paginated::page(&shares, params, |view| view.clone())
}
