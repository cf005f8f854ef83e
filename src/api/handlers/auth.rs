use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson};
use crate::auth::password::{hash_password, validate_password, verify_password, PasswordError};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::storage::models::UserRecord;
use crate::AppState;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const AVATAR_URL_MAX: usize = 2048;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarRequest {
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserView {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub file_count: usize,
    pub total_size: u64,
    pub favorite_count: usize,
    pub tag_count: usize,
    pub share_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserView,
    pub stats: StatsView,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = req.username.trim();
    let email = req.email.trim();

    validate_username(username)?;
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    validate_password(&req.password).map_err(AppError::from)?;

    let user = UserRecord {
        id: uuid::Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: hash_password(&req.password).map_err(AppError::from)?,
        avatar_url: None,
        created_at: Utc::now(),
    };
    state.db.create_user(&user)?;

    let token = state
        .tokens
        .issue_access(&user.id, &user.username)
        .map_err(AppError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserView::from(&user),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }

    let user = state
        .db
        .find_user_by_username(req.username.trim())?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    match verify_password(&req.password, &user.password_hash) {
        Ok(()) => {}
        Err(PasswordError::VerificationFailed) => {
            tracing::info!(username = %user.username, "Failed login attempt");
            return Err(ApiError::unauthorized("Invalid username or password"));
        }
        Err(e) => return Err(AppError::from(e).into()),
    }

    let token = state
        .tokens
        .issue_access(&user.id, &user.username)
        .map_err(AppError::from)?;

    tracing::debug!(user_id = %user.id, "User logged in");
    Ok(Json(AuthResponse {
        user: UserView::from(&user),
        token,
    }))
}

pub async fn current_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UserView>, ApiError> {
    let record = load_user(&state, &user)?;
    Ok(Json(UserView::from(&record)))
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let record = load_user(&state, &user)?;
    let stats = state.db.user_stats(&user.id)?;

    Ok(Json(ProfileResponse {
        user: UserView::from(&record),
        stats: StatsView {
            file_count: stats.file_count,
            total_size: stats.total_size,
            favorite_count: stats.favorite_count,
            tag_count: stats.tag_count,
            share_count: stats.share_count,
        },
    }))
}

pub async fn update_avatar(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<AvatarRequest>,
) -> Result<Json<UserView>, ApiError> {
    let avatar_url = req
        .avatar_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());

    if avatar_url
        .as_deref()
        .is_some_and(|url| url.len() > AVATAR_URL_MAX)
    {
        return Err(ApiError::bad_request(format!(
            "avatarUrl must be at most {AVATAR_URL_MAX} characters"
        )));
    }

    let record = state.db.set_avatar(&user.id, avatar_url)?;
    tracing::debug!(user_id = %user.id, "Updated avatar");
    Ok(Json(UserView::from(&record)))
}

// ============================================================================
// Helpers
// ============================================================================

fn load_user(state: &AppState, user: &AuthUser) -> Result<UserRecord, ApiError> {
    state
        .db
        .get_user(&user.id)?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ApiError::bad_request(format!(
            "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::bad_request(
            "username may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}
