use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use base64::Engine;

use super::response::ApiError;
use crate::auth::AuthUser;
use crate::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Requires a valid bearer token.
#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        let claims = state
            .tokens
            .verify_access(token)
            .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;
        Ok(AuthUser::from(claims))
    }
}

/// The caller if a valid bearer token came along; anonymous otherwise.
/// A bad token is treated the same as none.
pub struct MaybeUser(pub Option<AuthUser>);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let user = bearer_token(&parts.headers)
            .and_then(|token| state.tokens.verify_access(token).ok())
            .map(AuthUser::from);
        Ok(MaybeUser(user))
    }
}

/// HTTP Basic credentials matching the configured admin account.
pub struct AdminAuth;

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let admin = state
            .config
            .auth
            .admin
            .as_ref()
            .ok_or_else(|| ApiError::not_found("Not found"))?;

        let (username, password) = basic_credentials(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Admin credentials required"))?;

        if username != admin.username || password != admin.password {
            tracing::warn!(username = %username, "Rejected admin credentials");
            return Err(ApiError::unauthorized("Invalid admin credentials"));
        }
        Ok(AdminAuth)
    }
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
