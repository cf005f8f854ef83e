use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ============================================================================
// Paginated envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

/// `limit`/`offset` query parameters shared by every list endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> u32 {
    20
}

impl<T: Serialize> Paginated<T> {
    /// Slice one page out of `all` and map it for the wire.
    pub fn page<S>(
        all: &[S],
        params: PageParams,
        map: impl Fn(&S) -> T,
    ) -> Result<Json<Paginated<T>>, ApiError> {
        if params.limit == 0 {
            return Err(ApiError::bad_request("limit must be greater than 0"));
        }

        let items = all
            .iter()
            .skip(params.offset as usize)
            .take(params.limit as usize)
            .map(map)
            .collect();

        Ok(Json(Paginated {
            items,
            pagination: Pagination {
                limit: params.limit,
                offset: params.offset,
                total: all.len() as u64,
            },
        }))
    }
}

// ============================================================================
// Error envelope
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler error: a client failure (4xx) or a server error (5xx). Both
/// render as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, String),
    Error(StatusCode, String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Fail(code, msg) => (code, Json(ErrorBody { error: msg })).into_response(),
            ApiError::Error(code, msg) => {
                tracing::error!(status = code.as_u16(), error = %msg, "Request failed");
                (
                    code,
                    Json(ErrorBody {
                        error: "Internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::UNAUTHORIZED, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::PAYLOAD_TOO_LARGE, message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Validation(msg) => ApiError::Fail(StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => ApiError::Fail(StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => ApiError::Fail(StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => ApiError::Fail(StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => ApiError::Fail(StatusCode::CONFLICT, msg),
            AppError::Gone(msg) => ApiError::Fail(StatusCode::GONE, msg),
            AppError::Internal(msg) => ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
    }
}

impl From<crate::storage::DatabaseError> for ApiError {
    fn from(e: crate::storage::DatabaseError) -> Self {
        ApiError::internal(e.to_string())
    }
}

// ============================================================================
// Custom extractors (reject with ApiError)
// ============================================================================

/// Drop-in replacement for `axum::Json` that rejects with `ApiError`.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid request body: {}", err.body_text())
                    }
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing Content-Type: application/json header".into()
                    }
                    _ => "Failed to read request body".into(),
                };
                Err(ApiError::bad_request(message))
            }
        }
    }
}

/// Drop-in replacement for `axum::extract::Query` that rejects with `ApiError`.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))
    }
}

/// Translate serde/serde_qs error messages into human-friendly descriptions.
fn friendly_query_error(raw: &str) -> String {
    let cleaned = raw
        .replace("u32", "non-negative integer")
        .replace("u64", "non-negative integer")
        .replace("i32", "integer")
        .replace("i64", "integer");

    format!("Invalid query parameter: {cleaned}")
}
