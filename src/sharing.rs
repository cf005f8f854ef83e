//! Share links: creation, public info, redemption and revocation.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::storage::models::{FileRecord, ShareRecord, ShareType, Visibility};
use crate::AppState;

const SHARE_ID_BYTES: usize = 16;

/// Parameters for a new share link.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShare {
    #[serde(default)]
    pub image_id: String,
    /// One of `public`, `password`, `private`, `specific_users`
    #[serde(default)]
    pub share_type: String,
    #[serde(default)]
    pub password: Option<String>,
    /// User ids or usernames
    #[serde(default)]
    pub allowed_users: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Lifetime in seconds, as an alternative to `expires_at`
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// What anyone holding the link may learn about a share.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicShareInfo {
    pub id: String,
    pub share_type: ShareType,
    pub requires_password: bool,
    pub requires_login: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub access_count: u64,
    pub file: SharedFile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFile {
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
    pub upload_time: DateTime<Utc>,
}

/// A share as its owner sees it. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub id: String,
    pub image_id: String,
    pub share_type: ShareType,
    pub requires_password: bool,
    pub allowed_users: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub access_count: u64,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl From<&ShareRecord> for ShareView {
    fn from(share: &ShareRecord) -> Self {
        Self {
            id: share.id.clone(),
            image_id: share.image_id.clone(),
            share_type: share.share_type,
            requires_password: share.share_type == ShareType::Password,
            allowed_users: share.allowed_users.clone(),
            created_at: share.created_at,
            expires_at: share.expires_at,
            expired: share.is_expired(Utc::now()),
            access_count: share.access_count,
            last_accessed_at: share.last_accessed_at,
        }
    }
}

/// Result of a successful redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareAccess {
    pub image_id: String,
    pub access_url: String,
}

pub fn parse_share_type(value: &str) -> Result<ShareType, AppError> {
    match value {
        "public" => Ok(ShareType::Public),
        "password" => Ok(ShareType::Password),
        "private" => Ok(ShareType::Private),
        "specific_users" => Ok(ShareType::SpecificUsers),
        _ => Err(AppError::validation(
            "shareType must be one of public, password, private, specific_users",
        )),
    }
}

fn resolve_expiry(
    request: &CreateShare,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    match (request.expires_at, request.expires_in) {
        (Some(_), Some(_)) => Err(AppError::validation(
            "Give either expiresAt or expiresIn, not both",
        )),
        (Some(at), None) if at <= now => {
            Err(AppError::validation("expiresAt must be in the future"))
        }
        (Some(at), None) => Ok(Some(at)),
        (None, Some(secs)) if secs <= 0 => {
            Err(AppError::validation("expiresIn must be a positive number of seconds"))
        }
        (None, Some(secs)) => Ok(Some(now + Duration::seconds(secs))),
        (None, None) => Ok(None),
    }
}

/// Resolve allow-list entries given as ids or usernames to user ids.
fn resolve_allowed_users(state: &AppState, entries: &[String]) -> Result<Vec<String>, AppError> {
    let mut ids: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let user = match state.db.get_user(entry)? {
            Some(user) => user,
            None => state
                .db
                .find_user_by_username(entry)?
                .ok_or_else(|| AppError::validation(format!("Unknown user: {entry}")))?,
        };
        if !ids.contains(&user.id) {
            ids.push(user.id);
        }
    }
    if ids.is_empty() {
        return Err(AppError::validation(
            "allowedUsers must name at least one user for specific_users shares",
        ));
    }
    Ok(ids)
}

fn new_share_id() -> Result<String, AppError> {
    let mut bytes = [0u8; SHARE_ID_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::internal("Failed to generate share id"))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

pub fn create_share(
    state: &AppState,
    owner: &AuthUser,
    request: &CreateShare,
) -> Result<ShareRecord, AppError> {
    if request.image_id.trim().is_empty() {
        return Err(AppError::validation("imageId is required"));
    }
    let share_type = parse_share_type(&request.share_type)?;
    let now = Utc::now();
    let expires_at = resolve_expiry(request, now)?;

    let password_hash = match share_type {
        ShareType::Password => {
            let password = request
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| AppError::validation("password is required for password shares"))?;
            Some(hash_password(password)?)
        }
        _ => None,
    };

    let allowed_users = match share_type {
        ShareType::SpecificUsers => resolve_allowed_users(state, &request.allowed_users)?,
        _ => Vec::new(),
    };

    let share = ShareRecord {
        id: new_share_id()?,
        image_id: request.image_id.trim().to_string(),
        owner_id: owner.id.clone(),
        share_type,
        password_hash,
        allowed_users,
        created_at: now,
        expires_at,
        access_count: 0,
        last_accessed_at: None,
    };
    state.db.insert_share(&share)?;

    tracing::info!(
        share_id = %share.id,
        file_id = %share.image_id,
        user_id = %owner.id,
        share_type = ?share.share_type,
        "Created share"
    );
    Ok(share)
}

/// Load a share that is still live.
fn live_share(state: &AppState, share_id: &str, now: DateTime<Utc>) -> Result<ShareRecord, AppError> {
    let share = state
        .db
        .get_share(share_id)?
        .ok_or_else(|| AppError::not_found("Share not found"))?;
    if share.is_expired(now) {
        return Err(AppError::gone("Share has expired"));
    }
    Ok(share)
}

fn shared_file(state: &AppState, share: &ShareRecord) -> Result<FileRecord, AppError> {
    state
        .db
        .get_file(&share.image_id)?
        .ok_or_else(|| AppError::not_found("Shared image no longer exists"))
}

pub fn share_info(state: &AppState, share_id: &str) -> Result<PublicShareInfo, AppError> {
    let share = live_share(state, share_id, Utc::now())?;
    let file = shared_file(state, &share)?;

    Ok(PublicShareInfo {
        id: share.id,
        share_type: share.share_type,
        requires_password: share.share_type == ShareType::Password,
        requires_login: matches!(
            share.share_type,
            ShareType::SpecificUsers | ShareType::Private
        ),
        created_at: share.created_at,
        expires_at: share.expires_at,
        access_count: share.access_count,
        file: SharedFile {
            id: file.id,
            file_name: file.file_name,
            file_size: file.file_size,
            upload_time: file.upload_time,
        },
    })
}

/// Redeem a share. Expiry is checked before any credential, so an expired
/// share is `Gone` whatever password is supplied.
pub fn access_share(
    state: &AppState,
    share_id: &str,
    password: Option<&str>,
    principal: Option<&AuthUser>,
) -> Result<ShareAccess, AppError> {
    let now = Utc::now();
    let share = live_share(state, share_id, now)?;

    match share.share_type {
        ShareType::Public => {}
        ShareType::Password => {
            let password = password
                .filter(|p| !p.is_empty())
                .ok_or_else(|| AppError::forbidden("Password required"))?;
            let hash = share
                .password_hash
                .as_deref()
                .ok_or_else(|| AppError::internal("Password share has no stored hash"))?;
            verify_password(password, hash)?;
        }
        ShareType::SpecificUsers => match principal {
            Some(user) if share.allows_user(&user.id) => {}
            Some(_) => return Err(AppError::forbidden("You are not allowed to access this share")),
            None => return Err(AppError::forbidden("Sign in to access this share")),
        },
        ShareType::Private => {
            if !principal.is_some_and(|user| user.id == share.owner_id) {
                return Err(AppError::forbidden("This share is private"));
            }
        }
    }

    let file = shared_file(state, &share)?;
    state.db.record_share_access(&share.id, now)?;

    let access_url = access_url_for(state, &share, &file)?;
    tracing::info!(share_id = %share.id, file_id = %file.id, "Share accessed");

    Ok(ShareAccess {
        image_id: file.id,
        access_url,
    })
}

fn access_url_for(
    state: &AppState,
    share: &ShareRecord,
    file: &FileRecord,
) -> Result<String, AppError> {
    let path = format!("/file/{}", file.id);
    if file.visibility == Visibility::Public {
        return Ok(path);
    }

    match share.share_type {
        ShareType::Public | ShareType::SpecificUsers => Ok(format!("{path}?token={}", share.id)),
        ShareType::Password | ShareType::Private => {
            let grant = state.tokens.issue_grant(&share.id, &file.id)?;
            Ok(format!("{path}?token={}&grant={grant}", share.id))
        }
    }
}

pub fn delete_share(state: &AppState, share_id: &str, requester: &AuthUser) -> Result<(), AppError> {
    state.db.delete_share(share_id, &requester.id)?;
    tracing::info!(share_id = %share_id, user_id = %requester.id, "Deleted share");
    Ok(())
}

pub fn list_shares(state: &AppState, owner: &AuthUser) -> Result<Vec<ShareView>, AppError> {
    Ok(state
        .db
        .list_user_shares(&owner.id)?
        .iter()
        .map(ShareView::from)
        .collect())
}
