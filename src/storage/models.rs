use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner id recorded for uploads made without a bearer token.
pub const ANONYMOUS: &str = "anonymous";

/// Access policy of a file. Anything but `Public` sends every read through
/// the access evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Password,
    SpecificUsers,
}

/// Manual review outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListType {
    #[default]
    None,
    White,
    Block,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moderation {
    pub list_type: ListType,
    /// Classifier label, e.g. `adult`
    #[serde(default)]
    pub label: Option<String>,
}

impl Moderation {
    pub fn is_blocked(&self) -> bool {
        self.list_type == ListType::Block
            || self
                .label
                .as_deref()
                .is_some_and(|label| label.eq_ignore_ascii_case("adult"))
    }
}

/// Metadata for one stored blob
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    // System fields
    pub id: String,
    pub blob_ref: String,
    pub owner_id: String,
    pub file_size: u64,
    pub mime_type: String,
    pub upload_time: DateTime<Utc>,

    // Owner-editable fields
    pub file_name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub share_ids: Vec<String>,
    #[serde(default)]
    pub moderation: Moderation,
}

impl FileRecord {
    pub fn new(
        blob_ref: &str,
        file_name: &str,
        file_size: u64,
        mime_type: &str,
        owner_id: Option<&str>,
    ) -> Self {
        Self {
            id: file_id_for(blob_ref, file_name),
            blob_ref: blob_ref.to_string(),
            owner_id: owner_id.unwrap_or(ANONYMOUS).to_string(),
            file_size,
            mime_type: mime_type.to_string(),
            upload_time: Utc::now(),
            file_name: file_name.to_string(),
            visibility: Visibility::Public,
            tags: Vec::new(),
            share_ids: Vec::new(),
            moderation: Moderation::default(),
        }
    }

    /// The public anonymous record an unknown id is treated as.
    pub fn unregistered(id: &str) -> Self {
        let blob_ref = id.split('.').next().unwrap_or(id);
        let mime_type = mime_guess::from_path(id)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Self {
            id: id.to_string(),
            ..Self::new(blob_ref, id, 0, &mime_type, None)
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.owner_id == ANONYMOUS
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        !self.is_anonymous() && self.owner_id == user_id
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            upload_time: self.upload_time,
        }
    }
}

/// File id = blob ref plus the lowercased original extension.
pub fn file_id_for(blob_ref: &str, file_name: &str) -> String {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{blob_ref}.{}", ext.to_ascii_lowercase()),
        _ => blob_ref.to_string(),
    }
}

/// Entry in a user's file index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
    pub upload_time: DateTime<Utc>,
}

/// Entry in a user's favorites index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub file_id: String,
    pub favorited_at: DateTime<Utc>,
}

/// Entry in a user's tag catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(name: &str, color: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            color,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareType {
    Public,
    Password,
    Private,
    SpecificUsers,
}

/// One issued share link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: String,
    pub image_id: String,
    pub owner_id: String,
    pub share_type: ShareType,
    /// Argon2 PHC string; present iff `share_type == Password`
    #[serde(default)]
    pub password_hash: Option<String>,
    /// User ids; non-empty iff `share_type == SpecificUsers`
    #[serde(default)]
    pub allowed_users: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// `None` never expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl ShareRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }

    pub fn allows_user(&self, user_id: &str) -> bool {
        self.allowed_users.iter().any(|u| u == user_id)
    }
}
