use redb::{ReadableTable, WriteTransaction};
use serde::Deserialize;

use super::db::{
    load, load_list, load_name, remove, save, save_list, save_name, Database, DatabaseError,
};
use super::favorites::FavoriteIndex;
use super::models::{FavoriteEntry, FileRecord, FileSummary, Visibility};
use super::tables::*;
use super::tags::{ensure_tags_exist, normalize_tags};
use crate::error::AppError;

pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Owner-editable fields; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct FilePatch {
    pub file_name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
}

impl FilePatch {
    pub fn is_empty(&self) -> bool {
        self.file_name.is_none() && self.tags.is_none() && self.visibility.is_none()
    }
}

/// Search filters over one user's files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileFilter {
    /// Case-insensitive substring of the file name
    #[serde(default)]
    pub q: Option<String>,
    /// Exact tag name
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub favorite: Option<bool>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

impl FileFilter {
    /// `favorites` is the searching user's favorites index.
    pub fn matches(&self, record: &FileRecord, favorites: &FavoriteIndex) -> bool {
        if let Some(ref q) = self.q {
            let q = q.trim().to_lowercase();
            if !q.is_empty() && !record.file_name.to_lowercase().contains(&q) {
                return false;
            }
        }
        if let Some(ref tag) = self.tag {
            if !record.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(favorite) = self.favorite {
            if favorites.contains_key(&record.id) != favorite {
                return false;
            }
        }
        if let Some(visibility) = self.visibility {
            if record.visibility != visibility {
                return false;
            }
        }
        true
    }
}

impl Database {
    // ========================================================================
    // File operations
    // ========================================================================

    /// Store a new file record; signed-in owners also get an index entry.
    pub fn create_file(&self, record: &FileRecord) -> Result<(), AppError> {
        debug_assert!(!record.id.is_empty(), "file id must not be empty");

        self.write(|txn| {
            save(txn, FILES, &record.id, record)?;
            if load_name(txn, BLOB_CLAIMS, &record.blob_ref)?.is_none() {
                save_name(txn, BLOB_CLAIMS, &record.blob_ref, &record.id)?;
            }
            if !record.is_anonymous() {
                let mut index: Vec<FileSummary> = load_list(txn, USER_FILES, &record.owner_id)?;
                if !index.iter().any(|s| s.id == record.id) {
                    index.push(record.summary());
                    save_list(txn, USER_FILES, &record.owner_id, &index)?;
                }
            }
            Ok(())
        })
    }

    /// Persist a record for an id that was served without one. Returns false
    /// if a record appeared in the meantime or its blob is already claimed.
    pub fn register_unknown_file(&self, record: &FileRecord) -> Result<bool, AppError> {
        self.write(|txn| {
            if load::<FileRecord>(txn, FILES, &record.id)?.is_some()
                || load_name(txn, BLOB_CLAIMS, &record.blob_ref)?.is_some()
            {
                return Ok(false);
            }
            save(txn, FILES, &record.id, record)?;
            save_name(txn, BLOB_CLAIMS, &record.blob_ref, &record.id)?;
            Ok(true)
        })
    }

    /// Id of the record that stored `blob_ref`, even if that record has since
    /// been deleted.
    pub fn blob_claim(&self, blob_ref: &str) -> Result<Option<String>, DatabaseError> {
        self.read_name(BLOB_CLAIMS, blob_ref)
    }

    pub fn get_file(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        self.read(FILES, id)
    }

    pub fn require_file(&self, id: &str) -> Result<FileRecord, AppError> {
        self.get_file(id)?
            .ok_or_else(|| AppError::not_found("File not found"))
    }

    /// Apply an owner edit. Tags new to the owner's catalogue are added to it.
    pub fn update_file(
        &self,
        id: &str,
        patch: &FilePatch,
        requester_id: &str,
    ) -> Result<FileRecord, AppError> {
        let file_name = patch
            .file_name
            .as_deref()
            .map(validate_file_name)
            .transpose()?;
        let tags = patch.tags.as_deref().map(normalize_tags).transpose()?;

        self.write(|txn| {
            let mut record: FileRecord =
                load(txn, FILES, id)?.ok_or_else(|| AppError::not_found("File not found"))?;
            ensure_owner(&record, requester_id)?;

            if let Some(visibility) = patch.visibility {
                record.visibility = visibility;
            }
            if let Some(tags) = tags {
                ensure_tags_exist(txn, requester_id, &tags)?;
                record.tags = tags;
            }
            if let Some(file_name) = file_name {
                record.file_name = file_name;
                let mut index: Vec<FileSummary> = load_list(txn, USER_FILES, &record.owner_id)?;
                if let Some(entry) = index.iter_mut().find(|s| s.id == record.id) {
                    entry.file_name = record.file_name.clone();
                    save_list(txn, USER_FILES, &record.owner_id, &index)?;
                }
            }

            save(txn, FILES, id, &record)?;
            Ok(record)
        })
    }

    /// Remove a file's metadata and everything that points at it. The blob
    /// itself stays in the blob store.
    pub fn delete_file(&self, id: &str, requester_id: &str) -> Result<(), AppError> {
        self.write(|txn| {
            let record: FileRecord =
                load(txn, FILES, id)?.ok_or_else(|| AppError::not_found("File not found"))?;
            ensure_owner(&record, requester_id)?;
            purge_file(txn, &record)?;
            Ok(())
        })
    }

    /// A user's files, newest first.
    pub fn list_user_files(&self, user_id: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        let index: Vec<FileSummary> = self.read(USER_FILES, user_id)?.unwrap_or_default();

        let read_txn = self.begin_read()?;
        let files = read_txn.open_table(FILES)?;

        let mut records = Vec::with_capacity(index.len());
        for summary in index.iter().rev() {
            if let Some(data) = files.get(summary.id.as_str())? {
                records.push(rmp_serde::from_slice(data.value())?);
            }
        }
        Ok(records)
    }

    pub fn search_user_files(
        &self,
        user_id: &str,
        filter: &FileFilter,
    ) -> Result<Vec<FileRecord>, DatabaseError> {
        let favorites = self.favorite_index(user_id)?;
        Ok(self
            .list_user_files(user_id)?
            .into_iter()
            .filter(|record| filter.matches(record, &favorites))
            .collect())
    }
}

pub(crate) fn ensure_owner(record: &FileRecord, requester_id: &str) -> Result<(), AppError> {
    if record.is_owned_by(requester_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("You do not own this file"))
    }
}

fn validate_file_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("fileName must not be empty"));
    }
    if name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "fileName must be at most {MAX_FILE_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

/// Drop a record together with its index entries, favorites and shares.
/// The blob claim stays, so the bytes are never re-served as an unknown id.
pub(crate) fn purge_file(txn: &WriteTransaction, record: &FileRecord) -> Result<(), DatabaseError> {
    remove(txn, FILES, &record.id)?;

    if !record.is_anonymous() {
        let mut index: Vec<FileSummary> = load_list(txn, USER_FILES, &record.owner_id)?;
        index.retain(|s| s.id != record.id);
        save_list(txn, USER_FILES, &record.owner_id, &index)?;
    }

    let favorited_by: Vec<String> = load_list(txn, FILE_FAVORITES, &record.id)?;
    for user_id in &favorited_by {
        drop_favorite(txn, user_id, &record.id)?;
    }
    remove(txn, FILE_FAVORITES, &record.id)?;

    for share_id in &record.share_ids {
        remove(txn, SHARES, share_id)?;
    }

    tracing::debug!(file_id = %record.id, shares = record.share_ids.len(), "Purged file");
    Ok(())
}

fn drop_favorite(txn: &WriteTransaction, user_id: &str, file_id: &str) -> Result<(), DatabaseError> {
    let mut favorites: Vec<FavoriteEntry> = load_list(txn, USER_FAVORITES, user_id)?;
    let before = favorites.len();
    favorites.retain(|f| f.file_id != file_id);
    if favorites.len() != before {
        save_list(txn, USER_FAVORITES, user_id, &favorites)?;
    }
    Ok(())
}
