use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::db::{load, load_list, save_list, Database, DatabaseError};
use super::models::{FavoriteEntry, FileRecord, Visibility};
use super::tables::*;
use super::tags::BatchOutcome;
use crate::error::AppError;

/// One user's favorites: file id -> favorited at.
pub type FavoriteIndex = HashMap<String, DateTime<Utc>>;

impl Database {
    // ========================================================================
    // Favorites
    // ========================================================================

    /// Favorite a file the user can read: a public file or one they own.
    pub fn add_favorite(&self, user_id: &str, file_id: &str) -> Result<FavoriteEntry, AppError> {
        self.write(|txn| {
            let record: FileRecord =
                load(txn, FILES, file_id)?.ok_or_else(|| AppError::not_found("File not found"))?;
            if record.visibility != Visibility::Public && !record.is_owned_by(user_id) {
                return Err(AppError::forbidden("You cannot favorite this file"));
            }

            let mut favorites: Vec<FavoriteEntry> = load_list(txn, USER_FAVORITES, user_id)?;
            if favorites.iter().any(|f| f.file_id == file_id) {
                return Err(AppError::conflict("File is already in favorites"));
            }

            let entry = FavoriteEntry {
                file_id: file_id.to_string(),
                favorited_at: Utc::now(),
            };
            favorites.push(entry.clone());
            save_list(txn, USER_FAVORITES, user_id, &favorites)?;

            let mut favorited_by: Vec<String> = load_list(txn, FILE_FAVORITES, file_id)?;
            if !favorited_by.iter().any(|u| u == user_id) {
                favorited_by.push(user_id.to_string());
                save_list(txn, FILE_FAVORITES, file_id, &favorited_by)?;
            }
            Ok(entry)
        })
    }

    pub fn remove_favorite(&self, user_id: &str, file_id: &str) -> Result<(), AppError> {
        self.write(|txn| {
            let mut favorites: Vec<FavoriteEntry> = load_list(txn, USER_FAVORITES, user_id)?;
            let Some(pos) = favorites.iter().position(|f| f.file_id == file_id) else {
                return Err(AppError::not_found("File is not in favorites"));
            };
            favorites.remove(pos);
            save_list(txn, USER_FAVORITES, user_id, &favorites)?;

            let mut favorited_by: Vec<String> = load_list(txn, FILE_FAVORITES, file_id)?;
            favorited_by.retain(|u| u != user_id);
            save_list(txn, FILE_FAVORITES, file_id, &favorited_by)?;
            Ok(())
        })
    }

    pub fn favorite_status(
        &self,
        user_id: &str,
        file_id: &str,
    ) -> Result<Option<FavoriteEntry>, DatabaseError> {
        let favorites: Vec<FavoriteEntry> = self.read(USER_FAVORITES, user_id)?.unwrap_or_default();
        Ok(favorites.into_iter().find(|f| f.file_id == file_id))
    }

    pub fn favorite_index(&self, user_id: &str) -> Result<FavoriteIndex, DatabaseError> {
        let favorites: Vec<FavoriteEntry> = self.read(USER_FAVORITES, user_id)?.unwrap_or_default();
        Ok(favorites
            .into_iter()
            .map(|f| (f.file_id, f.favorited_at))
            .collect())
    }

    /// Ids of every user who favorited `file_id`.
    pub fn favorited_by(&self, file_id: &str) -> Result<Vec<String>, DatabaseError> {
        Ok(self.read(FILE_FAVORITES, file_id)?.unwrap_or_default())
    }

    /// The user's favorites with their records, most recently favorited
    /// first. Entries whose file is gone are skipped.
    pub fn list_favorites(
        &self,
        user_id: &str,
    ) -> Result<Vec<(FavoriteEntry, FileRecord)>, DatabaseError> {
        let favorites: Vec<FavoriteEntry> = self.read(USER_FAVORITES, user_id)?.unwrap_or_default();

        let mut items = Vec::with_capacity(favorites.len());
        for entry in favorites.into_iter().rev() {
            if let Some(record) = self.get_file(&entry.file_id)? {
                items.push((entry, record));
            }
        }
        Ok(items)
    }

    /// Add or remove several favorites; each item succeeds or fails alone.
    pub fn batch_favorites(
        &self,
        user_id: &str,
        file_ids: &[String],
        add: bool,
    ) -> Result<BatchOutcome, AppError> {
        let mut outcome = BatchOutcome::default();
        for file_id in file_ids {
            let result = if add {
                self.add_favorite(user_id, file_id).map(|_| ())
            } else {
                self.remove_favorite(user_id, file_id)
            };
            match result {
                Ok(()) => outcome.record(true),
                Err(AppError::Internal(msg)) => return Err(AppError::Internal(msg)),
                Err(_) => outcome.record(false),
            }
        }
        Ok(outcome)
    }
}
