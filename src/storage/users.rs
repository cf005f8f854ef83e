use super::db::{load, load_name, save, save_name, Database, DatabaseError};
use super::models::{FavoriteEntry, Tag, UserRecord};
use super::tables::*;
use crate::error::AppError;

/// Counters shown on a user's profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub file_count: usize,
    pub total_size: u64,
    pub favorite_count: usize,
    pub tag_count: usize,
    pub share_count: usize,
}

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Insert a new user. Usernames and emails are unique case-insensitively.
    pub fn create_user(&self, user: &UserRecord) -> Result<(), AppError> {
        let username_key = user.username.to_lowercase();
        let email_key = user.email.to_lowercase();

        self.write(|txn| {
            if load_name(txn, USERNAMES, &username_key)?.is_some() {
                return Err(AppError::conflict("Username is already taken"));
            }
            if load_name(txn, EMAILS, &email_key)?.is_some() {
                return Err(AppError::conflict("Email is already registered"));
            }

            save(txn, USERS, &user.id, user)?;
            save_name(txn, USERNAMES, &username_key, &user.id)?;
            save_name(txn, EMAILS, &email_key, &user.id)?;
            Ok(())
        })?;

        tracing::info!(user_id = %user.id, username = %user.username, "Registered user");
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        self.read(USERS, id)
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        match self.read_name(USERNAMES, &username.to_lowercase())? {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    pub fn set_avatar(&self, id: &str, avatar_url: Option<String>) -> Result<UserRecord, AppError> {
        self.write(|txn| {
            let mut user: UserRecord =
                load(txn, USERS, id)?.ok_or_else(|| AppError::not_found("User not found"))?;
            user.avatar_url = avatar_url;
            save(txn, USERS, id, &user)?;
            Ok(user)
        })
    }

    pub fn user_stats(&self, id: &str) -> Result<UserStats, DatabaseError> {
        let files = self.list_user_files(id)?;
        let favorites: Vec<FavoriteEntry> = self.read(USER_FAVORITES, id)?.unwrap_or_default();
        let tags: Vec<Tag> = self.read(USER_TAGS, id)?.unwrap_or_default();

        Ok(UserStats {
            file_count: files.len(),
            total_size: files.iter().map(|f| f.file_size).sum(),
            favorite_count: favorites.len(),
            tag_count: tags.len(),
            share_count: files.iter().map(|f| f.share_ids.len()).sum(),
        })
    }
}
