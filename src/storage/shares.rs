use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::{load, remove, save, Database, DatabaseError};
use super::models::{FileRecord, ShareRecord};
use super::tables::*;
use crate::error::AppError;

impl Database {
    // ========================================================================
    // Share operations
    // ========================================================================

    /// Store a share and link it from its file. Only the file's owner may
    /// share it.
    pub fn insert_share(&self, share: &ShareRecord) -> Result<(), AppError> {
        self.write(|txn| {
            let mut record: FileRecord = load(txn, FILES, &share.image_id)?
                .ok_or_else(|| AppError::not_found("Image not found"))?;
            if !record.is_owned_by(&share.owner_id) {
                return Err(AppError::forbidden("You can only share your own images"));
            }
            if load::<ShareRecord>(txn, SHARES, &share.id)?.is_some() {
                return Err(AppError::conflict("Share id collision"));
            }

            save(txn, SHARES, &share.id, share)?;
            record.share_ids.push(share.id.clone());
            save(txn, FILES, &record.id, &record)?;
            Ok(())
        })
    }

    pub fn get_share(&self, id: &str) -> Result<Option<ShareRecord>, DatabaseError> {
        self.read(SHARES, id)
    }

    /// Bump the access counter. Runs in its own write transaction so
    /// concurrent accesses are all counted.
    pub fn record_share_access(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<ShareRecord, AppError> {
        self.write(|txn| {
            let mut share: ShareRecord =
                load(txn, SHARES, id)?.ok_or_else(|| AppError::not_found("Share not found"))?;
            share.access_count += 1;
            share.last_accessed_at = Some(now);
            save(txn, SHARES, id, &share)?;
            Ok(share)
        })
    }

    pub fn delete_share(&self, id: &str, requester_id: &str) -> Result<(), AppError> {
        self.write(|txn| {
            let share: ShareRecord =
                load(txn, SHARES, id)?.ok_or_else(|| AppError::not_found("Share not found"))?;
            if share.owner_id != requester_id {
                return Err(AppError::forbidden("You can only delete your own shares"));
            }

            remove(txn, SHARES, id)?;
            if let Some(mut record) = load::<FileRecord>(txn, FILES, &share.image_id)? {
                record.share_ids.retain(|s| s != id);
                save(txn, FILES, &record.id, &record)?;
            }
            Ok(())
        })
    }

    /// Every share on the user's files, newest first.
    pub fn list_user_shares(&self, owner_id: &str) -> Result<Vec<ShareRecord>, DatabaseError> {
        let files = self.list_user_files(owner_id)?;

        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SHARES)?;

        let mut shares: Vec<ShareRecord> = Vec::new();
        for share_id in files.iter().flat_map(|f| f.share_ids.iter()) {
            if let Some(data) = table.get(share_id.as_str())? {
                shares.push(rmp_serde::from_slice(data.value())?);
            }
        }
        shares.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shares)
    }
}
