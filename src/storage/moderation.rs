use super::db::{load, save, Database, DatabaseError};
use super::files::purge_file;
use super::models::{FileRecord, ListType};
use super::tables::*;
use crate::error::AppError;

impl Database {
    // ========================================================================
    // Moderation
    // ========================================================================

    /// Every file record, in id order.
    pub fn list_all_files(&self) -> Result<Vec<FileRecord>, DatabaseError> {
        self.scan(FILES)
    }

    pub fn set_list_type(&self, id: &str, list_type: ListType) -> Result<FileRecord, AppError> {
        self.moderate(id, |record| record.moderation.list_type = list_type)
    }

    /// Set or clear the classifier label. Blank labels clear it.
    pub fn set_label(&self, id: &str, label: Option<String>) -> Result<FileRecord, AppError> {
        let label = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        self.moderate(id, |record| record.moderation.label = label)
    }

    /// Remove a file regardless of owner.
    pub fn remove_file(&self, id: &str) -> Result<(), AppError> {
        self.write(|txn| {
            let record: FileRecord =
                load(txn, FILES, id)?.ok_or_else(|| AppError::not_found("File not found"))?;
            purge_file(txn, &record)?;
            Ok(())
        })
    }

    fn moderate(
        &self,
        id: &str,
        apply: impl FnOnce(&mut FileRecord),
    ) -> Result<FileRecord, AppError> {
        let record = self.write(|txn| {
            let mut record: FileRecord =
                load(txn, FILES, id)?.ok_or_else(|| AppError::not_found("File not found"))?;
            apply(&mut record);
            save(txn, FILES, id, &record)?;
            Ok(record)
        })?;

        tracing::info!(
            file_id = %id,
            list_type = ?record.moderation.list_type,
            label = ?record.moderation.label,
            "Updated moderation state"
        );
        Ok(record)
    }
}
