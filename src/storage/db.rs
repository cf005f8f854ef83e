use redb::{Database as RedbDatabase, ReadTransaction, ReadableTable, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

/// Metadata store. Every multi-key mutation runs in one redb write
/// transaction; redb serializes writers, so per-user index updates never
/// lose each other.
pub struct Database {
    db: Arc<RedbDatabase>,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("image-host.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        let write_txn = db.begin_write()?;
        {
            for table in [
                FILES,
                USERS,
                SHARES,
                USER_FILES,
                USER_FAVORITES,
                USER_TAGS,
                FILE_FAVORITES,
            ] {
                let _ = write_txn.open_table(table)?;
            }
            for table in [USERNAMES, EMAILS, BLOB_CLAIMS] {
                let _ = write_txn.open_table(table)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    /// Run `f` inside a write transaction, committing only if it succeeds.
    pub(crate) fn write<R>(
        &self,
        f: impl FnOnce(&WriteTransaction) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let write_txn = self.begin_write()?;
        let result = f(&write_txn)?;
        write_txn.commit().map_err(DatabaseError::from)?;
        Ok(result)
    }

    /// Point read of one record.
    pub(crate) fn read<T: DeserializeOwned>(
        &self,
        table: Records,
        key: &str,
    ) -> Result<Option<T>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(table)?;

        match table.get(key)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Point read of a name index entry.
    pub(crate) fn read_name(&self, table: Names, key: &str) -> Result<Option<String>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(table)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Every record in a table, in key order.
    pub(crate) fn scan<T: DeserializeOwned>(&self, table: Records) -> Result<Vec<T>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(table)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            records.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(records)
    }
}

// ============================================================================
// Write-transaction helpers
// ============================================================================

pub(crate) fn load<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: Records,
    key: &str,
) -> Result<Option<T>, DatabaseError> {
    let table = txn.open_table(table)?;
    let result = match table.get(key)? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };
    Ok(result)
}

pub(crate) fn save<T: Serialize>(
    txn: &WriteTransaction,
    table: Records,
    key: &str,
    value: &T,
) -> Result<(), DatabaseError> {
    let data = rmp_serde::to_vec_named(value)?;
    let mut table = txn.open_table(table)?;
    table.insert(key, data.as_slice())?;
    Ok(())
}

pub(crate) fn remove(txn: &WriteTransaction, table: Records, key: &str) -> Result<bool, DatabaseError> {
    let mut table = txn.open_table(table)?;
    let existed = table.remove(key)?.is_some();
    Ok(existed)
}

pub(crate) fn load_name(
    txn: &WriteTransaction,
    table: Names,
    key: &str,
) -> Result<Option<String>, DatabaseError> {
    let table = txn.open_table(table)?;
    let result = table.get(key)?.map(|v| v.value().to_string());
    Ok(result)
}

pub(crate) fn save_name(
    txn: &WriteTransaction,
    table: Names,
    key: &str,
    id: &str,
) -> Result<(), DatabaseError> {
    let mut table = txn.open_table(table)?;
    table.insert(key, id)?;
    Ok(())
}

/// Load a per-user index list, treating a missing key as empty.
pub(crate) fn load_list<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: Records,
    user_id: &str,
) -> Result<Vec<T>, DatabaseError> {
    Ok(load(txn, table, user_id)?.unwrap_or_default())
}

/// Store a per-user index list, dropping the key once the list is empty.
pub(crate) fn save_list<T: Serialize>(
    txn: &WriteTransaction,
    table: Records,
    user_id: &str,
    list: &[T],
) -> Result<(), DatabaseError> {
    if list.is_empty() {
        remove(txn, table, user_id)?;
        Ok(())
    } else {
        save(txn, table, user_id, &list)
    }
}
