//! image-host - An image hosting service with per-file access control
//!
//! This crate provides anonymous and signed-in uploads, access-controlled
//! serving, and per-user file management with:
//! - Swappable blob storage backends (local filesystem, Telegram bot API)
//! - redb embedded database for metadata (ACID, MVCC, crash-safe)
//! - Share links (public, password, private, per-user) with expiry
//! - Per-user tags and favorites, plus admin moderation
//! - REST API with multipart upload support

pub mod access;
pub mod api;
pub mod auth;
pub mod blob_store;
pub mod config;
pub mod error;
pub mod sharing;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod upload;

use std::sync::Arc;

use auth::TokenService;
use config::Config;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub blob_store: Arc<dyn blob_store::BlobStore>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(config: Config, db: Database, blob_store: Arc<dyn blob_store::BlobStore>) -> Self {
        let tokens = TokenService::new(
            &config.auth.jwt_secret,
            chrono::Duration::hours(config.auth.token_ttl_hours),
            chrono::Duration::seconds(config.auth.share_grant_ttl_secs),
        );
        Self {
            config,
            db,
            blob_store,
            tokens,
        }
    }
}
