//! Shared test helpers for image-host unit tests.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::AuthUser;
use crate::blob_store::LocalStore;
use crate::config::{AuthConfig, Config, FilePolicy, ServerConfig, StorageConfig};
use crate::storage::models::UserRecord;
use crate::storage::Database;
use crate::AppState;

pub fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            public_base_url: None,
        },
        storage: StorageConfig {
            local_storage_path: files_dir.to_string_lossy().to_string(),
            ..StorageConfig::default()
        },
        auth: AuthConfig {
            jwt_secret: "test-secret-key-for-testing-only".to_string(),
            token_ttl_hours: 1,
            share_grant_ttl_secs: 300,
            admin: None,
        },
        files: FilePolicy::default(),
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    }
}

/// Create a test AppState with a temporary database and local blob store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    state_with(test_config(temp_dir))
}

pub fn state_with(config: Config) -> Arc<AppState> {
    let db = Database::open(&config.server.data_dir).expect("Failed to open test database");
    let blob_store = LocalStore::new(&config.storage.local_storage_path)
        .expect("Failed to create test blob store");

    Arc::new(AppState::new(config, db, Arc::new(blob_store)))
}

/// Insert a user directly, skipping password hashing.
pub fn add_user(state: &AppState, username: &str) -> AuthUser {
    let user = UserRecord {
        id: uuid::Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: String::new(),
        avatar_url: None,
        created_at: Utc::now(),
    };
    state.db.create_user(&user).expect("Failed to create test user");

    AuthUser {
        id: user.id,
        username: user.username,
    }
}
