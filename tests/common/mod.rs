#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};

use image_host::blob_store::LocalStore;
use image_host::config::{
    AdminCredentials, AuthConfig, Config, FilePolicy, ServerConfig, StorageConfig,
};
use image_host::storage::Database;
use image_host::{api, AppState};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "admin-pass";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    _dir: tempfile::TempDir,
}

pub fn test_config(dir: &tempfile::TempDir) -> Config {
    Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: dir.path().join("data").to_string_lossy().to_string(),
            public_base_url: None,
        },
        storage: StorageConfig {
            local_storage_path: dir.path().join("files").to_string_lossy().to_string(),
            ..StorageConfig::default()
        },
        auth: AuthConfig {
            jwt_secret: "integration-test-secret".to_string(),
            token_ttl_hours: 1,
            share_grant_ttl_secs: 300,
            admin: Some(AdminCredentials {
                username: ADMIN_USER.to_string(),
                password: ADMIN_PASS.to_string(),
            }),
        },
        files: FilePolicy::default(),
        max_upload_size: 1024 * 1024,
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(|_| {})
}

pub fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    configure(&mut config);

    let db = Database::open(&config.server.data_dir).unwrap();
    let blob_store = LocalStore::new(&config.storage.local_storage_path).unwrap();
    let state = Arc::new(AppState::new(config, db, Arc::new(blob_store)));
    let server = TestServer::new(api::create_router(Arc::clone(&state))).unwrap();

    TestApp {
        server,
        state,
        _dir: dir,
    }
}

/// Register a user and return `(user_id, token)`.
pub async fn register(server: &TestServer, username: &str) -> (String, String) {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "password": "correct-horse",
            "email": format!("{username}@example.com"),
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

/// A JPEG-looking payload of `size` bytes.
pub fn jpeg_bytes(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    data[..4].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
    data
}

/// Upload one JPEG and return its file id.
pub async fn upload_jpeg(server: &TestServer, token: Option<&str>, file_name: &str) -> String {
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(jpeg_bytes(1024))
            .file_name(file_name)
            .mime_type("image/jpeg"),
    );

    let mut request = server.post("/upload").multipart(form);
    if let Some(token) = token {
        request = request.add_header(AUTHORIZATION, format!("Bearer {}", token));
    }
    let response = request.await;
    response.assert_status_ok();

    let body: Value = response.json();
    let src = body[0]["src"].as_str().unwrap();
    src.strip_prefix("/file/").unwrap().to_string()
}
