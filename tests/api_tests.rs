mod common;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{jpeg_bytes, register, spawn_app, spawn_app_with, upload_jpeg, ADMIN_PASS, ADMIN_USER};
use image_host::storage::models::{ShareRecord, ShareType};

fn basic(username: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {}", encoded)
}

// ============================================================================
// Upload & serving
// ============================================================================

#[tokio::test]
async fn test_anonymous_upload_then_fetch() {
    let app = spawn_app();

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(jpeg_bytes(2048))
            .file_name("holiday.jpg")
            .mime_type("image/jpeg"),
    );
    let response = app.server.post("/upload").multipart(form).await;
    response.assert_status_ok();

    let body: Value = response.json();
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    let src = items[0]["src"].as_str().unwrap();
    assert!(src.starts_with("/file/"));
    assert!(src.ends_with(".jpg"));

    let response = app.server.get(src).await;
    response.assert_status_ok();
    assert_eq!(response.header(CONTENT_TYPE), "image/jpeg");
    assert_eq!(response.as_bytes().len(), 2048);
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let app = spawn_app();

    let form = MultipartForm::new().add_text("note", "no file here");
    let response = app.server.post("/upload").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_upload_over_size_limit() {
    let app = spawn_app_with(|config| config.max_upload_size = 1024);

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(jpeg_bytes(4096))
            .file_name("big.jpg")
            .mime_type("image/jpeg"),
    );
    let response = app.server.post("/upload").multipart(form).await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_multi_file_upload_skips_failed_parts() {
    let app = spawn_app();

    let form = MultipartForm::new()
        .add_part(
            "file",
            Part::bytes(jpeg_bytes(256))
                .file_name("one.jpg")
                .mime_type("image/jpeg"),
        )
        .add_part(
            "file",
            Part::bytes(Vec::<u8>::new())
                .file_name("empty.jpg")
                .mime_type("image/jpeg"),
        )
        .add_part(
            "file",
            Part::bytes(jpeg_bytes(512))
                .file_name("two.jpg")
                .mime_type("image/jpeg"),
        );
    let response = app.server.post("/upload").multipart(form).await;
    response.assert_status_ok();

    let body: Value = response.json();
    let srcs: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["src"].as_str().unwrap())
        .collect();
    assert_eq!(srcs.len(), 2);
    assert_ne!(srcs[0], srcs[1]);

    for src in srcs {
        app.server.get(src).await.assert_status_ok();
    }
    assert_eq!(app.state.db.list_all_files().unwrap().len(), 2);
}

#[tokio::test]
async fn test_picgo_upload() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "picgo").await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(jpeg_bytes(512))
            .file_name("shot.jpg")
            .mime_type("image/jpeg"),
    );
    let response = app
        .server
        .post("/api/picgo/upload")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    let url = body["data"]["url"].as_str().unwrap();
    assert!(url.contains("/file/"));
}

#[tokio::test]
async fn test_picgo_upload_failure_shape() {
    let app = spawn_app();

    let form = MultipartForm::new().add_text("other", "value");
    let response = app.server.post("/api/picgo/upload").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_unknown_file_is_not_found_when_blob_missing() {
    let app = spawn_app();

    let response = app.server.get("/file/does-not-exist.png").await;
    response.assert_status_not_found();
}

// ============================================================================
// Ownership & visibility
// ============================================================================

#[tokio::test]
async fn test_upload_defaults_to_public_visibility() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "alice").await;
    let file_id = upload_jpeg(&app.server, Some(&token), "a.jpg").await;

    let response = app
        .server
        .get("/api/images")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["items"][0]["id"], file_id);
    assert_eq!(body["items"][0]["visibility"], "public");

    // Public files are readable anonymously
    app.server
        .get(&format!("/file/{}", file_id))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_non_owner_cannot_modify_or_delete() {
    let app = spawn_app();
    let (_, alice) = register(&app.server, "alice").await;
    let (_, bob) = register(&app.server, "bob").await;
    let file_id = upload_jpeg(&app.server, Some(&alice), "a.jpg").await;

    app.server
        .put(&format!("/api/images/{}", file_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", bob))
        .json(&json!({ "fileName": "stolen.jpg" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .delete(&format!("/api/images/{}", file_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", bob))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let record = app.state.db.get_file(&file_id).unwrap().unwrap();
    assert_eq!(record.file_name, "a.jpg");
}

#[tokio::test]
async fn test_private_file_hidden_from_others() {
    let app = spawn_app();
    let (_, alice) = register(&app.server, "alice").await;
    let (_, bob) = register(&app.server, "bob").await;
    let file_id = upload_jpeg(&app.server, Some(&alice), "a.jpg").await;

    app.server
        .put(&format!("/api/images/{}", file_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .json(&json!({ "visibility": "private" }))
        .await
        .assert_status_ok();

    let path = format!("/file/{}", file_id);
    app.server
        .get(&path)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .get(&path)
        .add_header(AUTHORIZATION, format!("Bearer {}", bob))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .get(&path)
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .await
        .assert_status_ok();
    app.server
        .get(&format!("{}?grant=not-a-jwt", path))
        .add_header(AUTHORIZATION, format!("Bearer {}", bob))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_private_blob_not_reachable_under_other_ids() {
    let app = spawn_app();
    let (_, alice) = register(&app.server, "alice").await;
    let file_id = upload_jpeg(&app.server, Some(&alice), "a.jpg").await;
    let blob_ref = file_id.strip_suffix(".jpg").unwrap().to_string();

    app.server
        .put(&format!("/api/images/{}", file_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .json(&json!({ "visibility": "private" }))
        .await
        .assert_status_ok();

    for alias in [blob_ref.clone(), format!("{}.png", blob_ref)] {
        app.server
            .get(&format!("/file/{}", alias))
            .await
            .assert_status_not_found();
        assert!(app.state.db.get_file(&alias).unwrap().is_none());
    }
    app.server
        .get(&format!("/file/{}", file_id))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_requires_a_field() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "alice").await;
    let file_id = upload_jpeg(&app.server, Some(&token), "a.jpg").await;

    app.server
        .put(&format!("/api/images/{}", file_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_management_requires_auth() {
    let app = spawn_app();

    app.server
        .get("/api/images")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get("/api/images")
        .add_header(AUTHORIZATION, "Bearer not-a-token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = spawn_app();
    let (user_id, _) = register(&app.server, "carol").await;

    // Usernames are unique regardless of case
    app.server
        .post("/api/auth/register")
        .json(&json!({
            "username": "Carol",
            "password": "correct-horse",
            "email": "other@example.com",
        }))
        .await
        .assert_status(StatusCode::CONFLICT);

    app.server
        .post("/api/auth/login")
        .json(&json!({ "username": "carol", "password": "wrong-horse" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "username": "carol", "password": "correct-horse" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let token = body["token"].as_str().unwrap().to_string();

    upload_jpeg(&app.server, Some(&token), "p.jpg").await;

    let response = app
        .server
        .get("/api/auth/profile")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert_eq!(body["stats"]["fileCount"], 1);
    assert_eq!(body["stats"]["totalSize"], 1024);
}

// ============================================================================
// Shares
// ============================================================================

#[tokio::test]
async fn test_public_share_info_and_access() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "alice").await;
    let file_id = upload_jpeg(&app.server, Some(&token), "a.jpg").await;

    let response = app
        .server
        .post("/api/shares")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "imageId": file_id, "shareType": "public" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let share: Value = response.json();
    let share_id = share["id"].as_str().unwrap();

    let response = app.server.get(&format!("/api/shares/{}", share_id)).await;
    response.assert_status_ok();
    let info: Value = response.json();
    assert_eq!(info["requiresPassword"], false);
    assert_eq!(info["file"]["id"], file_id.as_str());

    let response = app
        .server
        .post(&format!("/api/shares/{}/access", share_id))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["accessUrl"], format!("/file/{}", file_id));

    let share = app.state.db.get_share(share_id).unwrap().unwrap();
    assert_eq!(share.access_count, 1);
}

#[tokio::test]
async fn test_password_share_round_trip() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "alice").await;
    let file_id = upload_jpeg(&app.server, Some(&token), "a.jpg").await;

    app.server
        .put(&format!("/api/images/{}", file_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "visibility": "private" }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/api/shares")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "imageId": file_id, "shareType": "password", "password": "s3cret" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let share: Value = response.json();
    assert!(share.get("passwordHash").is_none());
    let share_id = share["id"].as_str().unwrap();

    let info: Value = app.server.get(&format!("/api/shares/{}", share_id)).await.json();
    assert_eq!(info["requiresPassword"], true);

    let access_path = format!("/api/shares/{}/access", share_id);
    app.server
        .post(&access_path)
        .json(&json!({ "password": "guess" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .post(&access_path)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .post(&access_path)
        .json(&json!({ "password": "s3cret" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let access_url = body["accessUrl"].as_str().unwrap();
    assert!(access_url.contains("grant="));

    // The redeemed URL opens the private file anonymously
    app.server.get(access_url).await.assert_status_ok();
    // A bare share token is not enough for a password share
    app.server
        .get(&format!("/file/{}?token={}", file_id, share_id))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_specific_users_share() {
    let app = spawn_app();
    let (_, owner) = register(&app.server, "owner").await;
    let (_, u1) = register(&app.server, "user1").await;
    let (u2_id, u2) = register(&app.server, "user2").await;
    let (_, u3) = register(&app.server, "user3").await;
    let file_id = upload_jpeg(&app.server, Some(&owner), "a.jpg").await;

    app.server
        .put(&format!("/api/images/{}", file_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", owner))
        .json(&json!({ "visibility": "private" }))
        .await
        .assert_status_ok();

    // Allow-list entries may be usernames or ids
    let response = app
        .server
        .post("/api/shares")
        .add_header(AUTHORIZATION, format!("Bearer {}", owner))
        .json(&json!({
            "imageId": file_id,
            "shareType": "specific_users",
            "allowedUsers": ["user1", u2_id],
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let share: Value = response.json();
    let share_id = share["id"].as_str().unwrap();
    let file_path = format!("/file/{}?token={}", file_id, share_id);
    let access_path = format!("/api/shares/{}/access", share_id);

    for token in [&u1, &u2] {
        app.server
            .post(&access_path)
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .await
            .assert_status_ok();
        app.server
            .get(&file_path)
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .await
            .assert_status_ok();
    }

    app.server
        .post(&access_path)
        .add_header(AUTHORIZATION, format!("Bearer {}", u3))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .get(&file_path)
        .add_header(AUTHORIZATION, format!("Bearer {}", u3))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .post(&access_path)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .get(&file_path)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_expired_share_is_gone() {
    let app = spawn_app();
    let (owner_id, token) = register(&app.server, "alice").await;
    let file_id = upload_jpeg(&app.server, Some(&token), "a.jpg").await;

    let now = Utc::now();
    let share = ShareRecord {
        id: "expired-share".to_string(),
        image_id: file_id.clone(),
        owner_id,
        share_type: ShareType::Public,
        password_hash: None,
        allowed_users: Vec::new(),
        created_at: now - Duration::hours(2),
        expires_at: Some(now - Duration::hours(1)),
        access_count: 0,
        last_accessed_at: None,
    };
    app.state.db.insert_share(&share).unwrap();

    app.server
        .get("/api/shares/expired-share")
        .await
        .assert_status(StatusCode::GONE);
    app.server
        .post("/api/shares/expired-share/access")
        .await
        .assert_status(StatusCode::GONE);

    let share = app.state.db.get_share("expired-share").unwrap().unwrap();
    assert_eq!(share.access_count, 0);
}

#[tokio::test]
async fn test_share_listing_and_revocation() {
    let app = spawn_app();
    let (_, alice) = register(&app.server, "alice").await;
    let (_, bob) = register(&app.server, "bob").await;
    let file_id = upload_jpeg(&app.server, Some(&alice), "a.jpg").await;

    // Only the owner may share a file
    app.server
        .post("/api/shares")
        .add_header(AUTHORIZATION, format!("Bearer {}", bob))
        .json(&json!({ "imageId": file_id, "shareType": "public" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let share: Value = app
        .server
        .post("/api/shares")
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .json(&json!({ "imageId": file_id, "shareType": "public", "expiresIn": 3600 }))
        .await
        .json();
    let share_id = share["id"].as_str().unwrap();
    assert!(share["expiresAt"].is_string());

    let listing: Value = app
        .server
        .get("/api/shares")
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .await
        .json();
    assert_eq!(listing["pagination"]["total"], 1);
    assert_eq!(listing["items"][0]["id"], share_id);

    app.server
        .delete(&format!("/api/shares/{}", share_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", bob))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .delete(&format!("/api/shares/{}", share_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .await
        .assert_status_ok();
    app.server
        .get(&format!("/api/shares/{}", share_id))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_invalid_share_type_rejected() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "alice").await;
    let file_id = upload_jpeg(&app.server, Some(&token), "a.jpg").await;

    app.server
        .post("/api/shares")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "imageId": file_id, "shareType": "everyone" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Tags & favorites
// ============================================================================

#[tokio::test]
async fn test_tag_rename_propagates_to_files() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "alice").await;
    let first = upload_jpeg(&app.server, Some(&token), "a.jpg").await;
    let second = upload_jpeg(&app.server, Some(&token), "b.jpg").await;

    let response = app
        .server
        .post("/api/tags")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "name": "trip" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let tag: Value = response.json();
    let tag_id = tag["id"].as_str().unwrap();

    let batch: Value = app
        .server
        .post("/api/tags/batch")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "action": "add", "fileIds": [first, second], "tags": ["trip"] }))
        .await
        .json();
    assert_eq!(batch["succeeded"], 2);
    assert_eq!(batch["failed"], 0);

    let response = app
        .server
        .put(&format!("/api/tags/{}", tag_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "name": "vacation" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["updatedFiles"], 2);
    assert_eq!(body["tag"]["name"], "vacation");
    assert_eq!(body["tag"]["fileCount"], 2);

    for id in [&first, &second] {
        let record = app.state.db.get_file(id).unwrap().unwrap();
        assert_eq!(record.tags, vec!["vacation".to_string()]);
    }

    let search: Value = app
        .server
        .get("/api/images/search?tag=vacation")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json();
    assert_eq!(search["pagination"]["total"], 2);

    let tagged: Value = app
        .server
        .get(&format!("/api/tags/{}/images", tag_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json();
    assert_eq!(tagged["pagination"]["total"], 2);
}

#[tokio::test]
async fn test_duplicate_tag_conflicts() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "alice").await;

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        app.server
            .post("/api/tags")
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({ "name": "  Cats " }))
            .await
            .assert_status(expected);
    }
}

#[tokio::test]
async fn test_favorites_flow() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "alice").await;
    let file_id = upload_jpeg(&app.server, Some(&token), "a.jpg").await;
    let path = format!("/api/favorites/{}", file_id);

    app.server
        .post(&path)
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status_ok();
    app.server
        .post(&path)
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::CONFLICT);

    let status: Value = app
        .server
        .get(&format!("{}/status", path))
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json();
    assert_eq!(status["favorited"], true);

    let listing: Value = app
        .server
        .get("/api/favorites")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json();
    assert_eq!(listing["pagination"]["total"], 1);
    assert_eq!(listing["items"][0]["favorite"], true);

    let batch: Value = app
        .server
        .post("/api/favorites/batch")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .json(&json!({ "action": "remove", "fileIds": [file_id, "missing.jpg"] }))
        .await
        .json();
    assert_eq!(batch["succeeded"], 1);
    assert_eq!(batch["failed"], 1);

    app.server
        .delete(&path)
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_favorites_are_tracked_per_user() {
    let app = spawn_app();
    let (_, alice) = register(&app.server, "alice").await;
    let (_, bob) = register(&app.server, "bob").await;
    let (_, carol) = register(&app.server, "carol").await;
    let file_id = upload_jpeg(&app.server, Some(&alice), "a.jpg").await;
    let path = format!("/api/favorites/{}", file_id);

    for token in [&alice, &bob] {
        app.server
            .post(&path)
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .await
            .assert_status_ok();
    }

    // Bob favoriting last must not hide alice's own favorite
    let search: Value = app
        .server
        .get("/api/images/search?favorite=true")
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .await
        .json();
    assert_eq!(search["pagination"]["total"], 1);
    assert_eq!(search["items"][0]["favorite"], true);

    app.server
        .post(&path)
        .add_header(AUTHORIZATION, format!("Bearer {}", carol))
        .await
        .assert_status_ok();
    app.server
        .delete(&format!("/api/images/{}", file_id))
        .add_header(AUTHORIZATION, format!("Bearer {}", alice))
        .await
        .assert_status_ok();

    for token in [&alice, &bob, &carol] {
        let status: Value = app
            .server
            .get(&format!("{}/status", path))
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .await
            .json();
        assert_eq!(status["favorited"], false);

        let profile: Value = app
            .server
            .get("/api/auth/profile")
            .add_header(AUTHORIZATION, format!("Bearer {}", token))
            .await
            .json();
        assert_eq!(profile["stats"]["favoriteCount"], 0);
    }
}

#[tokio::test]
async fn test_pagination_rejects_zero_limit() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "alice").await;
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        upload_jpeg(&app.server, Some(&token), name).await;
    }

    let page: Value = app
        .server
        .get("/api/images?limit=2&offset=2")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .json();
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["pagination"]["total"], 3);

    app.server
        .get("/api/images?limit=0")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Moderation & health
// ============================================================================

#[tokio::test]
async fn test_blocked_file_redirects_everyone() {
    let app = spawn_app();
    let (_, token) = register(&app.server, "alice").await;
    let file_id = upload_jpeg(&app.server, Some(&token), "a.jpg").await;

    app.server
        .post(&format!("/api/manage/block/{}", file_id))
        .add_header(AUTHORIZATION, basic(ADMIN_USER, ADMIN_PASS))
        .await
        .assert_status_ok();

    let redirect = app.state.config.files.blocked_redirect_url.clone();
    let path = format!("/file/{}", file_id);

    let response = app.server.get(&path).await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.header(LOCATION), redirect.as_str());

    let response = app
        .server
        .get(&path)
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status(StatusCode::FOUND);

    // Whitelisting lifts the block
    app.server
        .post(&format!("/api/manage/white/{}", file_id))
        .add_header(AUTHORIZATION, basic(ADMIN_USER, ADMIN_PASS))
        .await
        .assert_status_ok();
    app.server.get(&path).await.assert_status_ok();
}

#[tokio::test]
async fn test_blocked_blob_not_reachable_under_other_ids() {
    let app = spawn_app();
    let file_id = upload_jpeg(&app.server, None, "y.jpg").await;
    let blob_ref = file_id.strip_suffix(".jpg").unwrap().to_string();

    app.server
        .post(&format!("/api/manage/block/{}", file_id))
        .add_header(AUTHORIZATION, basic(ADMIN_USER, ADMIN_PASS))
        .await
        .assert_status_ok();

    for alias in [blob_ref.clone(), format!("{}.gif", blob_ref)] {
        app.server
            .get(&format!("/file/{}", alias))
            .await
            .assert_status_not_found();
    }
    app.server
        .get(&format!("/file/{}", file_id))
        .await
        .assert_status(StatusCode::FOUND);
}

#[tokio::test]
async fn test_admin_routes_require_basic_auth() {
    let app = spawn_app();
    let file_id = upload_jpeg(&app.server, None, "anon.jpg").await;

    app.server
        .get("/api/manage/list")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get("/api/manage/list")
        .add_header(AUTHORIZATION, basic(ADMIN_USER, "nope"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let listing: Value = app
        .server
        .get("/api/manage/list")
        .add_header(AUTHORIZATION, basic(ADMIN_USER, ADMIN_PASS))
        .await
        .json();
    assert_eq!(listing["pagination"]["total"], 1);
    assert_eq!(listing["items"][0]["id"], file_id.as_str());

    let labelled: Value = app
        .server
        .put(&format!("/api/manage/label/{}", file_id))
        .add_header(AUTHORIZATION, basic(ADMIN_USER, ADMIN_PASS))
        .json(&json!({ "label": "adult" }))
        .await
        .json();
    assert_eq!(labelled["label"], "adult");
    assert_eq!(labelled["blocked"], true);

    app.server
        .delete(&format!("/api/manage/delete/{}", file_id))
        .add_header(AUTHORIZATION, basic(ADMIN_USER, ADMIN_PASS))
        .await
        .assert_status_ok();
    assert!(app.state.db.get_file(&file_id).unwrap().is_none());
}

#[tokio::test]
async fn test_admin_routes_absent_without_credentials() {
    let app = spawn_app_with(|config| config.auth.admin = None);

    app.server
        .get("/api/manage/list")
        .add_header(AUTHORIZATION, basic(ADMIN_USER, ADMIN_PASS))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app();

    let response = app.server.get("/_internal/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}
