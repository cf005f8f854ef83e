use bytes::Bytes;
use image_host::blob_store::{BlobStore, BlobStoreError, LocalStore, UploadBlob, UploadKind};

fn blob(data: &'static str) -> UploadBlob {
    UploadBlob {
        file_name: "photo.jpg".to_string(),
        mime_type: "image/jpeg".to_string(),
        kind: UploadKind::from_mime("image/jpeg"),
        data: Bytes::from(data),
    }
}

#[tokio::test]
async fn test_local_store_store_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let stored = store.store(blob("hello world")).await.unwrap();
    assert!(!stored.blob_ref.is_empty());

    let retrieved = store.resolve(&stored.blob_ref).await.unwrap();
    assert_eq!(retrieved, Bytes::from("hello world"));
}

#[tokio::test]
async fn test_local_store_refs_are_unique() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let first = store.store(blob("first")).await.unwrap();
    let second = store.store(blob("second")).await.unwrap();
    assert_ne!(first.blob_ref, second.blob_ref);

    assert_eq!(
        store.resolve(&first.blob_ref).await.unwrap(),
        Bytes::from("first")
    );
}

#[tokio::test]
async fn test_local_store_resolve_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let result = store.resolve("missing").await;
    assert!(matches!(result.unwrap_err(), BlobStoreError::NotFound(_)));
}

#[tokio::test]
async fn test_local_store_rejects_path_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let files = dir.path().join("files");
    let store = LocalStore::new(&files).unwrap();
    std::fs::write(dir.path().join("secret"), "do not serve").unwrap();

    for blob_ref in ["../secret", "", "a/b", "..\\secret"] {
        let result = store.resolve(blob_ref).await;
        assert!(
            matches!(result, Err(BlobStoreError::NotFound(_))),
            "{blob_ref:?} should not resolve"
        );
    }
}

#[test]
fn test_upload_kind_from_mime() {
    assert_eq!(UploadKind::from_mime("image/png"), UploadKind::Document);
    assert_eq!(UploadKind::from_mime("video/mp4"), UploadKind::Video);
    assert_eq!(UploadKind::from_mime("audio/mpeg"), UploadKind::Audio);
    assert_eq!(UploadKind::from_mime(""), UploadKind::Document);
}
