//! Upload pipeline: classify each file, push it to the blob store and record
//! its metadata.

use bytes::Bytes;

use crate::auth::AuthUser;
use crate::blob_store::{UploadBlob, UploadKind};
use crate::error::AppError;
use crate::storage::models::FileRecord;
use crate::AppState;

const FALLBACK_MIME: &str = "application/octet-stream";
const FALLBACK_NAME: &str = "file";

/// One multipart `file` field.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl IncomingFile {
    /// Declared content type, or a guess from the file name.
    pub fn mime_type(&self) -> String {
        self.content_type
            .clone()
            .filter(|ct| !ct.is_empty() && ct != FALLBACK_MIME)
            .or_else(|| {
                self.file_name
                    .as_deref()
                    .and_then(|n| mime_guess::from_path(n).first())
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| FALLBACK_MIME.to_string())
    }

    fn file_name(&self) -> String {
        self.file_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_NAME)
            .to_string()
    }
}

/// Upload every file and return the records that made it. A file that fails
/// at any step is logged and left out; the rest of the batch carries on.
pub async fn upload_files(
    state: &AppState,
    files: Vec<IncomingFile>,
    owner: Option<&AuthUser>,
) -> Result<Vec<FileRecord>, AppError> {
    if files.is_empty() {
        return Err(AppError::validation("No files uploaded"));
    }

    let total = files.len();
    let mut records = Vec::with_capacity(total);

    for file in files {
        let file_name = file.file_name();
        if file.data.is_empty() {
            tracing::warn!(file_name = %file_name, "Skipping empty upload");
            continue;
        }

        let mime_type = file.mime_type();
        let file_size = file.data.len() as u64;
        let blob = UploadBlob {
            file_name: file_name.clone(),
            kind: UploadKind::from_mime(&mime_type),
            mime_type: mime_type.clone(),
            data: file.data,
        };

        let stored = match state.blob_store.store(blob).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(file_name = %file_name, error = %e, "Skipping upload: blob store failed");
                continue;
            }
        };

        let record = FileRecord::new(
            &stored.blob_ref,
            &file_name,
            file_size,
            &mime_type,
            owner.map(|user| user.id.as_str()),
        );

        if let Err(e) = state.db.create_file(&record) {
            tracing::warn!(file_id = %record.id, error = %e, "Skipping upload: metadata write failed");
            continue;
        }

        tracing::info!(
            file_id = %record.id,
            user_id = %record.owner_id,
            file_size,
            mime_type = %record.mime_type,
            "Uploaded file"
        );
        records.push(record);
    }

    if records.len() < total {
        tracing::warn!(
            uploaded = records.len(),
            skipped = total - records.len(),
            "Upload batch partially failed"
        );
    }

    Ok(records)
}
