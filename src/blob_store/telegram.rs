use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{BlobStore, BlobStoreError, StoredBlob, UploadBlob, UploadKind};
use crate::config::TelegramConfig;

/// Retry schedule for outbound sends: `max_retries` extra attempts, waiting
/// `base_delay × attempt` before each one.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Blob store backed by a messaging platform's bot document API.
/// Every upload becomes a message in one chat; the message's file id is the blob ref.
pub struct TelegramStore {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    retry: RetryPolicy,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaFile {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// The media part of a sent message. Variant order is the extraction
/// priority: a document wins over photo sizes, then video, then audio.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UploadedMedia {
    Document { document: MediaFile },
    Photo { photo: Vec<MediaFile> },
    Video { video: MediaFile },
    Audio { audio: MediaFile },
}

impl UploadedMedia {
    /// The file id to persist; for photos, the largest rendition.
    pub fn file_id(&self) -> Option<&str> {
        match self {
            UploadedMedia::Document { document: file }
            | UploadedMedia::Video { video: file }
            | UploadedMedia::Audio { audio: file } => Some(file.file_id.as_str()),
            UploadedMedia::Photo { photo } => photo
                .iter()
                .max_by_key(|size| size.file_size.unwrap_or(0))
                .map(|size| size.file_id.as_str()),
        }
    }
}

#[derive(Deserialize)]
struct RemoteFile {
    #[serde(default)]
    file_path: Option<String>,
}

impl TelegramStore {
    pub fn new(config: &TelegramConfig) -> Result<Self, BlobStoreError> {
        let bot_token = config
            .bot_token
            .clone()
            .ok_or_else(|| BlobStoreError::Backend("bot token is not configured".to_string()))?;
        let chat_id = config
            .chat_id
            .clone()
            .ok_or_else(|| BlobStoreError::Backend("chat id is not configured".to_string()))?;
        let client = Client::builder()
            .build()
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            bot_token,
            chat_id,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: config.retry_delay,
            },
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    fn download_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.bot_token, file_path)
    }

    fn build_form(&self, blob: &UploadBlob) -> Result<Form, BlobStoreError> {
        let part = Part::bytes(blob.data.to_vec())
            .file_name(blob.file_name.clone())
            .mime_str(&blob.mime_type)
            .map_err(|e| BlobStoreError::Backend(format!("invalid mime type: {e}")))?;

        Ok(Form::new()
            .text("chat_id", self.chat_id.clone())
            .part(media_field(blob.kind), part))
    }

    /// Send the blob, retrying only on network-level failures. A reply from
    /// the API, successful or not, ends the loop.
    async fn send_media(&self, blob: &UploadBlob) -> Result<UploadedMedia, BlobStoreError> {
        let url = self.method_url(send_method(blob.kind));
        let mut attempt = 0;

        let response = loop {
            let form = self.build_form(blob)?;
            match self.client.post(&url).multipart(form).send().await {
                Ok(response) => break response,
                Err(e) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Blob upload failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(BlobStoreError::Network(e.to_string())),
            }
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BlobStoreError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(BlobStoreError::Backend(format!(
                "upload rejected ({status}): {body}"
            )));
        }

        decode_result(&body)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BlobStoreError> {
        let body = request
            .send()
            .await
            .map_err(|e| BlobStoreError::Network(e.to_string()))?
            .text()
            .await
            .map_err(|e| BlobStoreError::Network(e.to_string()))?;
        decode_result(&body)
    }
}

fn send_method(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::Audio => "sendAudio",
        UploadKind::Document => "sendDocument",
        UploadKind::Video => "sendVideo",
    }
}

fn media_field(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::Audio => "audio",
        UploadKind::Document => "document",
        UploadKind::Video => "video",
    }
}

fn decode_result<T: DeserializeOwned>(body: &str) -> Result<T, BlobStoreError> {
    let response: ApiResponse<T> = serde_json::from_str(body)
        .map_err(|e| BlobStoreError::Backend(format!("unexpected API response: {e}")))?;

    if !response.ok {
        let description = response
            .description
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(BlobStoreError::Backend(description));
    }

    response
        .result
        .ok_or_else(|| BlobStoreError::Backend("API response carried no result".to_string()))
}

#[async_trait]
impl BlobStore for TelegramStore {
    async fn store(&self, blob: UploadBlob) -> Result<StoredBlob, BlobStoreError> {
        let media = self.send_media(&blob).await?;
        let blob_ref = media
            .file_id()
            .ok_or_else(|| BlobStoreError::Backend("message carried no file id".to_string()))?
            .to_string();

        tracing::debug!(blob_ref = %blob_ref, kind = ?blob.kind, "Stored blob");
        Ok(StoredBlob { blob_ref })
    }

    async fn resolve(&self, blob_ref: &str) -> Result<Bytes, BlobStoreError> {
        let request = self
            .client
            .get(self.method_url("getFile"))
            .query(&[("file_id", blob_ref)]);
        let file: RemoteFile = self.call(request).await.map_err(|e| match e {
            // Unknown file ids come back as a plain `ok: false`
            BlobStoreError::Backend(_) => BlobStoreError::NotFound(blob_ref.to_string()),
            other => other,
        })?;
        let file_path = file
            .file_path
            .ok_or_else(|| BlobStoreError::NotFound(blob_ref.to_string()))?;

        let response = self
            .client
            .get(self.download_url(&file_path))
            .send()
            .await
            .map_err(|e| BlobStoreError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BlobStoreError::NotFound(blob_ref.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            return Err(BlobStoreError::Backend(format!(
                "download failed ({status})"
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| BlobStoreError::Network(e.to_string()))
    }
}
