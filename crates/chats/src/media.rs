//! Turns uploaded attachments into durable remote URLs.

use async_trait::async_trait;
use bytes::Bytes;
use courier_config::MediaConfig;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub use crate::entities::MediaKind;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media uploads are not configured")]
    Disabled,
    #[error("upload request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("object store rejected upload with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("object store response did not include a url")]
    MissingUrl,
}

/// A binary attachment received with a message
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub kind: MediaKind,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store the upload and return its public URL
    async fn store(&self, upload: MediaUpload) -> Result<String, MediaError>;
}

/// Rejects every upload. Used when no object store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMediaStore;

#[async_trait]
impl MediaStore for DisabledMediaStore {
    async fn store(&self, _upload: MediaUpload) -> Result<String, MediaError> {
        Err(MediaError::Disabled)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

/// Object store reached over HTTP with a Cloudinary-style unsigned upload API.
///
/// Images go to `{upload_url}/image/upload`; audio and video both go to
/// `{upload_url}/video/upload`.
#[derive(Debug, Clone)]
pub struct HttpMediaStore {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: Option<String>,
    folder: Option<String>,
}

impl HttpMediaStore {
    pub fn new(
        upload_url: impl Into<String>,
        upload_preset: Option<String>,
        folder: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            upload_url: upload_url.into().trim_end_matches('/').to_string(),
            upload_preset,
            folder,
        })
    }

    /// Build a store from configuration. `None` when no upload URL is set.
    pub fn from_config(config: &MediaConfig) -> Result<Option<Self>, MediaError> {
        let Some(upload_url) = config.upload_url.as_deref() else {
            return Ok(None);
        };

        Self::new(
            upload_url,
            config.upload_preset.clone(),
            config.folder.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
        .map(Some)
    }

    fn resource_type(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Image => "image",
            MediaKind::Audio | MediaKind::Video => "video",
        }
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn store(&self, upload: MediaUpload) -> Result<String, MediaError> {
        let endpoint = format!(
            "{}/{}/upload",
            self.upload_url,
            Self::resource_type(upload.kind)
        );
        let size = upload.bytes.len();

        let mut part = Part::bytes(upload.bytes.to_vec()).file_name(upload.file_name.clone());
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let mut form = Form::new().part("file", part);
        if let Some(preset) = &self.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }
        if let Some(folder) = &self.folder {
            form = form.text("folder", folder.clone());
        }

        debug!(endpoint = %endpoint, kind = upload.kind.as_str(), size, "uploading attachment");

        let response = self.client.post(&endpoint).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: UploadResponse = response.json().await?;
        let url = body.secure_url.or(body.url).ok_or(MediaError::MissingUrl)?;

        info!(kind = upload.kind.as_str(), file_name = %upload.file_name, url = %url, "stored attachment");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn upload(kind: MediaKind) -> MediaUpload {
        MediaUpload {
            kind,
            file_name: "clip.bin".to_string(),
            content_type: Some("application/octet-stream".to_string()),
            bytes: Bytes::from_static(b"payload"),
        }
    }

    fn store_for(server: &MockServer) -> HttpMediaStore {
        HttpMediaStore::new(
            server.base_url(),
            Some("unsigned".to_string()),
            Some("chat".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_image_upload_returns_secure_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/image/upload")
                    .body_contains("unsigned")
                    .body_contains("payload");
                then.status(200)
                    .json_body(json!({"secure_url": "https://cdn.example/image.png"}));
            })
            .await;

        let url = store_for(&server).store(upload(MediaKind::Image)).await.unwrap();
        assert_eq!(url, "https://cdn.example/image.png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_audio_uses_video_resource_type() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/video/upload");
                then.status(200)
                    .json_body(json!({"secure_url": "https://cdn.example/voice.mp3"}));
            })
            .await;

        let url = store_for(&server).store(upload(MediaKind::Audio)).await.unwrap();
        assert_eq!(url, "https://cdn.example/voice.mp3");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_upload_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/video/upload");
                then.status(400).body("bad preset");
            })
            .await;

        let result = store_for(&server).store(upload(MediaKind::Video)).await;
        assert!(matches!(result, Err(MediaError::Rejected { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_missing_url_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/image/upload");
                then.status(200).json_body(json!({"public_id": "x"}));
            })
            .await;

        let result = store_for(&server).store(upload(MediaKind::Image)).await;
        assert!(matches!(result, Err(MediaError::MissingUrl)));
    }

    #[tokio::test]
    async fn test_disabled_store_rejects() {
        let result = DisabledMediaStore.store(upload(MediaKind::Image)).await;
        assert!(matches!(result, Err(MediaError::Disabled)));
    }

    #[test]
    fn test_from_config_without_url_is_none() {
        assert!(HttpMediaStore::from_config(&MediaConfig::default())
            .unwrap()
            .is_none());
    }
}
