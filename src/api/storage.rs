//! Binary uploads to the object storage endpoint.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use crate::domain::aggregates::UploadMeta;
use super::{extract_message, ApiError, TokenProvider};

/// A file picked by the user, not yet uploaded.
#[derive(Clone, Debug)]
pub struct LocalFile {
    pub meta: UploadMeta,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let meta = UploadMeta { file_name: file_name.into(), file_size: bytes.len() as u64, content_type: content_type.into() };
        Self { meta, bytes }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let content_type = content_type_for(&file_name).to_string();
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn is_image(&self) -> bool { self.meta.content_type.starts_with("image/") }
}

pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads the binary and returns its durable URL.
    async fn upload(&self, file: &LocalFile) -> Result<String, ApiError>;
}

#[derive(Deserialize)]
struct UploadResponse { url: String }

pub struct HttpStorage {
    http: reqwest::Client,
    upload_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpStorage {
    pub fn new(http: reqwest::Client, upload_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { http, upload_url: upload_url.into(), tokens }
    }
}

#[async_trait]
impl ObjectStorage for HttpStorage {
    async fn upload(&self, file: &LocalFile) -> Result<String, ApiError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.meta.file_name.clone())
            .mime_str(&file.meta.content_type)?;
        let mut request = self.http.post(&self.upload_url).multipart(Form::new().part("file", part));
        if let Some(token) = self.tokens.bearer_token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::Server { status: status.as_u16(), message: extract_message(&bytes) });
        }
        let body: UploadResponse = serde_json::from_slice(&bytes)?;
        debug!(file = %file.meta.file_name, url = %body.url, "Stored upload");
        Ok(body.url)
    }
}
