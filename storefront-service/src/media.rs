//! Product image checks and the signed upload client for the media host.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::config::MediaConfig;

pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported image type {0}; accepted: image/jpeg, image/jpg, image/png")]
    UnsupportedType(String),
    #[error("image is {0} bytes; the limit is 4 MiB")]
    TooLarge(usize),
    #[error("media host request failed: {0}")]
    Transport(String),
    #[error("media host answered {status}: {body}")]
    Upstream { status: u16, body: String },
}

impl MediaError {
    /// Rejections caused by the uploaded file rather than the media host.
    pub fn is_client_error(&self) -> bool {
        matches!(self, MediaError::UnsupportedType(_) | MediaError::TooLarge(_))
    }
}

pub fn check_image(image: &ImageUpload) -> Result<(), MediaError> {
    let content_type = image.content_type.to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(MediaError::UnsupportedType(image.content_type.clone()));
    }
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(MediaError::TooLarge(image.bytes.len()));
    }
    Ok(())
}

/// `<unix-millis>-<file stem>`, with anything outside `[A-Za-z0-9_-]` in the
/// stem replaced by `_`.
pub fn public_id(file_name: &str, unix_millis: i64) -> String {
    let base = file_name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(file_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        format!("{unix_millis}-image")
    } else {
        format!("{unix_millis}-{stem}")
    }
}

/// Signature over the sorted `key=value` pairs joined with `&`, followed by the secret.
pub fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, image: ImageUpload) -> Result<StoredImage, MediaError>;
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

pub struct CloudinaryStore {
    client: Client,
    config: MediaConfig,
}

impl CloudinaryStore {
    pub fn new(client: Client, config: MediaConfig) -> Self {
        Self { client, config }
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", self.config.upload_base_url, self.config.cloud_name)
    }
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn store(&self, image: ImageUpload) -> Result<StoredImage, MediaError> {
        check_image(&image)?;
        let now = chrono::Utc::now();
        let public_id = public_id(&image.file_name, now.timestamp_millis());
        let timestamp = now.timestamp().to_string();
        let signature = sign_params(
            &[
                ("folder", self.config.folder.as_str()),
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
        );

        let part = multipart::Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|err| MediaError::UnsupportedType(err.to_string()))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.config.folder.clone())
            .text("public_id", public_id)
            .text("signature", signature);

        let resp = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|err| MediaError::Transport(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MediaError::Upstream { status: status.as_u16(), body });
        }
        let uploaded: UploadResponse = resp
            .json()
            .await
            .map_err(|err| MediaError::Transport(err.to_string()))?;
        tracing::info!(public_id = %uploaded.public_id, "product image uploaded");
        Ok(StoredImage { url: uploaded.secure_url, public_id: uploaded.public_id })
    }
}
