//! Cloudinary image store client.
//!
//! Uploads are validated locally (size, declared type, magic bytes) before any
//! request leaves the process. Requests are signed with SHA-256 over the
//! sorted parameters plus the API secret.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

/// Cloudinary API base URL.
const BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Upper bound on a single upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Errors that can occur when interacting with the image store.
#[derive(Debug, Error)]
pub enum ImageStoreError {
    /// No Cloudinary credentials are configured.
    #[error("image uploads are not configured")]
    NotConfigured,

    #[error("image is empty")]
    Empty,

    #[error("image must be at most {max} bytes")]
    TooLarge { max: usize },

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    /// File contents do not match the declared type.
    #[error("file contents do not match declared type {0}")]
    ContentMismatch(&'static str),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ImageStoreError {
    /// Whether the caller sent a bad file (as opposed to the store failing).
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::Empty
                | Self::TooLarge { .. }
                | Self::UnsupportedType(_)
                | Self::ContentMismatch(_)
        )
    }
}

/// Accepted upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Gif,
    Avif,
}

impl ImageKind {
    /// Parse a declared MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            "image/avif" => Some(Self::Avif),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
            Self::Avif => "image/avif",
        }
    }

    /// Check the file signature.
    #[must_use]
    pub fn matches_magic(self, bytes: &[u8]) -> bool {
        match self {
            Self::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            Self::Png => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
            Self::Gif => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
            Self::Webp => bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
            Self::Avif => {
                bytes.len() >= 12
                    && &bytes[4..8] == b"ftyp"
                    && matches!(&bytes[8..12], b"avif" | b"avis")
            }
        }
    }
}

/// Validate an upload before sending it anywhere.
///
/// # Errors
///
/// Returns the first check the file fails.
pub fn validate_image(bytes: &[u8], declared_mime: &str) -> Result<ImageKind, ImageStoreError> {
    if bytes.is_empty() {
        return Err(ImageStoreError::Empty);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageStoreError::TooLarge {
            max: MAX_IMAGE_BYTES,
        });
    }
    let kind = ImageKind::from_mime(declared_mime)
        .ok_or_else(|| ImageStoreError::UnsupportedType(declared_mime.to_string()))?;
    if !kind.matches_magic(bytes) {
        return Err(ImageStoreError::ContentMismatch(kind.mime()));
    }
    Ok(kind)
}

/// A stored image as returned to the admin editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub public_id: String,
    pub secure_url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

impl CloudinaryClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, ImageStoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        })
    }

    /// Upload an image into the configured folder.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad files, or an HTTP/API error if the
    /// store rejects or cannot be reached.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        declared_mime: &str,
        file_name: &str,
    ) -> Result<UploadedImage, ImageStoreError> {
        let kind = validate_image(&bytes, declared_mime)?;
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let mut params = BTreeMap::new();
        params.insert("folder", self.folder.clone());
        params.insert("timestamp", timestamp);
        let signature = sign(&params, self.api_secret.expose_secret());

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(kind.mime())?;
        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let url = format!("{BASE_URL}/{}/image/upload", self.cloud_name);
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageStoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadedImage = response
            .json()
            .await
            .map_err(|e| ImageStoreError::Parse(e.to_string()))?;

        tracing::info!(public_id = %uploaded.public_id, "image uploaded");
        Ok(uploaded)
    }

    /// Delete an image. Returns `false` if the store did not know it.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn destroy(&self, public_id: &str) -> Result<bool, ImageStoreError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("timestamp", timestamp);
        let signature = sign(&params, self.api_secret.expose_secret());

        let mut form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let url = format!("{BASE_URL}/{}/image/destroy", self.cloud_name);
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageStoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| ImageStoreError::Parse(e.to_string()))?;

        tracing::info!(public_id, result = %body.result, "image destroy requested");
        Ok(body.result == "ok")
    }
}

impl std::fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("cloud_name", &self.cloud_name)
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

/// `sha256(k1=v1&k2=v2...secret)` over parameters in key order.
fn sign(params: &BTreeMap<&str, String>, secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
