//! Remote asset upload: encoded image bytes → public URL.
//!
//! The hosting service speaks the ImgBB upload protocol: a multipart POST with
//! the image in an `image` field, optionally authenticated by a `key` query
//! parameter, answered with
//!
//! ```json
//! { "success": true, "data": { "url": "https://…" } }
//! { "success": false, "error": { "message": "Invalid API v1 key." } }
//! ```
//!
//! The uploader itself never retries; [`upload_with_retry`] wraps any
//! [`AssetUploader`] with the orchestrator's retry policy.

use crate::config::UploadConfig;
use crate::error::StorefrontError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Sends one image to a hosting service and returns its public URL.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Upload `image` (already normalised). Each call is independent: a
    /// repeated upload of the same bytes yields a new URL.
    async fn upload(&self, image: &[u8]) -> Result<String, StorefrontError>;
}

/// [`AssetUploader`] for ImgBB-compatible endpoints (or a proxy in front of one).
#[derive(Debug, Clone)]
pub struct ImgbbUploader {
    client: reqwest::Client,
    config: UploadConfig,
}

impl ImgbbUploader {
    pub fn new(config: UploadConfig) -> Result<Self, StorefrontError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorefrontError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl AssetUploader for ImgbbUploader {
    async fn upload(&self, image: &[u8]) -> Result<String, StorefrontError> {
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name("image.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| StorefrontError::Internal(format!("multipart: {e}")))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let mut request = self.client.post(&self.config.endpoint).multipart(form);
        if let Some(ref key) = self.config.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StorefrontError::Network(format!(
                    "upload timed out after {}s",
                    self.config.timeout_secs
                ))
            } else {
                StorefrontError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorefrontError::Network(e.to_string()))?;

        let url = parse_upload_response(status.as_u16(), &body)?;
        debug!("Uploaded {} bytes → {}", image.len(), url);
        Ok(url)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadData>,
    error: Option<UploadErrorBody>,
}

#[derive(Deserialize)]
struct UploadData {
    url: String,
}

#[derive(Deserialize)]
struct UploadErrorBody {
    message: Option<String>,
}

/// Interpret the hosting service's reply.
///
/// A `success: false` body wins over the HTTP status because it carries the
/// service's own reason.
pub fn parse_upload_response(status: u16, body: &str) -> Result<String, StorefrontError> {
    let parsed: UploadResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(_) => {
            let snippet: String = body.chars().take(200).collect();
            return Err(StorefrontError::Upload {
                reason: format!("HTTP {status}: {snippet}"),
            });
        }
    };

    match (parsed.success, parsed.data) {
        (true, Some(data)) if !data.url.is_empty() => Ok(data.url),
        _ => Err(StorefrontError::Upload {
            reason: parsed
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("Upload failed (HTTP {status})")),
        }),
    }
}

/// Upload with up to `retries` extra attempts and exponential backoff.
///
/// Returns the URL and the number of attempts made, or the last error and the
/// attempt count.
pub async fn upload_with_retry(
    uploader: &dyn AssetUploader,
    image: &[u8],
    retries: u32,
    backoff_ms: u64,
) -> Result<(String, u32), (StorefrontError, u32)> {
    let mut attempt: u32 = 0;
    loop {
        if attempt > 0 {
            let backoff = backoff_ms.saturating_mul(2u64.saturating_pow(attempt - 1));
            warn!("Upload retry {}/{} after {}ms", attempt, retries, backoff);
            sleep(Duration::from_millis(backoff)).await;
        }

        match uploader.upload(image).await {
            Ok(url) => return Ok((url, attempt + 1)),
            Err(e) if attempt < retries => {
                warn!("Upload attempt {} failed: {}", attempt + 1, e);
                attempt += 1;
            }
            Err(e) => return Err((e, attempt + 1)),
        }
    }
}
