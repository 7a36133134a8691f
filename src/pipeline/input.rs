//! Input resolution: turn a user-supplied path or URL into bytes plus a filename.
//!
//! Both image sources and catalog documents go through here. The filename is
//! kept because bulk mode names products after it and document mode quotes it
//! in every page's description.

use crate::error::StorefrontError;
use std::path::Path;
use tracing::{debug, info};

/// A source asset held in memory.
#[derive(Clone, PartialEq)]
pub struct SourceFile {
    /// Bare filename, no directories (`"red-shirt.jpg"`).
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Product name derived from the filename; see [`item_name_from_filename`].
    pub fn item_name(&self) -> String {
        item_name_from_filename(&self.filename)
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("filename", &self.filename)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read a local file or download a URL.
pub async fn read_source(input: &str, timeout_secs: u64) -> Result<SourceFile, StorefrontError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Everything before the first `.` of the filename, so `"red.shirt.jpg"`
/// becomes `"red"`. Falls back to the whole filename when that would be empty.
pub fn item_name_from_filename(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    match base.split('.').next() {
        Some(stem) if !stem.trim().is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

/// Reject anything that does not start with the `%PDF` magic bytes.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), StorefrontError> {
    if bytes.is_empty() {
        return Err(StorefrontError::DocumentParse("document is empty".into()));
    }
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let magic: Vec<u8> = bytes.iter().take(4).copied().collect();
        return Err(StorefrontError::DocumentParse(format!(
            "not a PDF (first bytes: {magic:?})"
        )));
    }
    Ok(())
}

async fn read_local(path: &Path) -> Result<SourceFile, StorefrontError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        let reason = match e.kind() {
            std::io::ErrorKind::NotFound => "file not found".to_string(),
            std::io::ErrorKind::PermissionDenied => "permission denied".to_string(),
            _ => e.to_string(),
        };
        StorefrontError::SourceUnavailable {
            source_name: path.display().to_string(),
            reason,
        }
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceFile { filename, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceFile, StorefrontError> {
    info!("Downloading source from: {}", url);

    let unavailable = |reason: String| StorefrontError::SourceUnavailable {
        source_name: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| unavailable(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            unavailable(format!("timed out after {timeout_secs}s"))
        } else {
            unavailable(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(unavailable(format!("HTTP {}", response.status())));
    }

    let filename = extract_filename(url);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| unavailable(e.to_string()))?;

    debug!("Downloaded {} ({} bytes)", filename, bytes.len());
    Ok(SourceFile {
        filename,
        bytes: bytes.to_vec(),
    })
}

/// Last non-empty path segment of the URL, or `"download"`.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "download".to_string()
}
