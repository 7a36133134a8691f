//! Error types for the storefront-ingest library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StorefrontError`]: **Fatal** for the call that returns it: missing
//!   input, a malformed asset in single-item mode, an unreachable store.
//!   Returned as `Err(StorefrontError)` from the top-level operations.
//!
//! * [`ItemError`]: **Non-fatal**: one item of a bulk or document batch
//!   failed but the rest of the batch carried on. Stored inside
//!   [`crate::output::ItemOutcome`] so callers can see exactly which items
//!   made it into the catalog.
//!
//! Batches are not transactional. An item that fails after its image was
//! uploaded leaves the hosted asset behind; both error types carry the
//! orphaned URL so the caller can decide what to do with it.

use thiserror::Error;

/// All fatal errors returned by the storefront-ingest library.
///
/// Per-item batch failures use [`ItemError`] and are stored in
/// [`crate::output::ItemOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum StorefrontError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Required input was missing or malformed. Raised before any remote call.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A source file could not be read from disk or downloaded.
    #[error("Failed to read '{source_name}': {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    // ── Asset errors ──────────────────────────────────────────────────────
    /// The image could not be decoded or re-encoded.
    #[error("Image encoding failed: {0}")]
    Encoding(String),

    /// The document is empty, not a PDF, or could not be parsed.
    #[error("Document could not be parsed: {0}")]
    DocumentParse(String),

    /// A single page failed to render after the document was opened.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// No pdfium library could be bound.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    RasterizerUnavailable(String),

    // ── Remote errors ─────────────────────────────────────────────────────
    /// The hosting service answered but reported failure.
    #[error("Upload rejected: {reason}")]
    Upload { reason: String },

    /// Transport-level failure talking to a remote service.
    #[error("Network error: {0}")]
    Network(String),

    /// The catalog record could not be written. If the image had already been
    /// uploaded its URL is kept in `orphaned_url`.
    #[error(
        "Failed to persist catalog record: {detail}{}",
        .orphaned_url
            .as_ref()
            .map(|u| format!(" (uploaded image left at {u})"))
            .unwrap_or_default()
    )]
    Persistence {
        detail: String,
        orphaned_url: Option<String>,
    },

    /// The requested store or product does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    // ── Orchestration errors ──────────────────────────────────────────────
    /// Another batch is still being processed by this orchestrator.
    #[error("A batch is already in progress ({done}/{total} items processed)")]
    Busy { done: usize, total: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorefrontError {
    /// Attach an already-uploaded asset URL to a failed catalog write.
    ///
    /// A network failure at this point is reported as a persistence failure
    /// so the URL is not lost.
    pub(crate) fn with_orphan(self, url: &str) -> Self {
        match self {
            StorefrontError::Persistence { detail, .. } => StorefrontError::Persistence {
                detail,
                orphaned_url: Some(url.to_string()),
            },
            StorefrontError::Network(msg) => StorefrontError::Persistence {
                detail: format!("document store unreachable: {msg}"),
                orphaned_url: Some(url.to_string()),
            },
            other => other,
        }
    }
}

/// A non-fatal error for a single batch item.
///
/// `index` is the 1-based position of the item within its batch.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The source image could not be normalised.
    #[error("Item {index}: image could not be prepared: {detail}")]
    Normalize { index: usize, detail: String },

    /// The hosting service rejected the image or could not be reached.
    #[error("Item {index}: upload failed after {attempts} attempt(s): {detail}")]
    Upload {
        index: usize,
        attempts: u32,
        detail: String,
    },

    /// The image was uploaded but the catalog record was not written.
    #[error("Item {index}: catalog write failed: {detail}")]
    Persist {
        index: usize,
        detail: String,
        orphaned_url: String,
    },

    /// The batch was cancelled before this item started.
    #[error("Item {index}: cancelled before processing")]
    Cancelled { index: usize },
}

impl ItemError {
    /// 1-based item position within the batch.
    pub fn index(&self) -> usize {
        match self {
            ItemError::Normalize { index, .. }
            | ItemError::Upload { index, .. }
            | ItemError::Persist { index, .. }
            | ItemError::Cancelled { index } => *index,
        }
    }

    /// URL of an uploaded asset that has no catalog record, if any.
    pub fn orphaned_url(&self) -> Option<&str> {
        match self {
            ItemError::Persist { orphaned_url, .. } => Some(orphaned_url),
            _ => None,
        }
    }
}
