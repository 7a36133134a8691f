//! Progress-callback trait for per-item batch events.
//!
//! Inject an [`Arc<dyn IngestionProgressCallback>`] via
//! [`crate::config::IngestionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through a bulk-image or document batch.
//! Manual single-item submissions do not emit events.
//!
//! # Example
//!
//! ```rust
//! use storefront_ingest::{IngestionConfig, IngestionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     created: AtomicUsize,
//! }
//!
//! impl IngestionProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize, product_id: &str) {
//!         self.created.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Item {}/{} → {}", index, total, product_id);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { created: AtomicUsize::new(0) });
//!
//! let config = IngestionConfig::builder()
//!     .progress_callback(counter as Arc<dyn IngestionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each batch item.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Items are processed one at a time, so calls never
/// overlap within a batch.
pub trait IngestionProgressCallback: Send + Sync {
    /// Called once after validation, before the first item.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before an item's image is normalised.
    ///
    /// # Arguments
    /// * `index`: 1-based position in the batch
    /// * `total`: batch size
    /// * `name`: product name the item will get
    fn on_item_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called after the item's catalog record was written.
    fn on_item_complete(&self, index: usize, total: usize, product_id: &str) {
        let _ = (index, total, product_id);
    }

    /// Called when an item fails at any stage.
    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every item has been attempted (or cancelled).
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl IngestionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::IngestionConfig`].
pub type ProgressCallback = Arc<dyn IngestionProgressCallback>;
