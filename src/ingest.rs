//! Ingestion entry points: manual, bulk-image and document-catalog modes.
//!
//! Every mode drives the same per-item pipeline:
//!
//! ```text
//! normalize (or rasterise) ──▶ upload ──▶ write
//! ```
//!
//! Manual mode is a single item; any failure is returned as a
//! [`StorefrontError`]. Batch modes process items strictly one at a time and
//! keep going past a failed item, recording an [`ItemOutcome`] per item in the
//! returned [`BatchReport`]. Nothing is rolled back.

use crate::config::{ImageProfile, IngestionConfig};
use crate::error::{ItemError, StorefrontError};
use crate::model::{normalize_category, NewProduct, Product};
use crate::output::{BatchReport, BatchState, ItemOutcome};
use crate::pipeline::input::SourceFile;
use crate::pipeline::normalize::{self, NormalizedImage};
use crate::pipeline::render::{DocumentRasterizer, RenderedPage};
use crate::pipeline::upload::{upload_with_retry, AssetUploader};
use crate::pipeline::write::CatalogWriter;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A single product entered by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualProduct {
    pub name: String,
    /// Price as typed; parsed with [`parse_price`].
    pub price: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image: Option<SourceFile>,
}

/// Rasterised pages of a catalog document, ready to be ingested.
#[derive(Debug, Clone)]
pub struct DocumentPreview {
    /// Quoted in every page's description.
    pub filename: String,
    /// Pages `1..=N` in document order.
    pub pages: Vec<RenderedPage>,
}

impl DocumentPreview {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Submission is only possible once at least one page rendered.
    pub fn is_ready(&self) -> bool {
        !self.pages.is_empty()
    }
}

/// Parse a user-entered price. Blank, non-numeric, non-finite and negative
/// input is rejected.
pub fn parse_price(raw: &str) -> Result<f64, StorefrontError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StorefrontError::Validation("price is required".into()));
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| StorefrontError::Validation(format!("price '{trimmed}' is not a number")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(StorefrontError::Validation(format!(
            "price must be a non-negative number, got {trimmed}"
        )));
    }
    Ok(value)
}

/// Bytes a batch item enters the pipeline with.
enum Payload<'a> {
    /// Arbitrary source image; normalised before upload.
    Raw(&'a [u8]),
    /// Already encoded for upload (a rendered page).
    Encoded(&'a [u8]),
}

struct BatchItem<'a> {
    name: String,
    description: Option<String>,
    payload: Payload<'a>,
}

/// Drives the ingestion pipeline for one store.
///
/// One batch runs at a time per orchestrator; starting another while one is
/// in flight fails with [`StorefrontError::Busy`].
pub struct IngestionOrchestrator {
    store_id: String,
    rasterizer: Arc<dyn DocumentRasterizer>,
    uploader: Arc<dyn AssetUploader>,
    writer: Arc<dyn CatalogWriter>,
    config: IngestionConfig,
    state: Mutex<BatchState>,
    cancel: Option<CancellationToken>,
}

impl IngestionOrchestrator {
    pub fn new(
        store_id: impl Into<String>,
        rasterizer: Arc<dyn DocumentRasterizer>,
        uploader: Arc<dyn AssetUploader>,
        writer: Arc<dyn CatalogWriter>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            rasterizer,
            uploader,
            writer,
            config,
            state: Mutex::new(BatchState::Idle),
            cancel: None,
        }
    }

    /// Stop batches early when `token` is cancelled. Items already in flight
    /// finish; the rest are reported as [`ItemError::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    /// Current batch lifecycle state.
    pub fn state(&self) -> BatchState {
        *self.lock_state()
    }

    /// Apply the configured price boost.
    pub fn final_price(&self, base: f64) -> f64 {
        self.config.price_boost.apply(base)
    }

    // ── Manual mode ──────────────────────────────────────────────────────

    /// Create one product from hand-entered attributes.
    ///
    /// The image is checked first: without it no remote call is made.
    pub async fn ingest_manual(&self, input: ManualProduct) -> Result<Product, StorefrontError> {
        let image = input
            .image
            .ok_or_else(|| StorefrontError::Validation("product image is required".into()))?;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(StorefrontError::Validation("product name is required".into()));
        }
        let price = self.final_price(parse_price(&input.price)?);

        info!("Adding product '{}' to store {}", name, self.store_id);

        let normalized = normalize_blocking(image.bytes, self.config.product_image).await?;
        let (url, _) = upload_with_retry(
            self.uploader.as_ref(),
            &normalized.bytes,
            self.config.upload_retries,
            self.config.retry_backoff_ms,
        )
        .await
        .map_err(|(e, _)| e)?;

        let product = NewProduct {
            name,
            price,
            description: input.description.filter(|d| !d.trim().is_empty()),
            category: input.category.as_deref().and_then(normalize_category),
            image: url.clone(),
        };
        self.writer
            .create_product(&self.store_id, product)
            .await
            .map_err(|e| {
                warn!("Product write failed, uploaded image orphaned: {}", url);
                e.with_orphan(&url)
            })
    }

    // ── Bulk-image mode ──────────────────────────────────────────────────

    /// Create one product per image, all at the same price. Each product is
    /// named after its file with the extension stripped.
    pub async fn ingest_bulk(
        &self,
        files: Vec<SourceFile>,
        price: &str,
    ) -> Result<BatchReport, StorefrontError> {
        let _batch = self.begin_batch()?;

        if files.is_empty() {
            return Err(StorefrontError::Validation(
                "at least one image is required".into(),
            ));
        }
        let price = self.final_price(parse_price(price)?);

        let items = files
            .iter()
            .map(|f| BatchItem {
                name: f.item_name(),
                description: None,
                payload: Payload::Raw(&f.bytes),
            })
            .collect();

        Ok(self.run_batch(items, price).await)
    }

    // ── Document mode ────────────────────────────────────────────────────

    /// Rasterise a catalog document into page previews.
    pub async fn preview_document(
        &self,
        document: &[u8],
        filename: impl Into<String>,
    ) -> Result<DocumentPreview, StorefrontError> {
        let filename = filename.into();
        let pages = self
            .rasterizer
            .rasterize_pages(document, self.config.page_render)
            .await?;
        info!("Previewed '{}': {} pages", filename, pages.len());
        Ok(DocumentPreview { filename, pages })
    }

    /// Create one product per previewed page, named `Catalog Item {n}`.
    ///
    /// A blank price means 0.
    pub async fn ingest_document(
        &self,
        preview: &DocumentPreview,
        price: &str,
    ) -> Result<BatchReport, StorefrontError> {
        let _batch = self.begin_batch()?;

        if !preview.is_ready() {
            return Err(StorefrontError::Validation(
                "document has no rendered pages".into(),
            ));
        }
        let base = if price.trim().is_empty() {
            0.0
        } else {
            parse_price(price)?
        };
        let price = self.final_price(base);

        let items = preview
            .pages
            .iter()
            .map(|p| BatchItem {
                name: format!("Catalog Item {}", p.page_num),
                description: Some(format!("Page {} of {}", p.page_num, preview.filename)),
                payload: Payload::Encoded(&p.jpeg),
            })
            .collect();

        Ok(self.run_batch(items, price).await)
    }

    // ── Store assets ─────────────────────────────────────────────────────

    /// Normalise a logo with the logo profile and upload it. Returns the URL.
    pub async fn upload_logo(&self, logo: SourceFile) -> Result<String, StorefrontError> {
        let normalized = normalize_blocking(logo.bytes, self.config.logo_image).await?;
        let (url, _) = upload_with_retry(
            self.uploader.as_ref(),
            &normalized.bytes,
            self.config.upload_retries,
            self.config.retry_backoff_ms,
        )
        .await
        .map_err(|(e, _)| e)?;
        info!("Uploaded logo for store {}: {}", self.store_id, url);
        Ok(url)
    }

    /// Remove a product record.
    pub async fn delete_product(&self, product_id: &str) -> Result<(), StorefrontError> {
        self.writer.delete_product(product_id).await?;
        info!("Deleted product {}", product_id);
        Ok(())
    }

    // ── Batch machinery ──────────────────────────────────────────────────

    fn lock_state(&self) -> MutexGuard<'_, BatchState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: BatchState) {
        *self.lock_state() = state;
    }

    fn begin_batch(&self) -> Result<BatchGuard<'_>, StorefrontError> {
        let mut state = self.lock_state();
        match *state {
            BatchState::Processing { done, total } => {
                return Err(StorefrontError::Busy { done, total })
            }
            BatchState::Validating => return Err(StorefrontError::Busy { done: 0, total: 0 }),
            _ => {}
        }
        *state = BatchState::Validating;
        Ok(BatchGuard { owner: self })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    async fn run_batch(&self, items: Vec<BatchItem<'_>>, price: f64) -> BatchReport {
        let start = Instant::now();
        let total = items.len();
        let cb = self.config.progress_callback.as_ref();

        info!(
            "Starting batch of {} items for store {} at price {}",
            total, self.store_id, price
        );
        self.set_state(BatchState::Processing { done: 0, total });
        if let Some(cb) = cb {
            cb.on_batch_start(total);
        }

        let mut outcomes = Vec::with_capacity(total);
        for (i, item) in items.into_iter().enumerate() {
            let index = i + 1;
            let outcome = if self.is_cancelled() {
                debug!("Item {} skipped: batch cancelled", index);
                ItemOutcome {
                    index,
                    name: item.name,
                    price,
                    image_url: None,
                    product_id: None,
                    error: Some(ItemError::Cancelled { index }),
                }
            } else {
                if let Some(cb) = cb {
                    cb.on_item_start(index, total, &item.name);
                }
                self.process_item(index, item, price).await
            };

            if let Some(cb) = cb {
                match (&outcome.error, &outcome.product_id) {
                    (Some(e), _) => cb.on_item_error(index, total, &e.to_string()),
                    (None, Some(id)) => cb.on_item_complete(index, total, id),
                    (None, None) => {}
                }
            }
            outcomes.push(outcome);
            self.set_state(BatchState::Processing { done: index, total });
        }

        let report = BatchReport {
            items: outcomes,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        self.set_state(report.final_state());

        info!(
            "Batch complete: {}/{} items created in {}ms",
            report.success_count(),
            total,
            report.duration_ms
        );
        if let Some(cb) = cb {
            cb.on_batch_complete(total, report.success_count());
        }
        report
    }

    async fn process_item(&self, index: usize, item: BatchItem<'_>, price: f64) -> ItemOutcome {
        let mut outcome = ItemOutcome {
            index,
            name: item.name.clone(),
            price,
            image_url: None,
            product_id: None,
            error: None,
        };

        // Step 1: normalise
        let normalized;
        let bytes: &[u8] = match item.payload {
            Payload::Encoded(b) => b,
            Payload::Raw(b) => match normalize_blocking(b.to_vec(), self.config.product_image).await
            {
                Ok(n) => {
                    normalized = n;
                    &normalized.bytes
                }
                Err(e) => {
                    warn!("Item {} ('{}') could not be normalised: {}", index, item.name, e);
                    outcome.error = Some(ItemError::Normalize {
                        index,
                        detail: e.to_string(),
                    });
                    return outcome;
                }
            },
        };

        // Step 2: upload
        let url = match upload_with_retry(
            self.uploader.as_ref(),
            bytes,
            self.config.upload_retries,
            self.config.retry_backoff_ms,
        )
        .await
        {
            Ok((url, attempts)) => {
                debug!("Item {} uploaded after {} attempt(s)", index, attempts);
                url
            }
            Err((e, attempts)) => {
                warn!("Item {} ('{}') upload failed: {}", index, item.name, e);
                outcome.error = Some(ItemError::Upload {
                    index,
                    attempts,
                    detail: e.to_string(),
                });
                return outcome;
            }
        };
        outcome.image_url = Some(url.clone());

        // Step 3: write
        let product = NewProduct {
            name: item.name,
            price,
            description: item.description,
            category: None,
            image: url.clone(),
        };
        match self.writer.create_product(&self.store_id, product).await {
            Ok(p) => {
                debug!("Item {} created as product {}", index, p.id);
                outcome.product_id = Some(p.id);
            }
            Err(e) => {
                warn!("Item {} write failed, orphaned asset {}: {}", index, url, e);
                outcome.error = Some(ItemError::Persist {
                    index,
                    detail: e.to_string(),
                    orphaned_url: url,
                });
            }
        }
        outcome
    }
}

/// Returns the orchestrator to `Idle` if a batch exits before reaching a
/// terminal state (validation failure).
struct BatchGuard<'a> {
    owner: &'a IngestionOrchestrator,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.owner.lock_state();
        if state.is_busy() {
            *state = BatchState::Idle;
        }
    }
}

async fn normalize_blocking(
    bytes: Vec<u8>,
    profile: ImageProfile,
) -> Result<NormalizedImage, StorefrontError> {
    tokio::task::spawn_blocking(move || normalize::normalize(&bytes, profile))
        .await
        .map_err(|e| StorefrontError::Internal(format!("Normalise task panicked: {}", e)))?
}
