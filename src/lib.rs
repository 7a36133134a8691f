//! # storefront-ingest
//!
//! Catalog ingestion and storefront views for small online stores.
//!
//! Sellers add products one at a time, as a batch of photos sharing a price,
//! or by uploading a PDF catalog whose pages each become a product. Shoppers
//! browse the resulting catalog with search, category filter and sort, and
//! order through a pre-filled WhatsApp link.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source (image / PDF page)
//!  │
//!  ├─ 1. Input      read a local file or download from URL
//!  ├─ 2. Normalise  bound to 800 px and re-encode as JPEG (pages: rasterise at 0.5×)
//!  ├─ 3. Upload     post to the image host, get a public URL
//!  └─ 4. Write      create the product record in the document store
//! ```
//!
//! Batches run items one at a time and keep going past failures; the
//! [`BatchReport`] says which items made it and which hosted images were left
//! without a record.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storefront_ingest::{
//!     DocumentCatalogWriter, FirestoreConfig, FirestoreStore, ImgbbUploader,
//!     IngestionConfig, IngestionOrchestrator, PdfiumRasterizer, SourceFile, UploadConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(FirestoreStore::new(FirestoreConfig::new("my-project"))?);
//!     let orchestrator = IngestionOrchestrator::new(
//!         "store-id",
//!         Arc::new(PdfiumRasterizer::new()),
//!         Arc::new(ImgbbUploader::new(UploadConfig::default())?),
//!         Arc::new(DocumentCatalogWriter::new(store)),
//!         IngestionConfig::builder().auto_boost(true).build()?,
//!     );
//!
//!     let files = vec![SourceFile::new("shirt.jpg", std::fs::read("shirt.jpg")?)];
//!     let report = orchestrator.ingest_bulk(files, "200").await?;
//!     eprintln!("{}/{} created", report.success_count(), report.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `storefront` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! storefront-ingest = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! Document mode needs a pdfium shared library, found on the system library
//! path or via `PdfiumRasterizer::with_library`.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod view;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{CatalogReader, ProductListing};
pub use config::{
    FirestoreConfig, ImageProfile, IngestionConfig, IngestionConfigBuilder, PriceBoost,
    RenderProfile, UploadConfig,
};
pub use error::{ItemError, StorefrontError};
pub use ingest::{parse_price, DocumentPreview, IngestionOrchestrator, ManualProduct};
pub use model::{NewProduct, Product, Store};
pub use output::{BatchReport, BatchState, ItemOutcome};
pub use pipeline::input::{read_source, SourceFile};
pub use pipeline::render::{DocumentRasterizer, PdfiumRasterizer, RenderedPage};
pub use pipeline::upload::{AssetUploader, ImgbbUploader};
pub use pipeline::write::{CatalogWriter, DocumentCatalogWriter};
pub use progress::{IngestionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use store::{DocumentStore, FirestoreStore, InMemoryDocumentStore};
pub use view::{
    order_link, order_message, CategoryFilter, ProductCard, SkippedRecord, SortMode, Storefront, Theme,
    ViewQuery,
};
