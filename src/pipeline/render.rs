//! Document rasterisation: one JPEG preview per PDF page via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! Rendering runs on the blocking pool so the runtime's worker threads keep
//! serving uploads and store calls.
//!
//! Pages are rendered at a fraction of their native size (0.5× by default) to
//! bound memory and upload size. All pages are materialised before returning,
//! in document order.

use crate::config::RenderProfile;
use crate::error::StorefrontError;
use crate::pipeline::input::check_pdf_magic;
use crate::pipeline::normalize::encode_jpeg;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// One rendered page.
#[derive(Clone, PartialEq)]
pub struct RenderedPage {
    /// 1-based page number.
    pub page_num: usize,
    /// JPEG-encoded raster.
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page_num", &self.page_num)
            .field("jpeg", &self.jpeg.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Turns a paginated document into one raster image per page.
#[async_trait]
pub trait DocumentRasterizer: Send + Sync {
    /// Render every page, pages `1..=N` in order.
    ///
    /// Fails with [`StorefrontError::DocumentParse`] for empty or non-PDF input.
    async fn rasterize_pages(
        &self,
        document: &[u8],
        profile: RenderProfile,
    ) -> Result<Vec<RenderedPage>, StorefrontError>;
}

/// [`DocumentRasterizer`] backed by a pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    /// Explicit library location; `None` uses the system library search path.
    lib_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to the pdfium library at `path` instead of the system one.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            lib_path: Some(path.into()),
        }
    }
}

#[async_trait]
impl DocumentRasterizer for PdfiumRasterizer {
    async fn rasterize_pages(
        &self,
        document: &[u8],
        profile: RenderProfile,
    ) -> Result<Vec<RenderedPage>, StorefrontError> {
        check_pdf_magic(document)?;

        let bytes = document.to_vec();
        let lib_path = self.lib_path.clone();

        tokio::task::spawn_blocking(move || render_pages_blocking(&bytes, lib_path, profile))
            .await
            .map_err(|e| StorefrontError::Internal(format!("Render task panicked: {}", e)))?
    }
}

fn bind_pdfium(lib_path: Option<PathBuf>) -> Result<Pdfium, StorefrontError> {
    let bindings = match lib_path {
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| StorefrontError::RasterizerUnavailable(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    bytes: &[u8],
    lib_path: Option<PathBuf>,
    profile: RenderProfile,
) -> Result<Vec<RenderedPage>, StorefrontError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| StorefrontError::DocumentParse(format!("{:?}", e)))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(profile.scale);

    let mut results = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            StorefrontError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        let jpeg = encode_jpeg(&image, profile.quality).map_err(|e| {
            StorefrontError::RasterisationFailed {
                page: page_num,
                detail: e.to_string(),
            }
        })?;
        debug!(
            "Rendered page {} → {}x{} px, {} bytes",
            page_num,
            image.width(),
            image.height(),
            jpeg.len()
        );

        results.push(RenderedPage {
            page_num,
            jpeg,
            width: image.width(),
            height: image.height(),
        });
    }

    Ok(results)
}
