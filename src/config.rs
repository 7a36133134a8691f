//! Configuration types for catalog ingestion and the remote services.
//!
//! Ingestion behaviour is controlled through [`IngestionConfig`], built via
//! its [`IngestionConfigBuilder`]. Connection settings for the two remote
//! collaborators live in [`UploadConfig`] and [`FirestoreConfig`] so the
//! ingestion knobs can be shared and tested without any credentials around.

use crate::error::StorefrontError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size/quality bound applied before an image is uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageProfile {
    /// Longest edge after scaling, in pixels. Smaller images are never upscaled.
    pub max_dimension: u32,
    /// Lossy codec quality as a fraction in `(0, 1]`.
    pub quality: f32,
}

impl ImageProfile {
    /// Product photos: 800 px, quality 0.7.
    pub const PRODUCT: ImageProfile = ImageProfile {
        max_dimension: 800,
        quality: 0.7,
    };

    /// Store logos: 400 px, quality 0.8.
    pub const LOGO: ImageProfile = ImageProfile {
        max_dimension: 400,
        quality: 0.8,
    };
}

/// How document pages are rasterised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderProfile {
    /// Multiplier on the page's native size. Default: 0.5.
    pub scale: f32,
    /// JPEG quality for the rendered page, fraction in `(0, 1]`. Default: 0.8.
    pub quality: f32,
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self {
            scale: 0.5,
            quality: 0.8,
        }
    }
}

/// Flat markup applied to every ingested price when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBoost {
    pub enabled: bool,
    pub amount: f64,
}

impl Default for PriceBoost {
    fn default() -> Self {
        Self {
            enabled: false,
            amount: 50.0,
        }
    }
}

impl PriceBoost {
    /// `base + amount` when enabled, `base` otherwise.
    pub fn apply(&self, base: f64) -> f64 {
        if self.enabled {
            base + self.amount
        } else {
            base
        }
    }
}

/// Configuration for catalog ingestion.
///
/// Built via [`IngestionConfig::builder()`] or using
/// [`IngestionConfig::default()`].
///
/// # Example
/// ```rust
/// use storefront_ingest::IngestionConfig;
///
/// let config = IngestionConfig::builder()
///     .auto_boost(true)
///     .upload_retries(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.price_boost.apply(100.0), 150.0);
/// ```
#[derive(Clone)]
pub struct IngestionConfig {
    /// Profile for product photos. Default: [`ImageProfile::PRODUCT`].
    pub product_image: ImageProfile,

    /// Profile for store logos. Default: [`ImageProfile::LOGO`].
    pub logo_image: ImageProfile,

    /// Page rasterisation settings for document mode.
    pub page_render: RenderProfile,

    /// Price markup policy. Default: disabled, 50.
    pub price_boost: PriceBoost,

    /// Extra upload attempts per item after the first failure. Default: 0.
    ///
    /// Every retry sends the same normalised bytes again. If an earlier
    /// attempt actually landed, the hosted copy from that attempt is orphaned.
    pub upload_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Receives per-item events during a batch.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            product_image: ImageProfile::PRODUCT,
            logo_image: ImageProfile::LOGO,
            page_render: RenderProfile::default(),
            price_boost: PriceBoost::default(),
            upload_retries: 0,
            retry_backoff_ms: 500,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IngestionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionConfig")
            .field("product_image", &self.product_image)
            .field("logo_image", &self.logo_image)
            .field("page_render", &self.page_render)
            .field("price_boost", &self.price_boost)
            .field("upload_retries", &self.upload_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn IngestionProgressCallback>"),
            )
            .finish()
    }
}

impl IngestionConfig {
    /// Create a new builder for `IngestionConfig`.
    pub fn builder() -> IngestionConfigBuilder {
        IngestionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IngestionConfig`].
#[derive(Debug)]
pub struct IngestionConfigBuilder {
    config: IngestionConfig,
}

impl IngestionConfigBuilder {
    pub fn product_image(mut self, profile: ImageProfile) -> Self {
        self.config.product_image = profile;
        self
    }

    pub fn logo_image(mut self, profile: ImageProfile) -> Self {
        self.config.logo_image = profile;
        self
    }

    pub fn page_render(mut self, profile: RenderProfile) -> Self {
        self.config.page_render = profile;
        self
    }

    pub fn auto_boost(mut self, enabled: bool) -> Self {
        self.config.price_boost.enabled = enabled;
        self
    }

    pub fn boost_amount(mut self, amount: f64) -> Self {
        self.config.price_boost.amount = amount;
        self
    }

    pub fn upload_retries(mut self, n: u32) -> Self {
        self.config.upload_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestionConfig, StorefrontError> {
        let c = &self.config;
        for (label, p) in [("product", c.product_image), ("logo", c.logo_image)] {
            validate_quality(label, p.quality)?;
            if p.max_dimension == 0 {
                return Err(StorefrontError::InvalidConfig(format!(
                    "{label} max dimension must be ≥ 1"
                )));
            }
        }
        validate_quality("page render", c.page_render.quality)?;
        if !(c.page_render.scale > 0.0 && c.page_render.scale <= 4.0) {
            return Err(StorefrontError::InvalidConfig(format!(
                "page render scale must be in (0, 4], got {}",
                c.page_render.scale
            )));
        }
        if !(c.price_boost.amount.is_finite() && c.price_boost.amount >= 0.0) {
            return Err(StorefrontError::InvalidConfig(format!(
                "boost amount must be a non-negative number, got {}",
                c.price_boost.amount
            )));
        }
        Ok(self.config)
    }
}

fn validate_quality(label: &str, q: f32) -> Result<(), StorefrontError> {
    if q > 0.0 && q <= 1.0 {
        Ok(())
    } else {
        Err(StorefrontError::InvalidConfig(format!(
            "{label} quality must be in (0, 1], got {q}"
        )))
    }
}

// ── Remote services ──────────────────────────────────────────────────────

/// Default image-hosting endpoint (ImgBB-compatible API).
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.imgbb.com/1/upload";

/// Connection settings for the asset hosting service.
///
/// With `api_key = None` the endpoint is treated as a credential-holding
/// proxy: no key is sent from this process.
#[derive(Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Per-request timeout in seconds. Default: 60.
    pub timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Default Firestore REST base URL.
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Connection settings for the Firestore document store.
#[derive(Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    pub base_url: String,
    /// Per-request timeout in seconds. Default: 30.
    pub timeout_secs: u64,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: None,
            bearer_token: None,
            base_url: DEFAULT_FIRESTORE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
