//! Persisted record shapes: [`Store`] and [`Product`].
//!
//! Records travel to and from the document store as JSON field maps with
//! camelCase keys (`storeId`, `createdAt`, `themeColor`, …). The document id is
//! not a field; it is attached after a read.

use crate::store::Document;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Collection holding [`Store`] documents.
pub const STORES: &str = "stores";

/// Collection holding [`Product`] documents.
pub const PRODUCTS: &str = "products";

/// Theme colour used when a store has not picked one.
pub const DEFAULT_THEME_COLOR: &str = "#6366f1";

/// A seller's catalog namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    /// Public alias for `id`; see [`normalize_handle`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Messaging-service phone identifier, country code included.
    #[serde(default)]
    pub whatsapp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Store {
    /// Decode a stored document, attaching its id.
    pub fn from_document(id: impl Into<String>, doc: Document) -> Result<Self, serde_json::Error> {
        let mut store: Store = serde_json::from_value(serde_json::Value::Object(doc))?;
        store.id = id.into();
        Ok(store)
    }

    /// The handle if set, else the raw id. Used to build the public link.
    pub fn public_slug(&self) -> &str {
        self.handle
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(&self.id)
    }

    /// Phone number reduced to digits, as the deep-link scheme expects.
    pub fn whatsapp_digits(&self) -> String {
        self.whatsapp.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(skip)]
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lowercase, trimmed. `None` and `Some("")` are both possible in stored
    /// data and are kept distinct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Decode a stored document, attaching its id.
    pub fn from_document(id: impl Into<String>, doc: Document) -> Result<Self, serde_json::Error> {
        let mut product: Product = serde_json::from_value(serde_json::Value::Object(doc))?;
        product.id = id.into();
        Ok(product)
    }
}

/// Attributes for a product that has not been written yet.
///
/// The image must already be hosted; `image` is its public URL.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: String,
}

impl NewProduct {
    /// Build the record that will be stored for `store_id` at `created_at`.
    pub fn into_product(self, store_id: &str, created_at: DateTime<Utc>) -> Product {
        Product {
            id: String::new(),
            store_id: store_id.to_string(),
            name: self.name,
            price: self.price,
            description: self.description,
            category: self.category,
            image: self.image,
            created_at: Some(created_at),
        }
    }
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalise a store handle: lowercase, whitespace runs become `-`.
pub fn normalize_handle(raw: &str) -> String {
    RE_WHITESPACE
        .replace_all(&raw.to_lowercase(), "-")
        .into_owned()
}

/// Normalise a category: lowercase and trimmed. Blank input means no category.
pub fn normalize_category(raw: &str) -> Option<String> {
    let c = raw.trim().to_lowercase();
    if c.is_empty() {
        None
    } else {
        Some(c)
    }
}

/// Render a price the way the storefront shows it: whole amounts without
/// decimals, fractional amounts as-is.
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 && price.abs() < 1e15 {
        format!("{}", price as i64)
    } else {
        format!("{price}")
    }
}
