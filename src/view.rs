//! Storefront read path: filter, sort and decorate a store's products.
//!
//! Everything here is pure. Callers pass the current time explicitly so the
//! "new" badge is deterministic under test.

use crate::error::StorefrontError;
use crate::model::{format_price, Product, Store, DEFAULT_THEME_COLOR};
use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How long after creation a product keeps its "new" badge.
pub const NEW_BADGE_WINDOW_HOURS: i64 = 7 * 24;

/// Category sentinel meaning "no category filter".
pub const ALL_CATEGORIES: &str = "all";

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Latest `createdAt` first; products without a timestamp go last.
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl FromStr for SortMode {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(SortMode::Newest),
            "price-asc" => Ok(SortMode::PriceAsc),
            "price-desc" => Ok(SortMode::PriceDesc),
            other => Err(StorefrontError::Validation(format!(
                "unknown sort mode '{other}' (expected newest, price-asc or price-desc)"
            ))),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortMode::Newest => "newest",
            SortMode::PriceAsc => "price-asc",
            SortMode::PriceDesc => "price-desc",
        })
    }
}

/// Selected category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    /// Exact match; products without a category only pass [`CategoryFilter::All`].
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => product.category.as_deref() == Some(c.as_str()),
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(s: &str) -> Self {
        if s == ALL_CATEGORIES {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(s.to_string())
        }
    }
}

/// The shopper's current search/filter/sort controls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewQuery {
    pub search: String,
    pub category: CategoryFilter,
    pub sort: SortMode,
}

impl ViewQuery {
    pub fn new(search: impl Into<String>, category: impl Into<CategoryFilter>, sort: SortMode) -> Self {
        Self {
            search: search.into(),
            category: category.into(),
            sort,
        }
    }
}

/// Case-insensitive substring match on name or description.
pub fn matches_search(product: &Product, search: &str) -> bool {
    let needle = search.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    product.name.to_lowercase().contains(&needle)
        || product
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
}

/// Filter `products` by search text AND category, then sort stably.
pub fn view<'a>(products: &'a [Product], query: &ViewQuery) -> Vec<&'a Product> {
    let mut out: Vec<&Product> = products
        .iter()
        .filter(|p| matches_search(p, &query.search) && query.category.matches(p))
        .collect();
    sort_products(&mut out, query.sort);
    out
}

/// Stable sort in place; equal keys keep their relative order.
pub fn sort_products(products: &mut [&Product], mode: SortMode) {
    match mode {
        SortMode::Newest => products.sort_by(|a, b| created_millis(b).cmp(&created_millis(a))),
        SortMode::PriceAsc => products.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortMode::PriceDesc => products.sort_by(|a, b| b.price.total_cmp(&a.price)),
    }
}

fn created_millis(p: &Product) -> i64 {
    p.created_at.map_or(0, |t| t.timestamp_millis())
}

/// `"all"` followed by each distinct non-empty category, in first-seen order.
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut out = vec![ALL_CATEGORIES.to_string()];
    for c in products.iter().filter_map(|p| p.category.as_deref()) {
        if !c.is_empty() && !out.iter().any(|seen| seen == c) {
            out.push(c.to_string());
        }
    }
    out
}

/// Created less than [`NEW_BADGE_WINDOW_HOURS`] before `now`.
pub fn is_new(product: &Product, now: DateTime<Utc>) -> bool {
    product
        .created_at
        .is_some_and(|t| now - t < Duration::hours(NEW_BADGE_WINDOW_HOURS))
}

/// Text of the order message sent to the store.
pub fn order_message(store: &Store, product: &Product, page_url: &str) -> String {
    format!(
        "Hi {}, I want to order:\n\n*{}*\nPrice: ₹{}\n\nLink: {}",
        store.name,
        product.name,
        format_price(product.price),
        page_url
    )
}

/// `https://wa.me/{digits}?text={message}` for the store's contact number.
pub fn order_link(store: &Store, product: &Product, page_url: &str) -> Result<Url, StorefrontError> {
    let digits = store.whatsapp_digits();
    if digits.is_empty() {
        return Err(StorefrontError::Validation(format!(
            "store '{}' has no WhatsApp number",
            store.name
        )));
    }
    let message = order_message(store, product, page_url);
    Url::parse_with_params(&format!("https://wa.me/{digits}"), &[("text", message)])
        .map_err(|e| StorefrontError::Internal(format!("order link: {e}")))
}

/// Colours a storefront is rendered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub color: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            color: DEFAULT_THEME_COLOR.to_string(),
        }
    }
}

impl Theme {
    /// The store's own colour, or the default when unset or blank.
    pub fn for_store(store: &Store) -> Self {
        store
            .theme_color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| Theme {
                color: c.to_string(),
            })
            .unwrap_or_default()
    }
}

/// One product as displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCard {
    pub product: Product,
    pub is_new: bool,
}

/// Everything needed to render a public storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storefront {
    pub store: Store,
    pub theme: Theme,
    /// Category choices for the filter control, `"all"` first.
    pub categories: Vec<String>,
    /// Filtered and sorted products.
    pub cards: Vec<ProductCard>,
    /// Stored products that could not be read and are not shown.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRecord>,
}

/// A product record left out of a storefront because it could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: String,
}

impl Storefront {
    pub fn assemble(
        store: Store,
        products: &[Product],
        query: &ViewQuery,
        now: DateTime<Utc>,
    ) -> Self {
        let cards = view(products, query)
            .into_iter()
            .map(|p| ProductCard {
                is_new: is_new(p, now),
                product: p.clone(),
            })
            .collect();
        Self {
            theme: Theme::for_store(&store),
            categories: categories(products),
            store,
            cards,
            skipped: Vec::new(),
        }
    }
}
