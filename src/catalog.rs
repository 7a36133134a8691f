//! Loading stores and their products from the document store.

use crate::error::StorefrontError;
use crate::model::{normalize_handle, Product, Store, PRODUCTS, STORES};
use crate::pipeline::write::read_error;
use crate::store::{DocumentStore, StoredDocument};
use crate::view::{SkippedRecord, Storefront, ViewQuery};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Products of one store, plus the records that could not be read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductListing {
    pub products: Vec<Product>,
    pub skipped: Vec<SkippedRecord>,
}

/// Read access to stores and products.
#[derive(Clone)]
pub struct CatalogReader {
    store: Arc<dyn DocumentStore>,
}

impl CatalogReader {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Look a store up by id, then by handle.
    ///
    /// The handle lookup tries the value as given, then its normalised form,
    /// so a pasted `"Football House"` finds `football-house`.
    pub async fn resolve_store(&self, id_or_handle: &str) -> Result<Store, StorefrontError> {
        let key = id_or_handle.trim();
        if key.is_empty() {
            return Err(StorefrontError::Validation("store id or handle is empty".into()));
        }

        if let Some(doc) = self.store.get(STORES, key).await.map_err(read_error)? {
            return decode_store(doc);
        }

        let normalized = normalize_handle(key);
        let mut candidates = vec![key.to_string()];
        if normalized != key {
            candidates.push(normalized);
        }
        for handle in candidates {
            let mut hits = self
                .store
                .query_eq(STORES, "handle", &Value::String(handle.clone()))
                .await
                .map_err(read_error)?;
            if hits.len() > 1 {
                warn!("Handle '{}' matches {} stores, using the first", handle, hits.len());
            }
            if !hits.is_empty() {
                debug!("Resolved handle '{}' → store {}", handle, hits[0].id);
                return decode_store(hits.swap_remove(0));
            }
        }

        Err(StorefrontError::NotFound {
            kind: "Store",
            id: key.to_string(),
        })
    }

    /// All products belonging to `store_id`, in store order.
    ///
    /// Records that cannot be decoded are left out of `products` and listed
    /// in `skipped`.
    pub async fn products_for(&self, store_id: &str) -> Result<ProductListing, StorefrontError> {
        let docs = self
            .store
            .query_eq(PRODUCTS, "storeId", &Value::String(store_id.to_string()))
            .await
            .map_err(read_error)?;
        let mut listing = ProductListing::default();
        for d in docs {
            let id = d.id.clone();
            match Product::from_document(d.id, d.fields) {
                Ok(p) => listing.products.push(p),
                Err(e) => {
                    warn!("Skipping malformed product {}: {}", id, e);
                    listing.skipped.push(SkippedRecord {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(listing)
    }

    /// Resolve a store and assemble its public view for `query` at `now`.
    pub async fn load_storefront(
        &self,
        id_or_handle: &str,
        query: &ViewQuery,
        now: DateTime<Utc>,
    ) -> Result<Storefront, StorefrontError> {
        let store = self.resolve_store(id_or_handle).await?;
        let listing = self.products_for(&store.id).await?;
        debug!(
            "Store {} has {} products ({} unreadable)",
            store.id,
            listing.products.len(),
            listing.skipped.len()
        );
        let mut storefront = Storefront::assemble(store, &listing.products, query, now);
        storefront.skipped = listing.skipped;
        Ok(storefront)
    }

    /// Fetch one product by id.
    pub async fn product(&self, product_id: &str) -> Result<Product, StorefrontError> {
        let doc = self
            .store
            .get(PRODUCTS, product_id)
            .await
            .map_err(read_error)?
            .ok_or_else(|| StorefrontError::NotFound {
                kind: "Product",
                id: product_id.to_string(),
            })?;
        Product::from_document(doc.id, doc.fields)
            .map_err(|e| StorefrontError::Persistence {
                detail: format!("malformed product record: {e}"),
                orphaned_url: None,
            })
    }
}

fn decode_store(doc: StoredDocument) -> Result<Store, StorefrontError> {
    Store::from_document(doc.id, doc.fields).map_err(|e| StorefrontError::Persistence {
        detail: format!("malformed store record: {e}"),
        orphaned_url: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use serde_json::json;

    fn obj(v: Value) -> crate::store::Document {
        v.as_object().cloned().unwrap()
    }

    fn seeded() -> Arc<InMemoryDocumentStore> {
        let mem = Arc::new(InMemoryDocumentStore::new());
        mem.insert_with_id(
            STORES,
            "abc123",
            obj(json!({ "name": "Football House", "handle": "football-house", "whatsapp": "919876543210" })),
        );
        mem
    }

    #[tokio::test]
    async fn resolves_by_id_and_handle() {
        let reader = CatalogReader::new(seeded());
        assert_eq!(reader.resolve_store("abc123").await.unwrap().id, "abc123");
        assert_eq!(reader.resolve_store("football-house").await.unwrap().id, "abc123");
        assert_eq!(reader.resolve_store("Football House").await.unwrap().id, "abc123");
    }

    #[tokio::test]
    async fn unknown_store_is_not_found() {
        let reader = CatalogReader::new(seeded());
        assert!(matches!(
            reader.resolve_store("nope").await,
            Err(StorefrontError::NotFound { kind: "Store", .. })
        ));
    }

    #[tokio::test]
    async fn malformed_products_are_skipped() {
        let mem = seeded();
        mem.insert_with_id(
            PRODUCTS,
            "p1",
            obj(json!({ "storeId": "abc123", "name": "Ball", "price": 300, "image": "u" })),
        );
        mem.insert_with_id(PRODUCTS, "p2", obj(json!({ "storeId": "abc123", "name": 5 })));
        let reader = CatalogReader::new(mem);
        let listing = reader.products_for("abc123").await.unwrap();
        assert_eq!(listing.products.len(), 1);
        assert_eq!(listing.products[0].id, "p1");
        assert_eq!(listing.skipped.len(), 1);
        assert_eq!(listing.skipped[0].id, "p2");
        assert!(!listing.skipped[0].reason.is_empty());
    }

    #[tokio::test]
    async fn storefront_reports_unreadable_products() {
        let mem = seeded();
        mem.insert_with_id(
            PRODUCTS,
            "p1",
            obj(json!({ "storeId": "abc123", "name": "Ball", "price": 300, "image": "u" })),
        );
        mem.insert_with_id(
            PRODUCTS,
            "p2",
            obj(json!({ "storeId": "abc123", "name": "Kit", "price": "450", "image": "u" })),
        );
        let reader = CatalogReader::new(mem);
        let sf = reader
            .load_storefront("football-house", &ViewQuery::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(sf.cards.len(), 1);
        assert_eq!(
            sf.skipped.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["p2"]
        );
    }
}
