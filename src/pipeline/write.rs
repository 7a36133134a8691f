//! Catalog persistence: one product record per successful item.

use crate::error::StorefrontError;
use crate::model::{NewProduct, Product, PRODUCTS};
use crate::store::{DocumentStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

/// Writes and removes product records for one store.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    /// Create a product for `store_id`, stamping `createdAt` with the current
    /// time. Returns the stored product with its new id.
    async fn create_product(
        &self,
        store_id: &str,
        product: NewProduct,
    ) -> Result<Product, StorefrontError>;

    /// Remove a product record. The hosted image is left in place.
    async fn delete_product(&self, product_id: &str) -> Result<(), StorefrontError>;
}

/// [`CatalogWriter`] on top of any [`DocumentStore`].
#[derive(Clone)]
pub struct DocumentCatalogWriter {
    store: Arc<dyn DocumentStore>,
}

impl DocumentCatalogWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CatalogWriter for DocumentCatalogWriter {
    async fn create_product(
        &self,
        store_id: &str,
        product: NewProduct,
    ) -> Result<Product, StorefrontError> {
        validate_new_product(store_id, &product)?;

        let mut record = product.into_product(store_id, Utc::now());
        let doc = match serde_json::to_value(&record) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(other) => {
                return Err(StorefrontError::Internal(format!(
                    "product serialised to non-object: {other}"
                )))
            }
            Err(e) => return Err(StorefrontError::Internal(e.to_string())),
        };

        let id = self
            .store
            .create(PRODUCTS, doc)
            .await
            .map_err(write_error)?;
        debug!("Created product {} in store {}", id, store_id);
        record.id = id;
        Ok(record)
    }

    async fn delete_product(&self, product_id: &str) -> Result<(), StorefrontError> {
        if product_id.trim().is_empty() {
            return Err(StorefrontError::Validation("product id is empty".into()));
        }
        self.store
            .delete(PRODUCTS, product_id)
            .await
            .map_err(write_error)
    }
}

fn validate_new_product(store_id: &str, p: &NewProduct) -> Result<(), StorefrontError> {
    if store_id.trim().is_empty() {
        return Err(StorefrontError::Validation("store id is empty".into()));
    }
    if p.name.trim().is_empty() {
        return Err(StorefrontError::Validation("product name is empty".into()));
    }
    if !(p.price.is_finite() && p.price >= 0.0) {
        return Err(StorefrontError::Validation(format!(
            "price must be a non-negative number, got {}",
            p.price
        )));
    }
    if p.image.trim().is_empty() {
        return Err(StorefrontError::Validation("image URL is empty".into()));
    }
    Ok(())
}

/// Any failed write is a persistence error, including an unreachable store,
/// so an already-uploaded image can be attached to it.
fn write_error(e: StoreError) -> StorefrontError {
    StorefrontError::Persistence {
        detail: e.to_string(),
        orphaned_url: None,
    }
}

/// Read failures: an unreachable store is a network error.
pub(crate) fn read_error(e: StoreError) -> StorefrontError {
    match e {
        StoreError::Transport(msg) => StorefrontError::Network(msg),
        other => StorefrontError::Persistence {
            detail: other.to_string(),
            orphaned_url: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;

    fn shirt() -> NewProduct {
        NewProduct {
            name: "Shirt".into(),
            price: 200.0,
            description: Some("Cotton".into()),
            category: Some("shirts".into()),
            image: "https://i.example/shirt.jpg".into(),
        }
    }

    #[tokio::test]
    async fn create_writes_camel_case_record() {
        let mem = Arc::new(InMemoryDocumentStore::new());
        let writer = DocumentCatalogWriter::new(mem.clone());

        let p = writer.create_product("s1", shirt()).await.unwrap();
        assert!(!p.id.is_empty());
        assert!(p.created_at.is_some());

        let stored = mem.get(PRODUCTS, &p.id).await.unwrap().unwrap();
        assert_eq!(stored.fields["storeId"], "s1");
        assert_eq!(stored.fields["category"], "shirts");
        assert!(stored.fields.contains_key("createdAt"));
    }

    #[tokio::test]
    async fn create_rejects_invalid_records() {
        let writer = DocumentCatalogWriter::new(Arc::new(InMemoryDocumentStore::new()));
        let mut bad = shirt();
        bad.image.clear();
        assert!(matches!(
            writer.create_product("s1", bad).await,
            Err(StorefrontError::Validation(_))
        ));
        let mut bad = shirt();
        bad.price = f64::NAN;
        assert!(writer.create_product("s1", bad).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let mem = Arc::new(InMemoryDocumentStore::new());
        let writer = DocumentCatalogWriter::new(mem.clone());
        let p = writer.create_product("s1", shirt()).await.unwrap();
        writer.delete_product(&p.id).await.unwrap();
        assert!(mem.is_empty(PRODUCTS));
    }

    #[test]
    fn read_transport_maps_to_network() {
        assert!(matches!(
            read_error(StoreError::Transport("dns".into())),
            StorefrontError::Network(_)
        ));
        assert!(matches!(
            read_error(StoreError::Rejected {
                status: 403,
                message: "denied".into()
            }),
            StorefrontError::Persistence { .. }
        ));
    }

    #[test]
    fn write_transport_is_persistence() {
        match write_error(StoreError::Transport("connection reset".into())) {
            StorefrontError::Persistence { detail, orphaned_url } => {
                assert!(detail.contains("unreachable"), "got: {detail}");
                assert!(detail.contains("connection reset"), "got: {detail}");
                assert!(orphaned_url.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
