//! Process-local [`DocumentStore`].
//!
//! Documents live in insertion order per collection so query results are
//! deterministic, which the storefront's stable sorts rely on in tests.

use super::{Document, DocumentStore, StoreError, StoredDocument};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory document store with uuid ids.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<StoredDocument>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document under a caller-chosen id, replacing any existing one.
    pub fn insert_with_id(&self, collection: &str, id: &str, doc: Document) {
        let mut cols = self.lock();
        let docs = cols.entry(collection.to_string()).or_default();
        docs.retain(|d| d.id != id);
        docs.push(StoredDocument {
            id: id.to_string(),
            fields: doc,
        });
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.lock().get(collection).map_or(0, Vec::len)
    }

    /// True when the collection holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<StoredDocument>>> {
        // Every mutation is a single push/retain, so a poisoned map is intact.
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(&self, collection: &str, doc: Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                fields: doc,
            });
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self
            .lock()
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self
            .lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.fields.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        if let Some(docs) = self.lock().get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_get_query_delete() {
        let store = InMemoryDocumentStore::new();
        let a = store
            .create("products", doc(json!({"storeId": "s1", "name": "a"})))
            .await
            .unwrap();
        let _b = store
            .create("products", doc(json!({"storeId": "s2", "name": "b"})))
            .await
            .unwrap();
        let c = store
            .create("products", doc(json!({"storeId": "s1", "name": "c"})))
            .await
            .unwrap();

        let got = store.get("products", &a).await.unwrap().unwrap();
        assert_eq!(got.fields["name"], "a");

        let s1 = store
            .query_eq("products", "storeId", &json!("s1"))
            .await
            .unwrap();
        let ids: Vec<_> = s1.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec![a.as_str(), c.as_str()]);

        store.delete("products", &a).await.unwrap();
        assert!(store.get("products", &a).await.unwrap().is_none());
        assert_eq!(store.len("products"), 2);

        // Missing ids and collections are fine.
        store.delete("products", "nope").await.unwrap();
        store.delete("nothing", "nope").await.unwrap();
    }

    #[tokio::test]
    async fn insert_with_id_replaces() {
        let store = InMemoryDocumentStore::new();
        store.insert_with_id("stores", "s1", doc(json!({"name": "old"})));
        store.insert_with_id("stores", "s1", doc(json!({"name": "new"})));
        assert_eq!(store.len("stores"), 1);
        let got = store.get("stores", "s1").await.unwrap().unwrap();
        assert_eq!(got.fields["name"], "new");
    }
}
