//! Remote document storage, consumed as an opaque capability.
//!
//! The catalog only needs four operations on collection-style storage:
//! create with a generated id, get by id, equality query on one field, and
//! delete by id. No transactions; every write stands alone.
//!
//! * [`memory::InMemoryDocumentStore`]: process-local, used by tests
//! * [`firestore::FirestoreStore`]: Cloud Firestore over its REST API

pub mod firestore;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use firestore::FirestoreStore;
pub use memory::InMemoryDocumentStore;

/// A document body: top-level field name → JSON value.
pub type Document = serde_json::Map<String, Value>;

/// A document together with the id the store assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Document,
}

/// Failures reported by a [`DocumentStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("document store unreachable: {0}")]
    Transport(String),

    /// The store answered with an error.
    #[error("document store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The store answered with something we could not decode.
    #[error("malformed document store response: {0}")]
    Malformed(String),
}

/// Collection-style document storage keyed by generated ids.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert `doc` into `collection` and return its generated id.
    async fn create(&self, collection: &str, doc: Document) -> Result<String, StoreError>;

    /// Fetch one document. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// All documents whose `field` equals `value`.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Remove a document. Deleting a missing id is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
