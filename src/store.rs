//! Storage abstraction over the external search engine.
//!
//! The [`SearchStore`] trait covers the collection-admin and
//! document-import calls this service needs. [`TypesenseClient`](crate::typesense::TypesenseClient)
//! talks to a real cluster; [`MemoryStore`](crate::memory::MemoryStore)
//! backs the tests.
//!
//! Implementations must be `Send + Sync`: a single handle is built at
//! startup and shared across all requests.
//!
//! | Method | Typesense call |
//! |--------|----------------|
//! | [`lookup_collection`](SearchStore::lookup_collection) | `GET /collections/{name}` |
//! | [`create_collection`](SearchStore::create_collection) | `POST /collections` |
//! | [`delete_collection`](SearchStore::delete_collection) | `DELETE /collections/{name}` |
//! | [`list_collections`](SearchStore::list_collections) | `GET /collections` |
//! | [`import_documents`](SearchStore::import_documents) | `POST /collections/{name}/documents/import?action=upsert` |

use async_trait::async_trait;
use serde_json::Value;

use crate::datasets::CollectionSchema;
use crate::error::StoreError;
use crate::models::{Document, ImportResult};

/// Result of an existence check that reached the store.
///
/// Transport and server failures are reported through `Err`, so callers
/// see three outcomes: found, not found, or error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Value),
    NotFound,
}

#[async_trait]
pub trait SearchStore: Send + Sync {
    async fn lookup_collection(&self, name: &str) -> Result<Lookup, StoreError>;

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), StoreError>;

    /// Drop a collection. A missing collection is `Err(StoreError::NotFound)`.
    async fn delete_collection(&self, name: &str) -> Result<(), StoreError>;

    async fn list_collections(&self) -> Result<Vec<Value>, StoreError>;

    /// Upsert documents keyed by `id`.
    ///
    /// Returns one [`ImportResult`] per input document, in input order.
    /// An `Err` means the call as a whole failed and no per-document
    /// results are available.
    async fn import_documents(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<ImportResult>, StoreError>;
}
