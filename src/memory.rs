//! In-memory [`SearchStore`] for tests.
//!
//! Collections live in a `HashMap` behind `std::sync::RwLock`. Each
//! collection keeps its documents keyed by `id`, so imports behave as
//! upserts. Call counters let tests assert how often the lifecycle
//! manager created or deleted a collection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::datasets::CollectionSchema;
use crate::error::StoreError;
use crate::models::{Document, ImportResult};
use crate::store::{Lookup, SearchStore};

struct StoredCollection {
    schema: CollectionSchema,
    docs: BTreeMap<String, Document>,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, StoredCollection>>,
    /// Document ids the store will reject on import.
    rejected_ids: RwLock<HashSet<String>>,
    /// When set, every call fails with this transport error.
    outage: RwLock<Option<String>>,
    /// When set, creating a collection whose name starts with this fails.
    failing_creates: RwLock<Option<String>>,
    creates: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any imported document with this `id`.
    pub fn reject_id(&self, id: impl Into<String>) {
        self.rejected_ids.write().unwrap().insert(id.into());
    }

    pub fn set_outage(&self, message: Option<&str>) {
        *self.outage.write().unwrap() = message.map(String::from);
    }

    /// Fail `create_collection` for names with this prefix; other calls work.
    pub fn fail_creates_with_prefix(&self, prefix: Option<&str>) {
        *self.failing_creates.write().unwrap() = prefix.map(String::from);
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .and_then(|c| c.docs.get(id).cloned())
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map(|c| c.docs.len())
            .unwrap_or(0)
    }

    /// Seed a collection without counting it as a create call.
    pub fn insert_collection(&self, schema: CollectionSchema) {
        self.collections.write().unwrap().insert(
            schema.name.clone(),
            StoredCollection {
                schema,
                docs: BTreeMap::new(),
            },
        );
    }

    fn check_outage(&self) -> Result<(), StoreError> {
        match self.outage.read().unwrap().as_ref() {
            Some(msg) => Err(StoreError::Transport(msg.clone())),
            None => Ok(()),
        }
    }
}

fn describe(c: &StoredCollection) -> Value {
    json!({
        "name": c.schema.name,
        "fields": c.schema.fields,
        "default_sorting_field": c.schema.default_sorting_field,
        "num_documents": c.docs.len(),
    })
}

#[async_trait]
impl SearchStore for MemoryStore {
    async fn lookup_collection(&self, name: &str) -> Result<Lookup, StoreError> {
        self.check_outage()?;
        Ok(match self.collections.read().unwrap().get(name) {
            Some(c) => Lookup::Found(describe(c)),
            None => Lookup::NotFound,
        })
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), StoreError> {
        self.check_outage()?;
        if let Some(prefix) = self.failing_creates.read().unwrap().as_ref() {
            if schema.name.starts_with(prefix.as_str()) {
                return Err(StoreError::Http {
                    status: 500,
                    body: format!("Could not create collection `{}`.", schema.name),
                });
            }
        }
        let mut collections = self.collections.write().unwrap();
        if collections.contains_key(&schema.name) {
            return Err(StoreError::Http {
                status: 409,
                body: format!("A collection with name `{}` already exists.", schema.name),
            });
        }
        collections.insert(
            schema.name.clone(),
            StoredCollection {
                schema: schema.clone(),
                docs: BTreeMap::new(),
            },
        );
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        self.check_outage()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        match self.collections.write().unwrap().remove(name) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }

    async fn list_collections(&self) -> Result<Vec<Value>, StoreError> {
        self.check_outage()?;
        let collections = self.collections.read().unwrap();
        let mut out: Vec<Value> = collections.values().map(describe).collect();
        out.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
        Ok(out)
    }

    async fn import_documents(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<ImportResult>, StoreError> {
        self.check_outage()?;
        let rejected = self.rejected_ids.read().unwrap().clone();
        let mut collections = self.collections.write().unwrap();
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(collection.to_string()))?;

        let results = documents
            .iter()
            .map(|doc| match doc.get("id").and_then(|v| v.as_str()) {
                Some(id) if rejected.contains(id) => {
                    ImportResult::failed(format!("Document `{}` was rejected.", id))
                }
                Some(id) => {
                    target.docs.insert(id.to_string(), doc.clone());
                    ImportResult::ok()
                }
                None => ImportResult::failed("Document is missing an `id` field."),
            })
            .collect();
        Ok(results)
    }
}
