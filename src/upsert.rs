//! Per-shard upsert executor.
//!
//! Sends one shard's documents to Typesense in a single import call and
//! tallies the per-document results. Failed documents are not retried.

use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Document, DocumentFailure, ShardOutcome};
use crate::store::SearchStore;

/// Upsert `documents` into `collection`.
///
/// `Err` means the whole call failed (connection error, timeout, missing
/// collection); no document of the shard was accounted for.
pub async fn upsert(
    store: &dyn SearchStore,
    collection: &str,
    documents: &[Document],
    pid: &Uuid,
) -> Result<ShardOutcome, StoreError> {
    let start = Instant::now();
    let results = store.import_documents(collection, documents).await?;

    let mut outcome = ShardOutcome {
        collection: collection.to_string(),
        ..ShardOutcome::default()
    };
    for (doc, result) in documents.iter().zip(results) {
        if result.success {
            outcome.succeeded += 1;
        } else {
            outcome.failures.push(DocumentFailure {
                id: doc
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("?")
                    .to_string(),
                reason: result.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
    }

    let elapsed_ms = start.elapsed().as_millis() as u64;
    if outcome.failures.is_empty() {
        info!(%pid, collection, docs = documents.len(), elapsed_ms, "upserted shard");
    } else {
        warn!(
            %pid,
            collection,
            succeeded = outcome.succeeded,
            failed = outcome.failures.len(),
            elapsed_ms,
            "upserted shard with failures"
        );
    }
    Ok(outcome)
}

impl DocumentFailure {
    /// Line reported in the ingestion response's `errors` list.
    pub fn message(&self) -> String {
        format!("Failed to upsert document {}: {}", self.id, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::TRANSACTION;
    use crate::memory::MemoryStore;
    use serde_json::json;

    fn doc(id: &str) -> Document {
        json!({"id": id, "TRANID": 1}).as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_tally_partial_failures() {
        let store = MemoryStore::new();
        store.insert_collection(TRANSACTION.schema("c"));
        store.reject_id("2");

        let outcome = upsert(&store, "c", &[doc("1"), doc("2"), doc("3")], &Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, "2");
        assert!(outcome.failures[0].message().starts_with("Failed to upsert document 2:"));
        assert_eq!(store.document_count("c"), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = MemoryStore::new();
        store.insert_collection(TRANSACTION.schema("c"));
        let pid = Uuid::new_v4();
        upsert(&store, "c", &[doc("1")], &pid).await.unwrap();

        let mut updated = doc("1");
        updated.insert("STATUS".into(), json!("settled"));
        upsert(&store, "c", &[updated], &pid).await.unwrap();

        assert_eq!(store.document_count("c"), 1);
        assert_eq!(store.document("c", "1").unwrap()["STATUS"], "settled");
    }

    #[tokio::test]
    async fn test_missing_collection_is_shard_failure() {
        let store = MemoryStore::new();
        let err = upsert(&store, "nope", &[doc("1")], &Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.create_calls(), 0);
    }
}
