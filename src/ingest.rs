//! Batch ingestion pipeline.
//!
//! Drives one request through the stages
//!
//! ```text
//! Received → Preprocessed → Routed → Upserted → Responded
//! ```
//!
//! - **Received**: the body must be a JSON array of objects, otherwise the
//!   whole request fails.
//! - **Preprocessed**: monetary fields are decoded per document; a document
//!   whose field cannot be decoded is dropped and reported.
//! - **Routed**: documents are grouped by monthly shard.
//! - **Upserted**: each shard is written with one import call. Collections
//!   are never created here; a missing shard fails that shard only.
//! - **Responded**: successes and errors from every stage are aggregated.

use serde::Serialize;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::datasets::Dataset;
use crate::error::IngestError;
use crate::models::Document;
use crate::normalize::normalize_document;
use crate::router;
use crate::store::SearchStore;
use crate::upsert;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Ok,
    PartialSuccess,
    Error,
}

impl IngestStatus {
    pub fn http_code(self) -> u16 {
        match self {
            IngestStatus::Ok => 200,
            IngestStatus::PartialSuccess => 207,
            IngestStatus::Error => 500,
        }
    }
}

/// Body of an ingestion response.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub status: IngestStatus,
    pub message: String,
    pub response_time: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Documents Typesense accepted.
    #[serde(skip)]
    pub processed: usize,
}

/// Run one batch end to end. Never fails: request-level errors become an
/// `error` response.
pub async fn ingest(
    store: &dyn SearchStore,
    dataset: &Dataset,
    body: &[u8],
    pid: Uuid,
) -> IngestResponse {
    let start = Instant::now();

    match process(store, dataset, body, &pid).await {
        Ok((processed, errors)) => {
            let secs = start.elapsed().as_secs_f64();
            let message = format!(
                "[PID:{}] Total response time: Completed {} document(s) in {:.2}sec",
                pid, processed, secs
            );
            info!(%pid, dataset = dataset.name, processed, errors = errors.len(), "{}", message);
            let status = if errors.is_empty() {
                IngestStatus::Ok
            } else {
                IngestStatus::PartialSuccess
            };
            IngestResponse {
                status,
                message,
                response_time: format_response_time(secs),
                errors,
                processed,
            }
        }
        Err(e) => failed(dataset, &e, start, &pid),
    }
}

/// Response for a request that failed before any document was processed.
pub fn failed(dataset: &Dataset, err: &IngestError, start: Instant, pid: &Uuid) -> IngestResponse {
    error!(%pid, dataset = dataset.name, "ingestion failed: {}", err);
    IngestResponse {
        status: IngestStatus::Error,
        message: err.to_string(),
        response_time: format_response_time(start.elapsed().as_secs_f64()),
        errors: Vec::new(),
        processed: 0,
    }
}

async fn process(
    store: &dyn SearchStore,
    dataset: &Dataset,
    body: &[u8],
    pid: &Uuid,
) -> Result<(usize, Vec<String>), IngestError> {
    // Received
    let payloads: Vec<Document> = serde_json::from_slice(body)?;
    let received = payloads.len();

    // Preprocessed
    let stage = Instant::now();
    let mut errors = Vec::new();
    let mut documents = Vec::with_capacity(received);
    for (position, mut doc) in payloads.into_iter().enumerate() {
        match normalize_document(&mut doc, dataset) {
            Ok(()) => documents.push(doc),
            Err(e) => errors.push(format!(
                "Failed to decode document at position {}: {}",
                position,
                IngestError::from(e)
            )),
        }
    }

    // Routed
    let routed = router::route(documents, dataset);
    errors.extend(routed.errors);
    info!(
        %pid,
        received,
        shards = routed.shards.len(),
        rejected = errors.len(),
        elapsed_ms = stage.elapsed().as_millis() as u64,
        "pre-processed batch"
    );

    // Upserted
    let mut processed = 0;
    for (key, documents) in &routed.shards {
        let collection = dataset.collection_name(key);
        match upsert::upsert(store, &collection, documents, pid).await {
            Ok(outcome) => {
                processed += outcome.succeeded;
                errors.extend(outcome.failures.iter().map(|f| f.message()));
            }
            Err(e) => {
                error!(%pid, collection = %collection, docs = documents.len(), "shard upsert failed: {}", e);
                errors.push(format!(
                    "Failed to upsert {} document(s) into {}: {}",
                    documents.len(),
                    collection,
                    e
                ));
            }
        }
    }

    Ok((processed, errors))
}

fn format_response_time(secs: f64) -> String {
    format!("{:.2} seconds", secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::TRANSACTION;
    use crate::memory::MemoryStore;
    use serde_json::json;

    const MARCH: i64 = 1_710_000_000_000;
    const APRIL: i64 = 1_712_600_000_000;

    fn store_with_shards() -> MemoryStore {
        let store = MemoryStore::new();
        for name in ["transaction_month__202403", "transaction_month__202404"] {
            store.insert_collection(TRANSACTION.schema(name));
        }
        store
    }

    async fn run(store: &MemoryStore, body: serde_json::Value) -> IngestResponse {
        let bytes = serde_json::to_vec(&body).unwrap();
        ingest(store, &TRANSACTION, &bytes, Uuid::new_v4()).await
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let store = store_with_shards();
        let resp = run(
            &store,
            json!([
                {"TRANID": 1, "CREATE_DATE": MARCH},
                {"TRANID": 2, "CREATE_DATE": APRIL}
            ]),
        )
        .await;
        assert_eq!(resp.status, IngestStatus::Ok);
        assert_eq!(resp.status.http_code(), 200);
        assert_eq!(resp.processed, 2);
        assert!(resp.errors.is_empty());
        assert!(resp.message.contains("Completed 2 document(s)"));
        assert!(resp.response_time.ends_with(" seconds"));
        assert_eq!(store.document_count("transaction_month__202403"), 1);
        assert_eq!(store.document_count("transaction_month__202404"), 1);
    }

    #[tokio::test]
    async fn test_k_of_n_rejected_is_partial_success() {
        let store = store_with_shards();
        store.reject_id("2");
        store.reject_id("4");
        let docs: Vec<_> = (1..=5)
            .map(|i| json!({"TRANID": i, "CREATE_DATE": MARCH}))
            .collect();
        let resp = run(&store, json!(docs)).await;

        assert_eq!(resp.status, IngestStatus::PartialSuccess);
        assert_eq!(resp.status.http_code(), 207);
        assert_eq!(resp.processed, 3);
        assert_eq!(resp.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_is_error() {
        let store = store_with_shards();
        let resp = ingest(&store, &TRANSACTION, b"[{\"TRANID\": 1,", Uuid::new_v4()).await;
        assert_eq!(resp.status, IngestStatus::Error);
        assert_eq!(resp.status.http_code(), 500);
        assert_eq!(resp.processed, 0);
        assert!(resp.errors.is_empty());
        assert!(resp.message.contains("invalid request body"));
    }

    #[tokio::test]
    async fn test_non_array_body_is_error() {
        let store = store_with_shards();
        let resp = run(&store, json!({"TRANID": 1})).await;
        assert_eq!(resp.status, IngestStatus::Error);
    }

    #[tokio::test]
    async fn test_decode_failure_is_scoped_to_document() {
        let store = store_with_shards();
        let resp = run(
            &store,
            json!([
                {"TRANID": 1, "CREATE_DATE": MARCH, "BILL_AMT": "MDk="},
                {"TRANID": 2, "CREATE_DATE": MARCH, "BILL_AMT": "!!not-base64!!"}
            ]),
        )
        .await;
        assert_eq!(resp.status, IngestStatus::PartialSuccess);
        assert_eq!(resp.processed, 1);
        assert_eq!(resp.errors.len(), 1);
        assert!(resp.errors[0].contains("BILL_AMT"));
        let stored = store.document("transaction_month__202403", "1").unwrap();
        assert!((stored["BILL_AMT"].as_f64().unwrap() - 123.45).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_overflowing_amount_drops_document() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        let mut payload = vec![0xffu8; 130];
        payload[0] = 0x7f;
        let store = store_with_shards();
        let resp = run(
            &store,
            json!([
                {"TRANID": 1, "CREATE_DATE": MARCH},
                {"TRANID": 2, "CREATE_DATE": MARCH, "BILL_AMT": STANDARD.encode(&payload)}
            ]),
        )
        .await;
        assert_eq!(resp.status, IngestStatus::PartialSuccess);
        assert_eq!(resp.processed, 1);
        assert!(resp.errors[0].contains("position 1"));
        assert!(store.document("transaction_month__202403", "2").is_none());
    }

    #[tokio::test]
    async fn test_missing_shard_is_not_created() {
        let store = MemoryStore::new();
        store.insert_collection(TRANSACTION.schema("transaction_month__202403"));
        let resp = run(
            &store,
            json!([
                {"TRANID": 1, "CREATE_DATE": MARCH},
                {"TRANID": 2, "CREATE_DATE": APRIL},
                {"TRANID": 3, "CREATE_DATE": APRIL}
            ]),
        )
        .await;
        assert_eq!(resp.status, IngestStatus::PartialSuccess);
        assert_eq!(resp.processed, 1);
        assert_eq!(resp.errors.len(), 1);
        assert!(resp.errors[0].contains("transaction_month__202404"));
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_routing_errors_reported() {
        let store = store_with_shards();
        let resp = run(
            &store,
            json!([{"TRANID": 1, "CREATE_DATE": MARCH}, {"TRANID": 2}]),
        )
        .await;
        assert_eq!(resp.status, IngestStatus::PartialSuccess);
        assert_eq!(resp.processed, 1);
        assert!(resp.errors[0].contains("CREATE_DATE"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_ok() {
        let store = store_with_shards();
        let resp = run(&store, json!([])).await;
        assert_eq!(resp.status, IngestStatus::Ok);
        assert_eq!(resp.processed, 0);
    }

    #[test]
    fn test_response_serialization_omits_empty_errors() {
        let resp = IngestResponse {
            status: IngestStatus::PartialSuccess,
            message: "m".into(),
            response_time: "0.01 seconds".into(),
            errors: vec![],
            processed: 3,
        };
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["status"], "partial_success");
        assert!(v.get("errors").is_none());
        assert!(v.get("processed").is_none());
    }
}
