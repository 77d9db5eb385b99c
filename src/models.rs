//! Core data types that flow through ingestion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document as sent to Typesense: field name → JSON value.
pub type Document = Map<String, Value>;

/// A monetary field as it arrives on the wire.
///
/// Producers send either a plain JSON number or a base64 scaled decimal
/// (see [`crate::decimal`]).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MonetaryValue {
    Raw(f64),
    Encoded(String),
}

/// One line of a Typesense `documents/import` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Echo of the rejected document, present only on failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl ImportResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            document: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            document: None,
        }
    }
}

/// A document the store rejected, with the store's reason verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFailure {
    pub id: String,
    pub reason: String,
}

/// Tally of one shard's upsert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShardOutcome {
    pub collection: String,
    pub succeeded: usize,
    pub failures: Vec<DocumentFailure>,
}

/// Summary row for `collections list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub name: String,
    #[serde(default)]
    pub num_documents: u64,
}
