//! Document routing by shard key.
//!
//! Reads each document's millisecond-epoch route field, maps it to the
//! UTC calendar month, assigns the document `id`, and groups documents per
//! shard. Input order is preserved inside each group. Documents that
//! cannot be routed are reported individually and left out of every group.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::datasets::Dataset;
use crate::error::IngestError;
use crate::models::Document;
use crate::naming::ShardKey;

/// Documents grouped by shard, plus per-document routing errors.
#[derive(Debug, Default)]
pub struct RoutedBatch {
    pub shards: BTreeMap<ShardKey, Vec<Document>>,
    pub errors: Vec<String>,
}

impl RoutedBatch {
    pub fn document_count(&self) -> usize {
        self.shards.values().map(Vec::len).sum()
    }
}

/// Route every document; `position` in error messages is the 0-based
/// index in `documents`.
pub fn route(documents: Vec<Document>, dataset: &Dataset) -> RoutedBatch {
    let mut batch = RoutedBatch::default();
    for (position, doc) in documents.into_iter().enumerate() {
        match route_one(doc, dataset) {
            Ok((key, doc)) => batch.shards.entry(key).or_default().push(doc),
            Err(e) => batch
                .errors
                .push(format!("Failed to route document at position {}: {}", position, e)),
        }
    }
    batch
}

/// Compute one document's shard key and set its `id`.
pub fn route_one(mut doc: Document, dataset: &Dataset) -> Result<(ShardKey, Document), IngestError> {
    let field = dataset.route_field;
    let millis = match doc.get(field) {
        None | Some(Value::Null) => {
            return Err(IngestError::Routing(format!("missing {}", field)));
        }
        Some(v) => epoch_millis(v)
            .ok_or_else(|| IngestError::Routing(format!("{} is not numeric: {}", field, v)))?,
    };
    let key = ShardKey::from_epoch_millis(millis)
        .ok_or_else(|| IngestError::Routing(format!("{} out of range: {}", field, millis)))?;

    let id = document_id(&doc, dataset.id_fields)?;
    doc.insert("id".to_string(), Value::String(id));
    Ok((key, doc))
}

fn epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        _ => None,
    }
}

/// Join the id fields' values with `_`.
fn document_id(doc: &Document, id_fields: &[&str]) -> Result<String, IngestError> {
    let mut parts = Vec::with_capacity(id_fields.len());
    for &field in id_fields {
        let part = match doc.get(field) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => return Err(IngestError::Routing(format!("missing {}", field))),
        };
        parts.push(part);
    }
    Ok(parts.join("_"))
}
