//! Typesense REST client.
//!
//! Implements [`SearchStore`] over `reqwest`. All requests carry the
//! `X-TYPESENSE-API-KEY` header and honor the configured connection
//! timeout; a timed-out call surfaces as [`StoreError::Timeout`].
//!
//! Document imports use the JSONL bulk endpoint with `action=upsert`,
//! which answers with one JSON object per input line.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::config::TypesenseConfig;
use crate::datasets::CollectionSchema;
use crate::error::StoreError;
use crate::models::{Document, ImportResult};
use crate::store::{Lookup, SearchStore};

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

/// Handle to one Typesense node.
#[derive(Debug, Clone)]
pub struct TypesenseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TypesenseClient {
    pub fn new(config: &TypesenseConfig) -> Result<Self, StoreError> {
        Self::with_timeout(config, Duration::from_secs(config.connection_timeout_secs))
    }

    /// Build a client with an explicit timeout, overriding the configured one.
    pub fn with_timeout(config: &TypesenseConfig, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn collection_url(&self, name: &str) -> String {
        self.url(&format!("/collections/{}", name))
    }
}

/// Map a non-success response to a [`StoreError`].
async fn error_for(resp: Response, collection: &str) -> StoreError {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return StoreError::NotFound(collection.to_string());
    }
    let body = resp.text().await.unwrap_or_default();
    StoreError::Http {
        status: status.as_u16(),
        body: extract_message(&body),
    }
}

/// Typesense errors are `{"message": "..."}`; fall back to the raw body.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

/// Serialize documents as newline-delimited JSON.
pub fn to_jsonl(documents: &[Document]) -> Result<String, StoreError> {
    let mut out = String::new();
    for doc in documents {
        let line = serde_json::to_string(doc)
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Parse a JSONL import response, one [`ImportResult`] per non-blank line.
pub fn parse_import_response(body: &str) -> Result<Vec<ImportResult>, StoreError> {
    body.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            serde_json::from_str::<ImportResult>(l)
                .map_err(|e| StoreError::InvalidResponse(format!("{}: {}", e, l)))
        })
        .collect()
}

#[async_trait]
impl SearchStore for TypesenseClient {
    async fn lookup_collection(&self, name: &str) -> Result<Lookup, StoreError> {
        let resp = self
            .http
            .get(self.collection_url(name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        if !resp.status().is_success() {
            return Err(error_for(resp, name).await);
        }
        Ok(Lookup::Found(resp.json().await?))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), StoreError> {
        let resp = self
            .http
            .post(self.url("/collections"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(schema)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_for(resp, &schema.name).await);
        }
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let resp = self
            .http
            .delete(self.collection_url(name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_for(resp, name).await);
        }
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<Value>, StoreError> {
        let resp = self
            .http
            .get(self.url("/collections"))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_for(resp, "*").await);
        }
        Ok(resp.json().await?)
    }

    async fn import_documents(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<ImportResult>, StoreError> {
        let body = to_jsonl(documents)?;
        let resp = self
            .http
            .post(format!("{}/documents/import", self.collection_url(collection)))
            .query(&[("action", "upsert")])
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_for(resp, collection).await);
        }

        let text = resp.text().await?;
        let results = parse_import_response(&text)?;
        if results.len() != documents.len() {
            return Err(StoreError::InvalidResponse(format!(
                "expected {} import results, got {}",
                documents.len(),
                results.len()
            )));
        }
        Ok(results)
    }
}
