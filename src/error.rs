//! Error taxonomy for the ingestion pipeline and the store client.
//!
//! Request-level errors ([`IngestError::Auth`], [`IngestError::Parse`],
//! [`IngestError::Body`])
//! abort a request. Decode and routing errors are scoped to a single
//! document and end up in the response's `errors` list. [`StoreError`]
//! covers everything that can go wrong talking to Typesense.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid API Key")]
    Auth,

    #[error("invalid request body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read request body: {0}")]
    Body(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Routing(String),
}

/// A monetary field's encoded text could not be turned into a number.
#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("invalid base64 in decimal field: {0}")]
    Base64(String),

    #[error("decimal value does not fit in a float")]
    OutOfRange,

    #[error("field {field}: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<DecodeError>,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    NotFound(String),

    #[error("typesense returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request to typesense timed out")]
    Timeout,

    #[error("typesense transport error: {0}")]
    Transport(String),

    #[error("invalid typesense response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}
