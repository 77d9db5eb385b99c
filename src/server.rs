//! Ingestion HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/transaction` | Upsert a batch into `transaction_month__YYYYMM` shards |
//! | `POST` | `/status_count_mins` | Upsert a batch into `status_count_mins_month__YYYYMM` shards |
//! | `GET`  | `/health` | Health check |
//!
//! Ingestion routes require the shared secret in `X-API-Key`. The body is
//! a JSON array of records; the response is
//!
//! ```json
//! { "status": "partial_success", "message": "...", "response_time": "0.42 seconds",
//!   "errors": ["Failed to upsert document 7: ..."] }
//! ```
//!
//! with HTTP 200 (`ok`), 207 (`partial_success`) or 500 (`error`).

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{self, Config};
use crate::datasets::{self, Dataset};
use crate::error::IngestError;
use crate::ingest;
use crate::store::SearchStore;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The one Typesense handle of the process.
    pub store: Arc<dyn SearchStore>,
    /// Secret expected in `X-API-Key`.
    pub api_key: Arc<str>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn SearchStore>, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            api_key: api_key.into(),
            max_body_bytes: config::default_max_body_bytes(),
        }
    }

    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Build the router without binding a listener.
///
/// Bodies over `max_body_bytes` still get an ingestion-shaped `error`
/// response.
pub fn router(state: AppState) -> Router {
    let limit = state.max_body_bytes;
    Router::new()
        .route("/transaction", post(handle_transaction))
        .route("/status_count_mins", post(handle_status_count_mins))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: &Config, store: Arc<dyn SearchStore>) -> anyhow::Result<()> {
    let state = AppState::new(store, config.ingest_api_key())
        .with_body_limit(config.server.max_body_bytes);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "ingestion server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Errors ============

#[derive(Serialize)]
struct AuthErrorBody {
    detail: String,
}

/// Rejection for a missing or wrong `X-API-Key`.
struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = AuthErrorBody {
            detail: IngestError::Auth.to_string(),
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

fn authorize(headers: &HeaderMap, state: &AppState) -> Result<(), AuthRejection> {
    match headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        None => {
            warn!("API key not found");
            Err(AuthRejection)
        }
        Some(key) if !keys_match(key, &state.api_key) => {
            warn!("API key incorrect");
            Err(AuthRejection)
        }
        Some(_) => Ok(()),
    }
}

fn keys_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    given.len() == expected.len() && bool::from(given.ct_eq(expected))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ POST /<dataset> ============

async fn handle_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    handle_ingest(&state, &headers, &datasets::TRANSACTION, body).await
}

async fn handle_status_count_mins(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    handle_ingest(&state, &headers, &datasets::STATUS_COUNT_MINS, body).await
}

async fn handle_ingest(
    state: &AppState,
    headers: &HeaderMap,
    dataset: &Dataset,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start = Instant::now();
    if let Err(rejection) = authorize(headers, state) {
        return rejection.into_response();
    }

    let pid = Uuid::new_v4();
    let resp = match body {
        Ok(body) => ingest::ingest(state.store.as_ref(), dataset, &body, pid).await,
        Err(rejection) => {
            let err = IngestError::Body(rejection.body_text());
            ingest::failed(dataset, &err, start, &pid)
        }
    };
    let status = StatusCode::from_u16(resp.status.http_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(resp)).into_response()
}
