//! # ts-shards
//!
//! Month-sharded collection lifecycle and ingestion for Typesense.
//!
//! Records are spread over one collection per calendar month
//! (`<prefix>YYYYMM`). A scheduled lifecycle job keeps the previous,
//! current and next month's shards present and drops the shard that has
//! aged out; an HTTP endpoint upserts batches into the right shard and
//! reports partial failures.
//!
//! ## Architecture
//!
//! ```text
//!  POST /transaction            tshard lifecycle (daily)
//!          │                              │
//!          ▼                              ▼
//!  ┌───────────────┐             ┌────────────────┐
//!  │ normalize     │             │ retire stale   │
//!  │ route by month│             │ ensure 3 months│
//!  │ upsert shards │             └───────┬────────┘
//!  └───────┬───────┘                     │
//!          └──────────┐   ┌──────────────┘
//!                     ▼   ▼
//!                ┌─────────────┐
//!                │ SearchStore │──▶ Typesense
//!                └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML + environment configuration |
//! | [`naming`] | Shard keys and the lifecycle month window |
//! | [`datasets`] | Static dataset descriptors and schemas |
//! | [`store`] | Storage trait over the search engine |
//! | [`typesense`] | Typesense REST client |
//! | [`memory`] | In-memory store for tests |
//! | [`lifecycle`] | Ensure / retire shard collections |
//! | [`decimal`] | Base64 scaled decimal codec |
//! | [`normalize`] | Monetary field normalization |
//! | [`router`] | Group documents by shard |
//! | [`upsert`] | Per-shard import and tally |
//! | [`ingest`] | Batch ingestion pipeline |
//! | [`server`] | HTTP server |
//! | [`admin`] | Collection admin commands |

pub mod admin;
pub mod config;
pub mod datasets;
pub mod decimal;
pub mod error;
pub mod ingest;
pub mod lifecycle;
pub mod logging;
pub mod memory;
pub mod models;
pub mod naming;
pub mod normalize;
pub mod router;
pub mod server;
pub mod store;
pub mod typesense;
pub mod upsert;
