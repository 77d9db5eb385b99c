//! Shard collection lifecycle.
//!
//! Each run keeps the previous, current and next month's shard of a
//! dataset present and drops the shard from two months ago. Both halves
//! are idempotent, so a daily schedule can rerun freely and two
//! overlapping runs converge on the same state.
//!
//! ```text
//!   stale      previous   current    next
//!  ───────┬──────────┬──────────┬──────────
//!  retire │  ensure  │  ensure  │  ensure
//! ```

use chrono::NaiveDate;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::datasets::{CollectionSchema, Dataset};
use crate::error::StoreError;
use crate::naming::LifecycleWindow;
use crate::store::{Lookup, SearchStore};

/// What [`ensure`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    AlreadyExists,
    Created,
}

/// What [`retire`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retired {
    Deleted,
    NotFound,
}

/// Create the collection unless it already exists.
///
/// Any error other than "not found" from the lookup, and any error from
/// the create call, is returned without retrying.
pub async fn ensure(
    store: &dyn SearchStore,
    schema: &CollectionSchema,
    pid: &Uuid,
) -> Result<Ensured, StoreError> {
    let name = &schema.name;
    let start = Instant::now();
    let lookup = store.lookup_collection(name).await.map_err(|e| {
        error!(%pid, collection = %name, elapsed_ms = elapsed_ms(start), "existence check failed: {}", e);
        e
    })?;

    match lookup {
        Lookup::Found(_) => {
            info!(%pid, collection = %name, elapsed_ms = elapsed_ms(start), "collection already exists");
            return Ok(Ensured::AlreadyExists);
        }
        Lookup::NotFound => {
            info!(%pid, collection = %name, elapsed_ms = elapsed_ms(start), "collection does not exist");
        }
    }

    let start = Instant::now();
    store.create_collection(schema).await.map_err(|e| {
        error!(%pid, collection = %name, elapsed_ms = elapsed_ms(start), "create failed: {}", e);
        e
    })?;
    info!(%pid, collection = %name, elapsed_ms = elapsed_ms(start), "collection created");
    Ok(Ensured::Created)
}

/// Delete the collection; a missing collection counts as done.
pub async fn retire(
    store: &dyn SearchStore,
    name: &str,
    pid: &Uuid,
) -> Result<Retired, StoreError> {
    let start = Instant::now();
    match store.delete_collection(name).await {
        Ok(()) => {
            info!(%pid, collection = %name, elapsed_ms = elapsed_ms(start), "collection deleted");
            Ok(Retired::Deleted)
        }
        Err(e) if e.is_not_found() => {
            info!(%pid, collection = %name, elapsed_ms = elapsed_ms(start), "collection not found, skipping delete");
            Ok(Retired::NotFound)
        }
        Err(e) => {
            error!(%pid, collection = %name, elapsed_ms = elapsed_ms(start), "delete failed: {}", e);
            Err(e)
        }
    }
}

/// Outcome of one dataset's lifecycle run.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleReport {
    pub dataset: &'static str,
    pub retired: (String, Retired),
    pub ensured: Vec<(String, Ensured)>,
}

/// Retire the stale shard of `dataset`, then ensure the three active ones.
///
/// Stops at the first failure.
pub async fn run(
    store: &dyn SearchStore,
    dataset: &Dataset,
    today: NaiveDate,
    pid: &Uuid,
) -> Result<LifecycleReport, StoreError> {
    let window = LifecycleWindow::for_date(today);

    let stale = dataset.collection_name(&window.stale);
    let retired = retire(store, &stale, pid).await?;

    let mut ensured = Vec::with_capacity(3);
    for key in window.active() {
        let name = dataset.collection_name(key);
        let outcome = ensure(store, &dataset.schema(&name), pid).await?;
        ensured.push((name, outcome));
    }

    Ok(LifecycleReport {
        dataset: dataset.name,
        retired: (stale, retired),
        ensured,
    })
}

/// Reports of the datasets that succeeded and the failures of the rest.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<LifecycleReport>,
    /// `"<dataset>: <error>"` for each dataset that failed.
    pub failures: Vec<String>,
}

impl RunSummary {
    /// Error naming every failed dataset, if any failed.
    pub fn check(&self) -> anyhow::Result<()> {
        if !self.failures.is_empty() {
            anyhow::bail!("lifecycle failed for {}", self.failures.join("; "));
        }
        Ok(())
    }
}

/// Run every dataset in turn. A failing dataset does not stop the others.
pub async fn run_all(
    store: &dyn SearchStore,
    datasets: &[Dataset],
    today: NaiveDate,
    pid: &Uuid,
) -> RunSummary {
    let start = Instant::now();
    let mut summary = RunSummary::default();

    for dataset in datasets {
        match run(store, dataset, today, pid).await {
            Ok(report) => summary.reports.push(report),
            Err(e) => {
                error!(%pid, dataset = dataset.name, "lifecycle run failed: {}", e);
                summary.failures.push(format!("{}: {}", dataset.name, e));
            }
        }
    }

    info!(
        %pid,
        ok = summary.reports.len(),
        failed = summary.failures.len(),
        elapsed_ms = elapsed_ms(start),
        "lifecycle run finished"
    );
    summary
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{STATUS_COUNT_MINS, TRANSACTION};
    use crate::memory::MemoryStore;

    fn june_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let store = MemoryStore::new();
        let pid = Uuid::new_v4();
        let schema = TRANSACTION.schema("transaction_month__202406");

        assert_eq!(ensure(&store, &schema, &pid).await.unwrap(), Ensured::Created);
        assert_eq!(
            ensure(&store, &schema, &pid).await.unwrap(),
            Ensured::AlreadyExists
        );
        assert_eq!(store.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_ensure_surfaces_lookup_errors() {
        let store = MemoryStore::new();
        store.set_outage(Some("connection refused"));
        let schema = TRANSACTION.schema("transaction_month__202406");

        let err = ensure(&store, &schema, &Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_retire_missing_is_ok() {
        let store = MemoryStore::new();
        let outcome = retire(&store, "transaction_month__202001", &Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(outcome, Retired::NotFound);
    }

    #[tokio::test]
    async fn test_retire_surfaces_other_errors() {
        let store = MemoryStore::new();
        store.set_outage(Some("boom"));
        assert!(retire(&store, "x", &Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_run_window() {
        let store = MemoryStore::new();
        store.insert_collection(TRANSACTION.schema("transaction_month__202404"));
        store.insert_collection(TRANSACTION.schema("transaction_month__202406"));

        let report = run(&store, &TRANSACTION, june_15(), &Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(
            report.retired,
            ("transaction_month__202404".to_string(), Retired::Deleted)
        );
        assert_eq!(
            report.ensured,
            vec![
                ("transaction_month__202405".to_string(), Ensured::Created),
                ("transaction_month__202406".to_string(), Ensured::AlreadyExists),
                ("transaction_month__202407".to_string(), Ensured::Created),
            ]
        );
        assert_eq!(
            store.collection_names(),
            vec![
                "transaction_month__202405",
                "transaction_month__202406",
                "transaction_month__202407",
            ]
        );
    }

    #[tokio::test]
    async fn test_run_twice_is_stable() {
        let store = MemoryStore::new();
        let pid = Uuid::new_v4();
        run(&store, &TRANSACTION, june_15(), &pid).await.unwrap();
        let before = store.collection_names();
        let second = run(&store, &TRANSACTION, june_15(), &pid).await.unwrap();

        assert_eq!(store.collection_names(), before);
        assert_eq!(store.create_calls(), 3);
        assert_eq!(store.delete_calls(), 2);
        assert_eq!(second.retired.1, Retired::NotFound);
        assert!(second
            .ensured
            .iter()
            .all(|(_, e)| *e == Ensured::AlreadyExists));
    }

    #[tokio::test]
    async fn test_run_all_datasets() {
        let store = MemoryStore::new();
        let summary = run_all(
            &store,
            &[TRANSACTION, STATUS_COUNT_MINS],
            june_15(),
            &Uuid::new_v4(),
        )
        .await;
        summary.check().unwrap();
        assert_eq!(summary.reports.len(), 2);
        assert_eq!(store.collection_names().len(), 6);
        assert!(store
            .collection_names()
            .contains(&"status_count_mins_month__202407".to_string()));
    }

    #[tokio::test]
    async fn test_run_all_reports_failure() {
        let store = MemoryStore::new();
        store.set_outage(Some("down"));
        let summary = run_all(&store, &[TRANSACTION], june_15(), &Uuid::new_v4()).await;
        assert!(summary.reports.is_empty());
        let err = summary.check().unwrap_err();
        assert!(err.to_string().contains("transaction"));
    }

    #[tokio::test]
    async fn test_run_all_keeps_successful_reports() {
        let store = MemoryStore::new();
        // Only the transaction shards fail to create.
        store.fail_creates_with_prefix(Some("transaction_month__"));
        let summary = run_all(
            &store,
            &[TRANSACTION, STATUS_COUNT_MINS],
            june_15(),
            &Uuid::new_v4(),
        )
        .await;

        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].dataset, "status_count_mins");
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].starts_with("transaction:"));
        assert!(summary.check().is_err());
    }

    #[tokio::test]
    async fn test_ensure_surfaces_create_errors() {
        let store = MemoryStore::new();
        store.fail_creates_with_prefix(Some(""));
        let schema = TRANSACTION.schema("transaction_month__202406");

        let err = ensure(&store, &schema, &Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::Http { status: 500, .. }));
        assert_eq!(store.create_calls(), 0);
        assert!(store.collection_names().is_empty());
    }
}
