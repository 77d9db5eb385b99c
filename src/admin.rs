//! Collection admin commands: list, schema, delete.

use anyhow::{Context, Result};
use tracing::info;

use crate::models::CollectionSummary;
use crate::store::{Lookup, SearchStore};

/// All collections with their document counts, sorted by name.
pub async fn collection_summaries(store: &dyn SearchStore) -> Result<Vec<CollectionSummary>> {
    let raw = store
        .list_collections()
        .await
        .context("Failed to list collections")?;
    let mut summaries = raw
        .into_iter()
        .map(serde_json::from_value::<CollectionSummary>)
        .collect::<Result<Vec<_>, _>>()
        .context("Unexpected collection listing")?;
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(summaries)
}

pub async fn run_list(store: &dyn SearchStore) -> Result<()> {
    let summaries = collection_summaries(store).await?;
    println!("{:<40} {:>12}", "COLLECTION", "DOCUMENTS");
    println!("{}", "-".repeat(53));
    for s in &summaries {
        println!("{:<40} {:>12}", s.name, s.num_documents);
    }
    println!("{}", "-".repeat(53));
    println!("{} collection(s)", summaries.len());
    Ok(())
}

pub async fn run_schema(store: &dyn SearchStore, name: &str) -> Result<()> {
    match store
        .lookup_collection(name)
        .await
        .with_context(|| format!("Failed to retrieve collection '{}'", name))?
    {
        Lookup::Found(schema) => {
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Lookup::NotFound => anyhow::bail!("collection not found: {}", name),
    }
}

/// Delete one collection. Returns `false` when it did not exist.
pub async fn delete(store: &dyn SearchStore, name: &str) -> Result<bool> {
    match store.delete_collection(name).await {
        Ok(()) => {
            info!(collection = name, "collection deleted");
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            info!(collection = name, "collection not found, nothing to delete");
            Ok(false)
        }
        Err(e) => {
            Err(anyhow::Error::new(e).context(format!("Failed to delete collection '{}'", name)))
        }
    }
}
