//! # tshard
//!
//! Operational CLI for month-sharded Typesense collections.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tshard serve` | Start the ingestion HTTP server |
//! | `tshard lifecycle` | Create upcoming shards and drop the stale one |
//! | `tshard collections list` | List collections with document counts |
//! | `tshard collections schema <name>` | Print a collection's schema |
//! | `tshard collections delete <name>` | Delete a collection |
//!
//! Connection settings come from `--config` (TOML, optional) and the
//! `TYPESENSE_ENDPOINT`, `TYPESENSE_PORT`, `TYPESENSE_API_KEY`
//! environment variables.

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use ts_shards::config::{self, Config};
use ts_shards::datasets;
use ts_shards::store::SearchStore;
use ts_shards::typesense::TypesenseClient;
use ts_shards::{admin, lifecycle, logging, server};

#[derive(Parser)]
#[command(
    name = "tshard",
    about = "Month-sharded collection lifecycle and ingestion for Typesense",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; environment variables
    /// override its values.
    #[arg(long, global = true, default_value = "./config/tshard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ingestion HTTP server.
    ///
    /// Serves `POST /transaction`, `POST /status_count_mins` and
    /// `GET /health` on `[server].bind`.
    Serve,

    /// Maintain the rolling monthly shards.
    ///
    /// Deletes the shard from two months ago and creates the previous,
    /// current and next month's shards when missing. Safe to rerun.
    Lifecycle {
        /// Dataset to maintain: `all`, `transaction` or `status_count_mins`.
        #[arg(long, default_value = "all")]
        dataset: String,

        /// Reference date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<String>,
    },

    /// Inspect or delete collections.
    Collections {
        #[command(subcommand)]
        action: CollectionsAction,
    },
}

#[derive(Subcommand)]
enum CollectionsAction {
    /// List all collections with document counts.
    List,
    /// Print the schema of one collection.
    Schema {
        name: String,
    },
    /// Delete one collection.
    Delete {
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging);

    match cli.command {
        Commands::Serve => {
            let store: Arc<dyn SearchStore> = Arc::new(TypesenseClient::new(&cfg.typesense)?);
            server::run_server(&cfg, store).await?;
        }
        Commands::Lifecycle { dataset, date } => {
            run_lifecycle(&cfg, &dataset, date.as_deref()).await?;
        }
        Commands::Collections { action } => {
            let store = TypesenseClient::new(&cfg.typesense)?;
            match action {
                CollectionsAction::List => admin::run_list(&store).await?,
                CollectionsAction::Schema { name } => admin::run_schema(&store, &name).await?,
                CollectionsAction::Delete { name } => {
                    if admin::delete(&store, &name).await? {
                        println!("Collection '{}' deleted.", name);
                    } else {
                        println!("Collection '{}' not found, nothing deleted.", name);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn run_lifecycle(cfg: &Config, dataset: &str, date: Option<&str>) -> anyhow::Result<()> {
    let today = match date {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .with_context(|| format!("Invalid --date '{}', expected YYYY-MM-DD", d))?,
        None => Utc::now().date_naive(),
    };

    let selected: Vec<datasets::Dataset> = if dataset == "all" {
        datasets::ALL.to_vec()
    } else {
        let found = datasets::find(dataset).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown dataset: '{}'. Available: all, transaction, status_count_mins",
                dataset
            )
        })?;
        vec![*found]
    };

    let store = TypesenseClient::with_timeout(
        &cfg.typesense,
        Duration::from_secs(cfg.lifecycle.connection_timeout_secs),
    )?;
    let pid = Uuid::new_v4();
    info!(%pid, %today, datasets = selected.len(), "starting lifecycle run");

    let summary = lifecycle::run_all(&store, &selected, today, &pid).await;
    for report in &summary.reports {
        println!("{}:", report.dataset);
        println!("  retired  {} ({:?})", report.retired.0, report.retired.1);
        for (name, outcome) in &report.ensured {
            println!("  ensured  {} ({:?})", name, outcome);
        }
    }
    summary.check()
}
