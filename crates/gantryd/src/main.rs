//! gantryd, the Gantry scheduler daemon.
//!
//! Opens the redb state store and drives the scheduling engine over it.
//!
//! # Usage
//!
//! ```text
//! gantryd --config /etc/gantry/gantry.toml run
//! gantryd --config /etc/gantry/gantry.toml plan
//! gantryd --config /etc/gantry/gantry.toml apply jobs.toml
//! ```

mod manifest;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::{Parser, Subcommand};
use gantry_core::{GantryConfig, LogSection};
use gantry_scheduler::{Scheduler, SchedulerConfig};
use gantry_state::StateStore;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::manifest::Manifest;

#[derive(Parser)]
#[command(name = "gantryd", about = "Gantry job scheduler daemon")]
struct Cli {
    /// Path to gantry.toml. Built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduling loop until Ctrl-C.
    Run,
    /// Compute one pass without committing and print it as JSON.
    Plan,
    /// Load clusters, queues and jobs from a manifest into the state store.
    Apply {
        /// Manifest file (TOML).
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GantryConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GantryConfig::default(),
    };

    init_tracing(&config.log);

    match cli.command {
        Command::Run => run(&config).await,
        Command::Plan => plan(&config),
        Command::Apply { manifest } => apply(&config, &manifest),
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the config file.
fn init_tracing(log: &LogSection) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_store(config: &GantryConfig) -> anyhow::Result<StateStore> {
    let path = &config.state.path;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating state directory {}", parent.display()))?;
    }
    let store = StateStore::open(path)
        .with_context(|| format!("opening state store {}", path.display()))?;
    info!(path = ?path, "state store opened");
    Ok(store)
}

fn scheduler(config: &GantryConfig) -> anyhow::Result<Scheduler<StateStore>> {
    let store = open_store(config)?;
    Ok(Scheduler::new(store, SchedulerConfig::from(&config.scheduler))?)
}

async fn run(config: &GantryConfig) -> anyhow::Result<()> {
    info!("Gantry scheduler daemon starting");
    let scheduler = scheduler(config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!(error = %e, "failed to listen for Ctrl-C");
                // Keep the sender alive so the loop is not stopped.
                std::future::pending::<()>().await;
                drop(shutdown_tx);
            }
        }
    });

    scheduler.run(shutdown_rx).await;

    info!("Gantry scheduler daemon stopped");
    Ok(())
}

fn plan(config: &GantryConfig) -> anyhow::Result<()> {
    let report = scheduler(config)?.plan()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn apply(config: &GantryConfig, path: &Path) -> anyhow::Result<()> {
    let manifest = Manifest::from_file(path)?;
    let store = open_store(config)?;
    let summary = manifest.apply(&store, epoch_secs())?;
    println!(
        "applied {} clusters, {} queues, {} new jobs, {} updated jobs",
        summary.clusters, summary.queues, summary.jobs_created, summary.jobs_updated
    );
    Ok(())
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
