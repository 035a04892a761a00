//! Command-line interface for a Sehat offline database.
//!
//! Every command opens the database through [`OfflineFacade`] and returns a
//! JSON value; the binary prints it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sehat_sync::{
    ConnectivityMonitor, HttpRemote, HttpRemoteConfig, OfflineConfig, OfflineFacade,
    RemoteEndpoint, SyncOutcome,
};
use sehat_types::RecordType;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sehat-offline")]
#[command(about = "Inspect and sync a Sehat offline database")]
pub struct Cli {
    /// SQLite database file (overrides the config file)
    #[arg(short, long, global = true)]
    pub db: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pending, dead-letter and per-type record counts
    Status,
    /// List records of one type
    Records {
        /// patient, prescription, medicine, consultation or user
        record_type: String,
    },
    /// List pending sync queue entries in delivery order
    Queue,
    /// List mutations dropped after exhausting their retries
    DeadLetters {
        /// Remove them after listing
        #[arg(long)]
        clear: bool,
    },
    /// Drop expired critical cache entries
    SweepCache {
        /// Maximum entry age (overrides the config file)
        #[arg(long)]
        max_age_secs: Option<u64>,
    },
    /// Run one sync pass against a REST endpoint
    Sync {
        /// Base URL of the sync API
        #[arg(short, long)]
        endpoint: String,

        /// Bearer token
        #[arg(long)]
        token: Option<String>,

        /// Per-request timeout
        #[arg(long, default_value = "30000")]
        timeout_ms: u64,
    },
}

impl Cli {
    /// Resolves the effective configuration from the flags.
    pub fn offline_config(&self) -> Result<OfflineConfig> {
        let mut config = match &self.config {
            Some(path) => OfflineConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => OfflineConfig::default(),
        };
        if let Some(db) = &self.db {
            config.database_path = db.clone();
        }
        if let Command::SweepCache {
            max_age_secs: Some(secs),
        } = &self.command
        {
            config.cache_max_age_secs = *secs;
        }
        Ok(config)
    }
}

/// Runs the parsed command and returns its output.
pub async fn run(cli: &Cli) -> Result<Value> {
    let config = cli.offline_config()?;

    let (remote, online): (Arc<dyn RemoteEndpoint>, bool) = match &cli.command {
        Command::Sync {
            endpoint,
            token,
            timeout_ms,
        } => {
            let remote = HttpRemote::new(HttpRemoteConfig {
                base_url: endpoint.clone(),
                request_timeout_ms: *timeout_ms,
                auth_token: token.clone(),
            })
            .context("Failed to build HTTP client")?;
            (Arc::new(remote), true)
        }
        // Inspection commands never reach the network.
        _ => (Arc::new(HttpRemote::new(HttpRemoteConfig::default())?), false),
    };

    let facade = OfflineFacade::open(&config, remote, ConnectivityMonitor::new(online))
        .await
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

    let output = execute(&facade, &cli.command).await;
    facade.close();
    output
}

async fn execute(facade: &OfflineFacade, command: &Command) -> Result<Value> {
    match command {
        Command::Status => {
            let status = facade.status().await?;
            let counts = facade.record_counts().await?;
            let mut records = serde_json::Map::new();
            for record_type in RecordType::ALL {
                let count = counts
                    .iter()
                    .find(|(t, _)| *t == record_type)
                    .map_or(0, |(_, n)| *n);
                records.insert(record_type.to_string(), json!(count));
            }
            Ok(json!({
                "pending_count": status.pending_count,
                "dead_letter_count": status.dead_letter_count,
                "records": records,
            }))
        }
        Command::Records { record_type } => {
            let record_type: RecordType = record_type
                .parse()
                .with_context(|| format!("Unknown record type {record_type:?}"))?;
            let records = facade.read_by_type(record_type).await?;
            Ok(serde_json::to_value(records)?)
        }
        Command::Queue => {
            let entries = facade.pending_entries().await?;
            Ok(serde_json::to_value(entries)?)
        }
        Command::DeadLetters { clear } => {
            let dead = facade.dead_letters().await?;
            let listed = serde_json::to_value(&dead)?;
            if *clear {
                let cleared = facade.clear_dead_letters().await?;
                info!("Cleared {} dead letters", cleared);
            }
            Ok(listed)
        }
        Command::SweepCache { .. } => {
            let removed = facade.sweep_expired_cache().await?;
            Ok(json!({ "removed": removed }))
        }
        Command::Sync { endpoint, .. } => {
            info!("Syncing against {}", endpoint);
            match facade.force_sync().await {
                SyncOutcome::Completed(report) => {
                    let pending = facade.status().await?.pending_count;
                    Ok(json!({ "report": report, "pending_count": pending }))
                }
                SyncOutcome::Skipped(reason) => Ok(json!({ "skipped": format!("{reason:?}") })),
            }
        }
    }
}
