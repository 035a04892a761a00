//! Sehat offline database tool.
//!
//! Usage:
//!   sehat-offline --db sehat-offline.db status
//!   sehat-offline --db sehat-offline.db records patient
//!   sehat-offline --db sehat-offline.db sync --endpoint https://api.example.org
//!
//! Output is JSON on stdout; logs go to stderr (`RUST_LOG` or `--verbose`).

use anyhow::Result;
use clap::Parser;
use sehat_cli::{run, Cli};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let output = run(&cli).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
