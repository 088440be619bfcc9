// src/main.rs

//! dpc-alert: DPC bulletin engine CLI
//!
//! Thin host around the engine library: one-shot refresh for inspection,
//! a watch loop standing in for the external scheduler, and a config check.

use std::time::Duration;

use clap::{Parser, Subcommand};

use dpc_alert::engine::Engine;
use dpc_alert::error::Result;
use dpc_alert::models::EngineConfig;

#[derive(Parser, Debug)]
#[command(
    name = "dpc-alert",
    version,
    about = "Italian Civil Protection bulletin engine"
)]

/// CLI Arguments
struct Cli {
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

/// CLI Commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Run one refresh cycle and print the snapshot as JSON
    Refresh,
    /// Poll on the configured interval and log each snapshot
    Watch,
    /// Validate the configuration file
    Validate,
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = EngineConfig::load(&cli.config)?;

    match cli.command {
        Command::Validate => {
            config.validate()?;
            println!("Configuration OK: {}", config.location.name);
        }
        Command::Refresh => {
            let mut engine = Engine::new(config)?;
            let snapshot = engine.refresh().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Watch => {
            let interval = config.polling.interval();
            let retry = Duration::from_secs(config.polling.retry_after_secs);
            let mut engine = Engine::new(config)?;
            loop {
                let delay = match engine.refresh().await {
                    Ok(snapshot) => {
                        log::info!(
                            "snapshot updated at {} (criticality: {}, vigilance: {})",
                            snapshot.last_update,
                            snapshot
                                .criticality
                                .as_ref()
                                .map(|b| b.id.as_str())
                                .unwrap_or("-"),
                            snapshot
                                .vigilance
                                .as_ref()
                                .map(|b| b.id.as_str())
                                .unwrap_or("-"),
                        );
                        if snapshot.requires_full_refresh {
                            retry.min(interval)
                        } else {
                            interval
                        }
                    }
                    Err(error) => {
                        log::error!("refresh failed: {error}");
                        retry.min(interval)
                    }
                };
                tokio::time::sleep(delay).await;
            }
        }
    }

    Ok(())
}
