//! Pinpoint command-line interface.

mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{build_session, cmd_devices, cmd_forget, cmd_ring, cmd_save, cmd_scan, cmd_watch};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load()?;
    let synthetic = cli.synthetic || config.synthetic;

    match cli.command {
        Commands::Scan {
            timeout,
            order,
            format,
        } => {
            let session = build_session(&config, synthetic).await?;
            cmd_scan(&session, timeout, order, format, cli.quiet).await
        }
        Commands::Watch { timeout, format } => {
            let session = build_session(&config, synthetic).await?;
            cmd_watch(&session, timeout, format).await
        }
        Commands::Ring {
            device,
            kind,
            timeout,
        } => {
            let session = build_session(&config, synthetic).await?;
            cmd_ring(&session, &device, kind, timeout).await
        }
        Commands::Save { device, timeout } => {
            let session = build_session(&config, synthetic).await?;
            cmd_save(&session, &device, timeout).await
        }
        Commands::Forget { device } => {
            let session = build_session(&config, synthetic).await?;
            cmd_forget(&session, &device).await
        }
        Commands::Devices { format } => cmd_devices(format).await,
    }
}
