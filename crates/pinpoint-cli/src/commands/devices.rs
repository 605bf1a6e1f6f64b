//! Devices command: list the persisted saved devices.

use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;

use pinpoint_store::Store;

use crate::cli::OutputFormat;

pub async fn cmd_devices(format: OutputFormat) -> Result<()> {
    let store = Store::open_default().context("opening saved-device store")?;
    let saved = store.load_saved().context("loading saved devices")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&saved)?),
        OutputFormat::Text => {
            if saved.is_empty() {
                println!("No saved devices.");
                return Ok(());
            }
            println!("{:<28} {:<12} {:<22} {}", "NAME", "CATEGORY", "LAST SEEN", "ID");
            for device in &saved {
                let last_seen = device
                    .last_seen
                    .and_then(|ts| ts.format(&Rfc3339).ok())
                    .unwrap_or_else(|| "--".to_string());
                println!(
                    "{:<28} {:<12} {:<22} {}",
                    device.name,
                    device.category.to_string(),
                    last_seen,
                    device.id
                );
            }
        }
    }
    Ok(())
}
