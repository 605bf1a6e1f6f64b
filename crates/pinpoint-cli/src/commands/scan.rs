//! Scan command implementation.

use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

use pinpoint_core::Device;

use crate::cli::{OrderArg, OutputFormat};
use crate::commands::Session;

pub async fn cmd_scan(
    session: &Session,
    timeout: u64,
    order: OrderArg,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    if !quiet {
        eprintln!("Scanning for {} second(s)...", timeout);
    }

    session.source.start().await?;
    sleep(Duration::from_secs(timeout)).await;
    session.source.stop().await;

    let devices = session.registry.devices(order.into()).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&devices)?),
        OutputFormat::Text => print_device_table(&devices),
    }

    if !quiet {
        eprintln!("\n{} device(s) found", devices.len());
    }
    Ok(())
}

fn print_device_table(devices: &[Device]) {
    if devices.is_empty() {
        println!("No devices found.");
        return;
    }

    println!(
        "{:<28} {:<12} {:<10} {:>6} {:>8} {:>6}  {}",
        "NAME", "CATEGORY", "SIGNAL", "RSSI", "DIST(m)", "BATT", "ID"
    );
    for device in devices {
        let rssi = device
            .rssi
            .map(|r| r.to_string())
            .unwrap_or_else(|| "--".to_string());
        let battery = device
            .battery
            .map(|b| format!("{}%", b))
            .unwrap_or_else(|| "--".to_string());
        let marker = if device.saved { "*" } else { " " };
        println!(
            "{}{:<27} {:<12} {:<10} {:>6} {:>8.1} {:>6}  {}",
            marker,
            device.name,
            device.category.to_string(),
            device.signal.to_string(),
            rssi,
            device.distance,
            battery,
            device.id
        );
    }
}
