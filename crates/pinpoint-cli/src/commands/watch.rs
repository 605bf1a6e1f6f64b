//! Watch command: stream live discovery and connection events.

use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::sleep;
use tracing::warn;

use pinpoint_core::events::{DeviceEvent, EventReceiver};

use crate::cli::OutputFormat;
use crate::commands::Session;

pub async fn cmd_watch(session: &Session, timeout: Option<u64>, format: OutputFormat) -> Result<()> {
    let rx = session.events.subscribe();
    session.source.start().await?;

    let stream = print_events(rx, format);
    match timeout {
        Some(secs) => {
            tokio::select! {
                _ = stream => {}
                _ = sleep(Duration::from_secs(secs)) => {}
                _ = signal::ctrl_c() => {}
            }
        }
        None => {
            tokio::select! {
                _ = stream => {}
                _ = signal::ctrl_c() => {}
            }
        }
    }

    session.source.stop().await;
    Ok(())
}

async fn print_events(mut rx: EventReceiver, format: OutputFormat) {
    loop {
        match rx.recv().await {
            Ok(event) => print_event(&event, format),
            Err(RecvError::Lagged(skipped)) => {
                warn!("event stream lagged, {} event(s) skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &DeviceEvent, format: OutputFormat) {
    if format == OutputFormat::Json {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{}", line);
        }
        return;
    }

    match event {
        DeviceEvent::Discovered { device, rssi } => {
            println!(
                "+ discovered  {}  ({} dBm)",
                display_name(device),
                rssi.map(|r| r.to_string()).unwrap_or_else(|| "?".into())
            );
        }
        DeviceEvent::Updated { device, rssi } => {
            println!(
                "~ updated     {}  ({} dBm)",
                display_name(device),
                rssi.map(|r| r.to_string()).unwrap_or_else(|| "?".into())
            );
        }
        DeviceEvent::ConnectionChanged { device, state } => {
            println!("> {}  is now {}", display_name(device), state);
        }
        DeviceEvent::BatteryUpdated { device, level } => {
            println!("# {}  battery {}%", display_name(device), level);
        }
        DeviceEvent::SavedChanged { device, saved } => {
            let action = if *saved { "saved" } else { "unsaved" };
            println!("* {}  {}", display_name(device), action);
        }
        DeviceEvent::Removed { device } => {
            println!("- removed     {}", display_name(device));
        }
        DeviceEvent::Found { device } => {
            println!("! found       {}", display_name(device));
        }
        DeviceEvent::RadioStateChanged { state } => {
            println!("  radio is {}", state);
        }
        DeviceEvent::ScanStarted => println!("  scan started"),
        DeviceEvent::ScanStopped { reason } => println!("  scan stopped ({:?})", reason),
        DeviceEvent::Condition { device, condition } => {
            let subject = device
                .as_ref()
                .map(display_name)
                .unwrap_or_else(|| "session".to_string());
            println!("! {}  {:?}", subject, condition);
        }
        _ => {}
    }
}

fn display_name(device: &pinpoint_core::DeviceRef) -> String {
    device.name.clone().unwrap_or_else(|| device.id.clone())
}
