//! Ring command: locate a device and make it signal.

use std::time::Duration;

use anyhow::{Result, bail};
use tokio::time::sleep;

use pinpoint_core::{Device, DeviceOrdering};

use crate::cli::KindArg;
use crate::commands::Session;

pub async fn cmd_ring(session: &Session, query: &str, kind: KindArg, timeout: u64) -> Result<()> {
    session.source.start().await?;
    let target = wait_for_device(session, query, Duration::from_secs(timeout)).await;
    session.source.stop().await;

    let Some(device) = target else {
        bail!("device '{}' not found within {} second(s)", query, timeout);
    };

    println!("Connecting to {}...", device.name);
    session.connections.connect(&device.id).await?;
    session.connections.send_signal(&device.id, kind.into()).await?;
    println!("Signalled {}", device.name);
    session.connections.disconnect(&device.id).await?;
    Ok(())
}

/// Poll the registry until a device matches the query or time runs out.
pub(crate) async fn wait_for_device(
    session: &Session,
    query: &str,
    timeout: Duration,
) -> Option<Device> {
    let poll = Duration::from_millis(500);
    let mut waited = Duration::ZERO;
    let query_lower = query.to_lowercase();

    loop {
        let devices = session.registry.devices(DeviceOrdering::SignalStrength).await;
        if let Some(device) = devices.into_iter().find(|d| matches(d, &query_lower)) {
            return Some(device);
        }
        if waited >= timeout {
            return None;
        }
        sleep(poll).await;
        waited += poll;
    }
}

fn matches(device: &Device, query_lower: &str) -> bool {
    device.id.to_lowercase() == *query_lower || device.name.to_lowercase().contains(query_lower)
}
