//! Save/forget commands: manage the favorited device list.

use std::time::Duration;

use anyhow::{Result, bail};
use tokio::time::sleep;

use pinpoint_core::DeviceOrdering;

use crate::commands::Session;
use crate::commands::ring::wait_for_device;

/// Toggle the saved flag on a device, scanning until it appears.
pub async fn cmd_save(session: &Session, query: &str, timeout: u64) -> Result<()> {
    session.source.start().await?;
    let target = wait_for_device(session, query, Duration::from_secs(timeout)).await;
    session.source.stop().await;

    let Some(device) = target else {
        bail!("device '{}' not found within {} second(s)", query, timeout);
    };

    match session.registry.toggle_saved(&device.id).await {
        Some(true) => println!("Saved {}", device.name),
        Some(false) => println!("Unsaved {}", device.name),
        None => bail!("device '{}' disappeared from the registry", query),
    }

    // Give the fire-and-forget persistence write a moment to land before
    // the process exits.
    sleep(Duration::from_millis(250)).await;
    Ok(())
}

/// Remove a device from the registry (and the persisted saved list).
/// Matches against hydrated saved devices, so no scan is needed.
pub async fn cmd_forget(session: &Session, query: &str) -> Result<()> {
    let query_lower = query.to_lowercase();
    let device = session
        .registry
        .devices(DeviceOrdering::Name)
        .await
        .into_iter()
        .find(|d| {
            d.id.to_lowercase() == query_lower || d.name.to_lowercase().contains(&query_lower)
        });

    let Some(device) = device else {
        bail!("no known device matches '{}'", query);
    };

    session.registry.remove(&device.id).await;
    println!("Forgot {}", device.name);

    sleep(Duration::from_millis(250)).await;
    Ok(())
}
