//! Command implementations.

mod devices;
mod ring;
mod save;
mod scan;
mod watch;

pub use devices::cmd_devices;
pub use ring::cmd_ring;
pub use save::{cmd_forget, cmd_save};
pub use scan::cmd_scan;
pub use watch::cmd_watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use pinpoint_core::connection::{ConnectionConfig, ConnectionManager};
use pinpoint_core::events::EventDispatcher;
use pinpoint_core::registry::DeviceRegistry;
use pinpoint_core::scan::{ScanController, ScanOptions};
use pinpoint_core::synthetic::{SyntheticOptions, SyntheticSource};
use pinpoint_core::{
    FixedLocation, LinkProvider, LocationProvider, NoLocation, SavedDeviceStore, SharedRegistry,
};
use pinpoint_store::Store;

use crate::config::Config;

/// The discovery backend chosen once at session start; the real radio and
/// the synthetic source are mutually exclusive per session.
pub enum DiscoverySource {
    Radio(Arc<ScanController>),
    Synthetic(Arc<SyntheticSource>),
}

impl DiscoverySource {
    /// Start emitting discovery events.
    pub async fn start(&self) -> pinpoint_core::Result<()> {
        match self {
            DiscoverySource::Radio(controller) => controller.start_scanning().await,
            DiscoverySource::Synthetic(source) => source.start_scanning().await,
        }
    }

    /// Stop emitting discovery events.
    pub async fn stop(&self) {
        match self {
            DiscoverySource::Radio(controller) => controller.stop_scanning().await,
            DiscoverySource::Synthetic(source) => source.stop_scanning().await,
        }
    }

    fn provider(&self) -> Arc<dyn LinkProvider> {
        match self {
            DiscoverySource::Radio(controller) => Arc::clone(controller) as _,
            DiscoverySource::Synthetic(source) => Arc::clone(source) as _,
        }
    }
}

/// A fully wired discovery/connection session.
pub struct Session {
    pub registry: SharedRegistry,
    pub events: EventDispatcher,
    pub source: DiscoverySource,
    pub connections: Arc<ConnectionManager>,
}

/// Wire up registry, discovery source, and connection manager from config.
pub async fn build_session(config: &Config, synthetic: bool) -> Result<Session> {
    let events = EventDispatcher::new(256);

    let store: Option<Arc<dyn SavedDeviceStore>> = match Store::open_default() {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!("saved-device store unavailable: {}", e);
            None
        }
    };

    let location: Arc<dyn LocationProvider> = match config.position() {
        Some(position) => Arc::new(FixedLocation(position)),
        None => Arc::new(NoLocation),
    };

    let registry = Arc::new(DeviceRegistry::with_collaborators(
        events.clone(),
        config.path_loss(),
        location,
        store,
    ));
    if let Err(e) = registry.hydrate_saved().await {
        warn!("failed to load saved devices: {}", e);
    }

    let source = if synthetic {
        DiscoverySource::Synthetic(Arc::new(SyntheticSource::new(
            Arc::clone(&registry),
            events.clone(),
            SyntheticOptions::default(),
        )))
    } else {
        DiscoverySource::Radio(Arc::new(
            ScanController::new(Arc::clone(&registry), events.clone(), ScanOptions::default())
                .await?,
        ))
    };

    let connections = Arc::new(ConnectionManager::new(
        Arc::clone(&registry),
        events.clone(),
        source.provider(),
        ConnectionConfig::default(),
    ));

    Ok(Session {
        registry,
        events,
        source,
        connections,
    })
}
