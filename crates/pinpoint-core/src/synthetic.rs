//! Synthetic discovery source.
//!
//! When no physical radio is usable (development targets, CI), this source
//! stands in for the scan controller and produces a believable discovery
//! stream from a fixed catalog of device profiles, so the registry,
//! connection manager, and UI are exercised identically. Synthetic
//! identities are freshly generated per session and flow through the
//! ordinary pipeline with no special-casing downstream.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI16, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use pinpoint_types::{DeviceCategory, RadioState};
use pinpoint_types::uuids::{
    ALERT_LEVEL, BATTERY_LEVEL, BATTERY_SERVICE, DEVICE_INFO_SERVICE, IMMEDIATE_ALERT_SERVICE,
    MODEL_NUMBER,
};

use crate::advertisement::AdvertisementMeta;
use crate::error::{Error, Result};
use crate::events::{DeviceEvent, EventDispatcher, ScanStopReason};
use crate::link::{GattCharacteristic, LinkProvider, PeripheralLink};
use crate::registry::DeviceRegistry;

/// One entry in the synthetic device catalog.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticProfile {
    /// Display name; classifies through the ordinary name-keyword stage.
    pub name: &'static str,
    /// The category the name should classify to.
    pub category: DeviceCategory,
    /// Base signal strength around which re-advertisements jitter.
    pub base_rssi: i16,
    /// Battery percentage reported after connection.
    pub battery: u8,
}

/// The fixed catalog of synthetic device profiles.
pub const CATALOG: &[SyntheticProfile] = &[
    SyntheticProfile {
        name: "Aria Buds Pro",
        category: DeviceCategory::Headphones,
        base_rssi: -48,
        battery: 82,
    },
    SyntheticProfile {
        name: "Pulse Mini Speaker",
        category: DeviceCategory::Speaker,
        base_rssi: -62,
        battery: 74,
    },
    SyntheticProfile {
        name: "Vertex Watch 4",
        category: DeviceCategory::Watch,
        base_rssi: -55,
        battery: 58,
    },
    SyntheticProfile {
        name: "Halo Keys Keyboard",
        category: DeviceCategory::Keyboard,
        base_rssi: -66,
        battery: 91,
    },
    SyntheticProfile {
        name: "Comet Travel Mouse",
        category: DeviceCategory::Mouse,
        base_rssi: -70,
        battery: 47,
    },
    SyntheticProfile {
        name: "Nimbus Book 14",
        category: DeviceCategory::Laptop,
        base_rssi: -76,
        battery: 66,
    },
];

/// Options for the synthetic source.
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    /// Delay between successive initial discoveries, emulating progressive
    /// discovery.
    pub discovery_stagger: Duration,
    /// Interval between re-advertisements of one device.
    pub readvertise_interval: Duration,
    /// How many re-advertisement cycles run before a device goes stale.
    pub readvertise_cycles: u32,
    /// Bound on the per-cycle signal jitter in dBm.
    pub jitter_db: i16,
    /// Simulated connect latency of synthetic links.
    pub connect_latency: Duration,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            discovery_stagger: Duration::from_secs(2),
            readvertise_interval: Duration::from_secs(3),
            readvertise_cycles: 8,
            jitter_db: 4,
            connect_latency: Duration::from_millis(150),
        }
    }
}

impl SyntheticOptions {
    /// Create options tuned for fast test runs.
    pub fn fast() -> Self {
        Self {
            discovery_stagger: Duration::from_millis(20),
            readvertise_interval: Duration::from_millis(20),
            readvertise_cycles: 3,
            jitter_db: 4,
            connect_latency: Duration::from_millis(5),
        }
    }
}

/// Generates plausible discovery and update events on a timer.
///
/// Mutually exclusive with the real [`crate::scan::ScanController`] per
/// session; which one is active is decided once at session start.
pub struct SyntheticSource {
    registry: Arc<DeviceRegistry>,
    events: EventDispatcher,
    options: SyntheticOptions,
    links: Arc<RwLock<HashMap<String, Arc<SyntheticLink>>>>,
    scan_token: Arc<Mutex<Option<CancellationToken>>>,
}

impl SyntheticSource {
    /// Create a synthetic source feeding the given registry.
    pub fn new(
        registry: Arc<DeviceRegistry>,
        events: EventDispatcher,
        options: SyntheticOptions,
    ) -> Self {
        Self {
            registry,
            events,
            options,
            links: Arc::new(RwLock::new(HashMap::new())),
            scan_token: Arc::new(Mutex::new(None)),
        }
    }

    /// Begin emitting the catalog. No-op when already running.
    pub async fn start_scanning(&self) -> Result<()> {
        let mut token_guard = self.scan_token.lock().await;
        if token_guard.is_some() {
            debug!("synthetic scan already active");
            return Ok(());
        }

        let token = CancellationToken::new();
        *token_guard = Some(token.clone());
        drop(token_guard);

        info!("synthetic scan started ({} profiles)", CATALOG.len());
        self.events.send(DeviceEvent::ScanStarted);

        for (index, profile) in CATALOG.iter().enumerate() {
            // Fresh identity each session
            let identifier = Uuid::new_v4().to_string();
            let link = Arc::new(SyntheticLink::new(profile, self.options.connect_latency));
            self.links
                .write()
                .await
                .insert(identifier.clone(), Arc::clone(&link));

            tokio::spawn(Self::advertise(
                Arc::clone(&self.registry),
                link,
                identifier,
                *profile,
                self.options.clone(),
                index as u32,
                token.clone(),
            ));
        }

        Ok(())
    }

    /// Stop emitting. Idempotent; cancels all advertisement tasks.
    pub async fn stop_scanning(&self) {
        let token = self.scan_token.lock().await.take();
        let Some(token) = token else {
            return;
        };
        token.cancel();
        info!("synthetic scan stopped");
        self.events.send(DeviceEvent::ScanStopped {
            reason: ScanStopReason::Requested,
        });
    }

    /// Whether the source is currently emitting.
    pub async fn is_active(&self) -> bool {
        self.scan_token.lock().await.is_some()
    }

    /// Drive one synthetic device: staggered initial discovery, then a
    /// bounded number of jittered re-advertisements, then silence. The
    /// device goes stale but is never removed.
    async fn advertise(
        registry: Arc<DeviceRegistry>,
        link: Arc<SyntheticLink>,
        identifier: String,
        profile: SyntheticProfile,
        options: SyntheticOptions,
        index: u32,
        token: CancellationToken,
    ) {
        let initial_delay = options.discovery_stagger * (index + 1);
        tokio::select! {
            _ = token.cancelled() => return,
            _ = sleep(initial_delay) => {}
        }

        let meta = AdvertisementMeta::with_name(profile.name);
        registry
            .upsert_from_discovery(&identifier, Some(profile.base_rssi), &meta)
            .await;

        for _ in 0..options.readvertise_cycles {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = sleep(options.readvertise_interval) => {}
            }

            let jitter = rand::rng().random_range(-options.jitter_db..=options.jitter_db);
            let rssi = profile.base_rssi + jitter;
            link.set_rssi(rssi);
            registry
                .upsert_from_discovery(&identifier, Some(rssi), &meta)
                .await;
        }

        debug!("synthetic device {} went stale", profile.name);
    }
}

impl std::fmt::Debug for SyntheticSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticSource")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LinkProvider for SyntheticSource {
    async fn link_for(&self, identifier: &str) -> Result<Arc<dyn PeripheralLink>> {
        self.links
            .read()
            .await
            .get(identifier)
            .cloned()
            .map(|link| link as Arc<dyn PeripheralLink>)
            .ok_or_else(|| Error::device_not_found(identifier))
    }

    // Synthetic mode is exempt from radio availability checks.
    async fn radio_state(&self) -> RadioState {
        RadioState::PoweredOn
    }
}

/// A scripted peripheral link for synthetic devices.
pub struct SyntheticLink {
    name: String,
    battery: u8,
    rssi: AtomicI16,
    connected: AtomicBool,
    connect_latency: Duration,
}

impl SyntheticLink {
    fn new(profile: &SyntheticProfile, connect_latency: Duration) -> Self {
        Self {
            name: profile.name.to_string(),
            battery: profile.battery,
            rssi: AtomicI16::new(profile.base_rssi),
            connected: AtomicBool::new(false),
            connect_latency,
        }
    }

    fn set_rssi(&self, rssi: i16) {
        self.rssi.store(rssi, Ordering::Relaxed);
    }

    fn check_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

#[async_trait]
impl PeripheralLink for SyntheticLink {
    async fn connect(&self) -> Result<()> {
        sleep(self.connect_latency).await;
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Relaxed);
        Ok(())
    }

    async fn discover_services(&self) -> Result<Vec<GattCharacteristic>> {
        self.check_connected()?;
        Ok(vec![
            GattCharacteristic {
                uuid: BATTERY_LEVEL,
                service: BATTERY_SERVICE,
                readable: true,
                writable: false,
                notifiable: true,
            },
            GattCharacteristic {
                uuid: ALERT_LEVEL,
                service: IMMEDIATE_ALERT_SERVICE,
                readable: false,
                writable: true,
                notifiable: false,
            },
            GattCharacteristic {
                uuid: MODEL_NUMBER,
                service: DEVICE_INFO_SERVICE,
                readable: true,
                writable: false,
                notifiable: false,
            },
        ])
    }

    async fn read(&self, characteristic: &GattCharacteristic) -> Result<Vec<u8>> {
        self.check_connected()?;
        if characteristic.uuid == BATTERY_LEVEL {
            Ok(vec![self.battery])
        } else if characteristic.uuid == MODEL_NUMBER {
            Ok(self.name.as_bytes().to_vec())
        } else {
            Err(Error::characteristic_not_found(
                characteristic.uuid.to_string(),
            ))
        }
    }

    async fn write(&self, characteristic: &GattCharacteristic, value: &[u8]) -> Result<()> {
        self.check_connected()?;
        if characteristic.uuid == ALERT_LEVEL {
            debug!("synthetic device {} alerted (level {:?})", self.name, value);
            Ok(())
        } else {
            Err(Error::characteristic_not_found(
                characteristic.uuid.to_string(),
            ))
        }
    }

    async fn subscribe(&self, _characteristic: &GattCharacteristic) -> Result<()> {
        self.check_connected()?;
        Ok(())
    }

    async fn rssi(&self) -> Result<Option<i16>> {
        Ok(Some(self.rssi.load(Ordering::Relaxed)))
    }
}
