//! Radio session ownership and device discovery.
//!
//! The [`ScanController`] owns the single BLE adapter session: it starts
//! and stops discovery, tracks the radio power state, and translates the
//! platform's advertisement callbacks into normalized registry upserts.
//! Duplicate advertisements flow through unconditionally; reconciliation is
//! the registry's job.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::{Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::StreamExt;
use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pinpoint_types::RadioState;
use pinpoint_types::uuids::{
    AUDIO_SINK_SERVICE, BATTERY_SERVICE, DEVICE_INFO_SERVICE, HEART_RATE_SERVICE, HID_SERVICE,
    IMMEDIATE_ALERT_SERVICE, LINK_LOSS_SERVICE,
};

use crate::advertisement::AdvertisementMeta;
use crate::error::{Error, Result};
use crate::events::{Condition, DeviceEvent, EventDispatcher, ScanStopReason};
use crate::link::{BtleLink, LinkProvider, PeripheralLink};
use crate::registry::DeviceRegistry;
use crate::util::create_identifier;

use async_trait::async_trait;
use pinpoint_types::ConnectionState;

/// Services used for the narrowed, duplicate-suppressed scan after the
/// warm-up window.
fn known_services() -> Vec<Uuid> {
    vec![
        BATTERY_SERVICE,
        IMMEDIATE_ALERT_SERVICE,
        LINK_LOSS_SERVICE,
        DEVICE_INFO_SERVICE,
        HEART_RATE_SERVICE,
        HID_SERVICE,
        AUDIO_SINK_SERVICE,
    ]
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to run the wide, unfiltered scan before narrowing.
    pub warmup: Duration,
    /// Bounded total scan duration; scanning stops automatically after
    /// this to bound battery and radio usage.
    pub max_duration: Duration,
    /// Whether to switch to a service-filtered scan after warm-up.
    pub narrow_after_warmup: bool,
    /// Service filter used for the narrowed scan.
    pub service_filter: Vec<Uuid>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(10),
            max_duration: Duration::from_secs(45),
            narrow_after_warmup: true,
            service_filter: known_services(),
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the warm-up duration before narrowing the scan.
    #[must_use]
    pub fn warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Set the bounded total scan duration.
    #[must_use]
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Enable or disable the post-warm-up narrow scan.
    #[must_use]
    pub fn narrow_after_warmup(mut self, narrow: bool) -> Self {
        self.narrow_after_warmup = narrow;
        self
    }
}

/// Live state of the radio session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSession {
    /// Whether a scan is currently running.
    pub active: bool,
    /// Last observed radio power state.
    pub radio_state: RadioState,
}

/// Owns the radio session and feeds discovery into the registry.
pub struct ScanController {
    adapter: Adapter,
    registry: Arc<DeviceRegistry>,
    events: EventDispatcher,
    options: ScanOptions,
    session: Arc<RwLock<ScanSession>>,
    /// Identity -> platform peripheral handle. Handle ownership stays with
    /// the radio session; devices reference peripherals only by identity.
    links: Arc<RwLock<HashMap<String, PeripheralId>>>,
    scan_token: Arc<Mutex<Option<CancellationToken>>>,
}

impl ScanController {
    /// Create a controller on the first available adapter.
    pub async fn new(
        registry: Arc<DeviceRegistry>,
        events: EventDispatcher,
        options: ScanOptions,
    ) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::RadioUnavailable {
                state: RadioState::Unsupported,
            })?;
        Ok(Self::with_adapter(adapter, registry, events, options))
    }

    /// Create a controller on a specific adapter.
    pub fn with_adapter(
        adapter: Adapter,
        registry: Arc<DeviceRegistry>,
        events: EventDispatcher,
        options: ScanOptions,
    ) -> Self {
        Self {
            adapter,
            registry,
            events,
            options,
            session: Arc::new(RwLock::new(ScanSession::default())),
            links: Arc::new(RwLock::new(HashMap::new())),
            scan_token: Arc::new(Mutex::new(None)),
        }
    }

    /// Snapshot of the current session state.
    pub async fn session(&self) -> ScanSession {
        *self.session.read().await
    }

    /// Query the adapter for its power state and record it.
    async fn refresh_radio_state(&self) -> RadioState {
        let state = match self.adapter.adapter_state().await {
            Ok(state) => map_central_state(state),
            Err(btleplug::Error::PermissionDenied) => RadioState::Unauthorized,
            Err(btleplug::Error::NotSupported(_)) => RadioState::Unsupported,
            Err(e) => {
                debug!("adapter state query failed: {}", e);
                RadioState::Unknown
            }
        };
        self.session.write().await.radio_state = state;
        state
    }

    /// Start discovery.
    ///
    /// No-op when a scan is already running. When the radio is not powered
    /// on, records the state, surfaces a `RadioUnavailable` condition, and
    /// returns without error. No scan request is issued to a disabled
    /// radio, and there is no automatic retry; callers re-invoke after
    /// observing a power-state recovery.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn start_scanning(&self) -> Result<()> {
        let mut token_guard = self.scan_token.lock().await;
        if token_guard.is_some() {
            debug!("scan already active");
            return Ok(());
        }

        let state = self.refresh_radio_state().await;
        if !state.is_available() {
            warn!("cannot scan, radio is {}", state);
            self.events
                .condition(None, Condition::RadioUnavailable { state });
            return Ok(());
        }

        // Wide scan first: all advertising peripherals, no service filter.
        self.adapter.start_scan(ScanFilter::default()).await?;
        self.session.write().await.active = true;
        info!("scan started");
        self.events.send(DeviceEvent::ScanStarted);

        let token = CancellationToken::new();
        *token_guard = Some(token.clone());
        drop(token_guard);

        tokio::spawn(Self::pump_events(
            self.adapter.clone(),
            Arc::clone(&self.registry),
            self.events.clone(),
            Arc::clone(&self.links),
            Arc::clone(&self.session),
            Arc::clone(&self.scan_token),
            token.clone(),
        ));

        if self.options.narrow_after_warmup && !self.options.service_filter.is_empty() {
            tokio::spawn(Self::narrow_after_warmup(
                self.adapter.clone(),
                self.options.warmup,
                self.options.service_filter.clone(),
                token.clone(),
            ));
        }

        tokio::spawn(Self::enforce_duration_cap(
            self.adapter.clone(),
            Arc::clone(&self.session),
            self.events.clone(),
            Arc::clone(&self.scan_token),
            self.options.max_duration,
            token,
        ));

        Ok(())
    }

    /// Stop discovery. Idempotent; cancels the warm-up and duration-cap
    /// timers along with the event pump.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn stop_scanning(&self) {
        Self::halt(
            &self.adapter,
            &self.session,
            &self.events,
            &self.scan_token,
            ScanStopReason::Requested,
        )
        .await;
    }

    async fn halt(
        adapter: &Adapter,
        session: &RwLock<ScanSession>,
        events: &EventDispatcher,
        scan_token: &Mutex<Option<CancellationToken>>,
        reason: ScanStopReason,
    ) {
        let token = scan_token.lock().await.take();
        let Some(token) = token else {
            return; // not scanning
        };
        token.cancel();

        if let Err(e) = adapter.stop_scan().await {
            warn!("failed to stop scan: {}", e);
        }
        session.write().await.active = false;
        info!("scan stopped ({:?})", reason);
        events.send(DeviceEvent::ScanStopped { reason });
    }

    /// After the warm-up window, restart the scan filtered to the known
    /// service set to reduce callback volume.
    async fn narrow_after_warmup(
        adapter: Adapter,
        warmup: Duration,
        services: Vec<Uuid>,
        token: CancellationToken,
    ) {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = sleep(warmup) => {
                debug!("narrowing scan to {} known services", services.len());
                if let Err(e) = adapter.stop_scan().await {
                    warn!("failed to pause scan for narrowing: {}", e);
                    return;
                }
                if let Err(e) = adapter.start_scan(ScanFilter { services }).await {
                    warn!("failed to restart narrowed scan: {}", e);
                }
            }
        }
    }

    /// Enforce the bounded scan duration.
    async fn enforce_duration_cap(
        adapter: Adapter,
        session: Arc<RwLock<ScanSession>>,
        events: EventDispatcher,
        scan_token: Arc<Mutex<Option<CancellationToken>>>,
        max_duration: Duration,
        token: CancellationToken,
    ) {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = sleep(max_duration) => {
                info!("scan duration cap reached after {:?}", max_duration);
                Self::halt(&adapter, &session, &events, &scan_token, ScanStopReason::DurationCap)
                    .await;
            }
        }
    }

    /// Consume the adapter's event stream until cancelled.
    async fn pump_events(
        adapter: Adapter,
        registry: Arc<DeviceRegistry>,
        events: EventDispatcher,
        links: Arc<RwLock<HashMap<String, PeripheralId>>>,
        session: Arc<RwLock<ScanSession>>,
        scan_token: Arc<Mutex<Option<CancellationToken>>>,
        token: CancellationToken,
    ) {
        let mut stream = match adapter.events().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("failed to open adapter event stream: {}", e);
                return;
            }
        };

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                event = stream.next() => {
                    let Some(event) = event else { break };
                    Self::handle_event(
                        &adapter, &registry, &events, &links, &session, &scan_token, event,
                    )
                    .await;
                }
            }
        }
    }

    async fn handle_event(
        adapter: &Adapter,
        registry: &Arc<DeviceRegistry>,
        events: &EventDispatcher,
        links: &RwLock<HashMap<String, PeripheralId>>,
        session: &Arc<RwLock<ScanSession>>,
        scan_token: &Arc<Mutex<Option<CancellationToken>>>,
        event: CentralEvent,
    ) {
        match event {
            CentralEvent::DeviceDiscovered(id)
            | CentralEvent::DeviceUpdated(id)
            | CentralEvent::ManufacturerDataAdvertisement { id, .. }
            | CentralEvent::ServiceDataAdvertisement { id, .. }
            | CentralEvent::ServicesAdvertisement { id, .. } => {
                Self::upsert_peripheral(adapter, registry, links, &id).await;
            }
            CentralEvent::DeviceConnected(id) => {
                // A connect callback can arrive for an identity the
                // registry has never listed; synthesize a minimal record
                // rather than dropping the event.
                let identifier = Self::identity_for(adapter, links, &id).await;
                if let Some(identifier) = identifier {
                    registry.ensure_device(&identifier, None).await;
                    registry
                        .mark_connection_state(&identifier, ConnectionState::Connected)
                        .await;
                }
            }
            CentralEvent::DeviceDisconnected(id) => {
                if let Some(identifier) = Self::identity_for(adapter, links, &id).await {
                    registry
                        .mark_connection_state(&identifier, ConnectionState::Disconnected)
                        .await;
                }
            }
            CentralEvent::StateUpdate(state) => {
                let state = map_central_state(state);
                let was_scanning = {
                    let mut session = session.write().await;
                    session.radio_state = state;
                    session.active
                };
                info!("radio state changed: {}", state);
                events.send(DeviceEvent::RadioStateChanged { state });

                if !state.is_available() && was_scanning {
                    Self::halt(adapter, session, events, scan_token, ScanStopReason::RadioLost)
                        .await;
                }
            }
            _ => {}
        }
    }

    /// Resolve a platform handle back to a stable identity, registering it
    /// if necessary.
    async fn identity_for(
        adapter: &Adapter,
        links: &RwLock<HashMap<String, PeripheralId>>,
        id: &PeripheralId,
    ) -> Option<String> {
        {
            let links = links.read().await;
            if let Some((identity, _)) = links.iter().find(|(_, pid)| *pid == id) {
                return Some(identity.clone());
            }
        }

        let peripheral = adapter.peripheral(id).await.ok()?;
        let props = peripheral.properties().await.ok()??;
        let identity = create_identifier(&props.address.to_string(), id);
        links.write().await.insert(identity.clone(), id.clone());
        Some(identity)
    }

    /// Normalize one peripheral observation into a registry upsert.
    async fn upsert_peripheral(
        adapter: &Adapter,
        registry: &Arc<DeviceRegistry>,
        links: &RwLock<HashMap<String, PeripheralId>>,
        id: &PeripheralId,
    ) {
        let Ok(peripheral) = adapter.peripheral(id).await else {
            return;
        };
        let Ok(Some(props)) = peripheral.properties().await else {
            return;
        };

        let identifier = create_identifier(&props.address.to_string(), id);
        links.write().await.insert(identifier.clone(), id.clone());

        let meta = AdvertisementMeta::from_properties(&props);
        registry
            .upsert_from_discovery(&identifier, props.rssi, &meta)
            .await;
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LinkProvider for ScanController {
    async fn link_for(&self, identifier: &str) -> Result<Arc<dyn PeripheralLink>> {
        let id = self
            .links
            .read()
            .await
            .get(identifier)
            .cloned()
            .ok_or_else(|| Error::device_not_found(identifier))?;
        let peripheral = self.adapter.peripheral(&id).await?;
        Ok(Arc::new(BtleLink::new(peripheral)))
    }

    async fn radio_state(&self) -> RadioState {
        self.refresh_radio_state().await
    }
}

fn map_central_state(state: CentralState) -> RadioState {
    match state {
        CentralState::PoweredOn => RadioState::PoweredOn,
        CentralState::PoweredOff => RadioState::PoweredOff,
        _ => RadioState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_options_defaults() {
        let options = ScanOptions::default();
        assert_eq!(options.warmup, Duration::from_secs(10));
        assert_eq!(options.max_duration, Duration::from_secs(45));
        assert!(options.narrow_after_warmup);
        assert!(!options.service_filter.is_empty());
    }

    #[test]
    fn test_scan_options_builder() {
        let options = ScanOptions::new()
            .warmup(Duration::from_secs(3))
            .max_duration(Duration::from_secs(20))
            .narrow_after_warmup(false);
        assert_eq!(options.warmup, Duration::from_secs(3));
        assert_eq!(options.max_duration, Duration::from_secs(20));
        assert!(!options.narrow_after_warmup);
    }

    #[test]
    fn test_map_central_state() {
        assert_eq!(
            map_central_state(CentralState::PoweredOn),
            RadioState::PoweredOn
        );
        assert_eq!(
            map_central_state(CentralState::PoweredOff),
            RadioState::PoweredOff
        );
        assert_eq!(
            map_central_state(CentralState::Unknown),
            RadioState::Unknown
        );
    }

    #[test]
    fn test_session_default() {
        let session = ScanSession::default();
        assert!(!session.active);
        assert_eq!(session.radio_state, RadioState::Unknown);
    }

    #[test]
    fn test_known_services_include_capabilities() {
        let services = known_services();
        assert!(services.contains(&BATTERY_SERVICE));
        assert!(services.contains(&IMMEDIATE_ALERT_SERVICE));
        assert!(services.contains(&LINK_LOSS_SERVICE));
    }
}
