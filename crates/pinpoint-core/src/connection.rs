//! Per-device connection lifecycle management.
//!
//! The [`ConnectionManager`] drives the per-device state machine
//! `Disconnected -> Connecting -> Connected -> ServiceDiscovery -> Ready`,
//! with failed attempts passing through `Failed` and teardown through
//! `Disconnecting`. Every connect attempt is guarded by a timeout that is
//! structurally exclusive with the success path: the losing future is
//! dropped the instant the other resolves, so exactly one outcome is ever
//! observed per attempt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pinpoint_types::ConnectionState;
use pinpoint_types::uuids::{
    ALERT_LEVEL, BATTERY_LEVEL, BATTERY_SERVICE, DEVICE_INFO_SERVICE, IMMEDIATE_ALERT_SERVICE,
    LINK_LOSS_SERVICE,
};

use crate::error::{ConnectionFailureReason, Error, Result};
use crate::events::{Condition, DeviceRef, EventDispatcher};
use crate::link::{GattCharacteristic, LinkProvider, PeripheralLink};
use crate::registry::DeviceRegistry;
use crate::retry::{RetryConfig, with_retry};

/// The kind of attention signal to send to a peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Audible alert (immediate-alert high level).
    Sound,
    /// Gentle alert (immediate-alert mild level).
    Vibrate,
}

impl SignalKind {
    fn alert_level(&self) -> u8 {
        match self {
            SignalKind::Sound => pinpoint_types::uuids::ALERT_LEVEL_HIGH,
            SignalKind::Vibrate => pinpoint_types::uuids::ALERT_LEVEL_MILD,
        }
    }
}

/// Services whose characteristics participate in the capability cascade.
const CAPABILITY_SERVICES: &[Uuid] = &[
    BATTERY_SERVICE,
    IMMEDIATE_ALERT_SERVICE,
    LINK_LOSS_SERVICE,
    DEVICE_INFO_SERVICE,
];

/// Configuration for connection behavior.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Bound on a single connection attempt.
    pub connect_timeout: Duration,
    /// Bound on a single characteristic read.
    pub read_timeout: Duration,
    /// Retry policy for the service-discovery cascade.
    pub discovery_retry: RetryConfig,
    /// Interval of the periodic signal refresh for connected devices.
    pub rssi_refresh_interval: Duration,
    /// Whether to refresh signal strength while connected.
    pub refresh_rssi: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(12),
            read_timeout: Duration::from_secs(5),
            discovery_retry: RetryConfig::for_discovery(),
            rssi_refresh_interval: Duration::from_secs(5),
            refresh_rssi: true,
        }
    }
}

impl ConnectionConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection attempt timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the characteristic read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the service-discovery retry policy.
    #[must_use]
    pub fn discovery_retry(mut self, retry: RetryConfig) -> Self {
        self.discovery_retry = retry;
        self
    }

    /// Enable or disable the periodic signal refresh.
    #[must_use]
    pub fn refresh_rssi(mut self, enabled: bool) -> Self {
        self.refresh_rssi = enabled;
        self
    }
}

/// A live connection: the link, its enumerated characteristics, and the
/// cancellation token owning the refresh timer.
struct ActiveLink {
    link: Arc<dyn PeripheralLink>,
    characteristics: Vec<GattCharacteristic>,
    refresh: CancellationToken,
}

/// Drives connection lifecycles against whichever [`LinkProvider`] the
/// session was started with (real radio or synthetic).
pub struct ConnectionManager {
    registry: Arc<DeviceRegistry>,
    events: EventDispatcher,
    provider: Arc<dyn LinkProvider>,
    config: ConnectionConfig,
    active: RwLock<HashMap<String, ActiveLink>>,
}

impl ConnectionManager {
    /// Create a connection manager.
    pub fn new(
        registry: Arc<DeviceRegistry>,
        events: EventDispatcher,
        provider: Arc<dyn LinkProvider>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            registry,
            events,
            provider,
            config,
            active: RwLock::new(HashMap::new()),
        }
    }

    /// Connect to a device by identity.
    ///
    /// No-op when the device is already connecting or connected. Fails
    /// immediately with `RadioUnavailable` when the provider's radio is
    /// not powered on (the synthetic provider always is). Otherwise runs
    /// the attempt under the configured timeout and, on success,
    /// automatically cascades into service discovery.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn connect(&self, identifier: &str) -> Result<()> {
        if let Some(state) = self.registry.connection_state(identifier).await
            && state.is_connecting_or_established()
        {
            debug!("connect is a no-op in state {}", state);
            return Ok(());
        }

        let radio = self.provider.radio_state().await;
        if !radio.is_available() {
            self.events.condition(
                Some(DeviceRef::new(identifier)),
                Condition::RadioUnavailable { state: radio },
            );
            return Err(Error::radio_unavailable(radio));
        }

        if !self.registry.begin_connect(identifier).await {
            if self.registry.get(identifier).await.is_none() {
                return Err(Error::device_not_found(identifier));
            }
            // Lost the race to a concurrent connect; that attempt owns the
            // state machine now.
            return Ok(());
        }

        let link = match self.provider.link_for(identifier).await {
            Ok(link) => link,
            Err(e) => {
                self.fail_attempt(identifier, ConnectionFailureReason::Other(e.to_string()))
                    .await;
                return Err(e);
            }
        };

        info!("connecting to {}", identifier);
        match timeout(self.config.connect_timeout, link.connect()).await {
            // Timer expired: the in-flight connect future is dropped here,
            // so a late success callback can never race the timeout.
            Err(_) => {
                warn!(
                    "connection to {} timed out after {:?}",
                    identifier, self.config.connect_timeout
                );
                self.registry
                    .mark_connection_state(identifier, ConnectionState::Failed)
                    .await;
                self.registry
                    .mark_connection_state(identifier, ConnectionState::Disconnected)
                    .await;
                self.events.condition(
                    Some(DeviceRef::new(identifier)),
                    Condition::ConnectionTimeout,
                );
                Err(Error::connection_timeout(
                    identifier,
                    self.config.connect_timeout,
                ))
            }
            Ok(Err(e)) => {
                let reason = match &e {
                    Error::Bluetooth(inner) => ConnectionFailureReason::BleError(inner.to_string()),
                    other => ConnectionFailureReason::Other(other.to_string()),
                };
                self.fail_attempt(identifier, reason.clone()).await;
                Err(Error::connection_failed(
                    Some(identifier.to_string()),
                    reason,
                ))
            }
            Ok(Ok(())) => {
                info!("connected to {}", identifier);
                self.registry
                    .mark_connection_state(identifier, ConnectionState::Connected)
                    .await;

                let refresh = CancellationToken::new();
                self.active.write().await.insert(
                    identifier.to_string(),
                    ActiveLink {
                        link: Arc::clone(&link),
                        characteristics: Vec::new(),
                        refresh: refresh.clone(),
                    },
                );

                if self.config.refresh_rssi {
                    tokio::spawn(Self::refresh_rssi_loop(
                        Arc::clone(&self.registry),
                        Arc::clone(&link),
                        identifier.to_string(),
                        self.config.rssi_refresh_interval,
                        refresh,
                    ));
                }

                self.discover_services(identifier, link).await;
                Ok(())
            }
        }
    }

    /// Record a failed attempt: `Failed`, then `Disconnected`, then the
    /// surfaced condition.
    async fn fail_attempt(&self, identifier: &str, reason: ConnectionFailureReason) {
        warn!("connection to {} failed: {}", identifier, reason);
        self.registry
            .mark_connection_state(identifier, ConnectionState::Failed)
            .await;
        self.registry
            .mark_connection_state(identifier, ConnectionState::Disconnected)
            .await;
        self.events.condition(
            Some(DeviceRef::new(identifier)),
            Condition::ConnectionFailed {
                reason: reason.to_string(),
            },
        );
    }

    /// The service/characteristic discovery cascade.
    ///
    /// Enumerates all GATT services under the bounded retry policy; walks
    /// characteristics of the known capability services, reading readable
    /// ones and subscribing to notifiable ones; then transitions to
    /// `Ready`. When retries are exhausted the device remains `Connected`
    /// at reduced capability: partial capability is acceptable, total
    /// failure is not forced.
    async fn discover_services(&self, identifier: &str, link: Arc<dyn PeripheralLink>) {
        self.registry
            .mark_connection_state(identifier, ConnectionState::ServiceDiscovery)
            .await;

        let retry = &self.config.discovery_retry;
        let discovered = with_retry(retry, "service discovery", || link.discover_services()).await;

        let characteristics = match discovered {
            Ok(characteristics) => characteristics,
            Err(e) => {
                let attempts = retry.max_retries + 1;
                warn!(
                    "service discovery for {} degraded after {} attempts: {}",
                    identifier, attempts, e
                );
                self.registry
                    .mark_connection_state(identifier, ConnectionState::Connected)
                    .await;
                self.events.condition(
                    Some(DeviceRef::new(identifier)),
                    Condition::ServiceDiscoveryDegraded { attempts },
                );
                return;
            }
        };

        for characteristic in &characteristics {
            if !CAPABILITY_SERVICES.contains(&characteristic.service) {
                continue;
            }

            if characteristic.uuid == BATTERY_LEVEL && characteristic.readable {
                match timeout(self.config.read_timeout, link.read(characteristic)).await {
                    Ok(Ok(data)) => {
                        if let Some(&level) = data.first() {
                            self.registry.apply_battery_level(identifier, level).await;
                        }
                    }
                    Ok(Err(e)) => debug!("battery read for {} failed: {}", identifier, e),
                    Err(_) => debug!("battery read for {} timed out", identifier),
                }
            }

            if characteristic.notifiable
                && let Err(e) = link.subscribe(characteristic).await
            {
                debug!(
                    "subscribe to {} on {} failed: {}",
                    characteristic.uuid, identifier, e
                );
            }
        }

        if let Some(entry) = self.active.write().await.get_mut(identifier) {
            entry.characteristics = characteristics;
        }

        self.registry
            .mark_connection_state(identifier, ConnectionState::Ready)
            .await;
        info!("{} is ready", identifier);
    }

    /// Disconnect from a device.
    ///
    /// No-op when already disconnected or disconnecting. The refresh timer
    /// is cancelled synchronously with the transition, and the device
    /// always lands in `Disconnected` regardless of whether the underlying
    /// callback carried an error; disconnection is always accepted.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn disconnect(&self, identifier: &str) -> Result<()> {
        let state = self.registry.connection_state(identifier).await;
        match state {
            None => return Ok(()),
            Some(
                ConnectionState::Disconnected
                | ConnectionState::Disconnecting
                | ConnectionState::Failed,
            ) => {
                debug!("disconnect is a no-op");
                return Ok(());
            }
            Some(ConnectionState::Connecting) => {
                // The in-flight attempt owns the state machine; it will
                // resolve on its own and can be disconnected afterwards.
                debug!("disconnect ignored while an attempt is in flight");
                return Ok(());
            }
            Some(_) => {}
        }

        self.registry
            .mark_connection_state(identifier, ConnectionState::Disconnecting)
            .await;

        let entry = self.active.write().await.remove(identifier);
        if let Some(entry) = entry {
            entry.refresh.cancel();
            if let Err(e) = entry.link.disconnect().await {
                // Accepted anyway; the state machine still lands in
                // Disconnected.
                warn!("disconnect from {} reported error: {}", identifier, e);
            }
        }

        self.registry
            .mark_connection_state(identifier, ConnectionState::Disconnected)
            .await;
        info!("disconnected from {}", identifier);
        Ok(())
    }

    /// Disconnect every active device.
    pub async fn disconnect_all(&self) {
        let identifiers: Vec<String> = self.active.read().await.keys().cloned().collect();
        for identifier in identifiers {
            if let Err(e) = self.disconnect(&identifier).await {
                warn!("disconnect of {} failed: {}", identifier, e);
            }
        }
    }

    /// Read the battery level of a connected device.
    ///
    /// Requires an established connection; the level is clamped and
    /// applied to the registry opportunistically.
    pub async fn read_battery(&self, identifier: &str) -> Result<u8> {
        let (link, characteristics) = self.established_link(identifier).await?;

        let battery_char = characteristics
            .iter()
            .find(|c| c.service == BATTERY_SERVICE && c.uuid == BATTERY_LEVEL && c.readable)
            .ok_or_else(|| Error::characteristic_not_found(BATTERY_LEVEL.to_string()))?;

        let data = timeout(self.config.read_timeout, link.read(battery_char))
            .await
            .map_err(|_| Error::timeout("read battery", self.config.read_timeout))??;

        let level = data
            .first()
            .copied()
            .ok_or_else(|| Error::InvalidData("empty battery payload".to_string()))?
            .min(100);

        self.registry.apply_battery_level(identifier, level).await;
        Ok(level)
    }

    /// Best-effort attention signal: immediate-alert first, link-loss
    /// alert level as fallback. The peripheral may support neither.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn send_signal(&self, identifier: &str, kind: SignalKind) -> Result<()> {
        let (link, characteristics) = self.established_link(identifier).await?;

        let primary = characteristics
            .iter()
            .find(|c| c.service == IMMEDIATE_ALERT_SERVICE && c.uuid == ALERT_LEVEL && c.writable);
        let fallback = characteristics
            .iter()
            .find(|c| c.service == LINK_LOSS_SERVICE && c.uuid == ALERT_LEVEL && c.writable);

        for target in [primary, fallback].into_iter().flatten() {
            match link.write(target, &[kind.alert_level()]).await {
                Ok(()) => {
                    info!("signalled {} via {}", identifier, target.service);
                    return Ok(());
                }
                Err(e) => {
                    debug!(
                        "signal via {} on {} failed: {}",
                        target.service, identifier, e
                    );
                }
            }
        }

        Err(Error::AlertUnsupported {
            device_id: identifier.to_string(),
        })
    }

    /// Resolve the active link for an established connection, surfacing a
    /// `NotConnected` condition otherwise.
    async fn established_link(
        &self,
        identifier: &str,
    ) -> Result<(Arc<dyn PeripheralLink>, Vec<GattCharacteristic>)> {
        let established = self
            .registry
            .connection_state(identifier)
            .await
            .is_some_and(|state| state.is_established());

        if !established {
            self.events
                .condition(Some(DeviceRef::new(identifier)), Condition::NotConnected);
            return Err(Error::NotConnected);
        }

        let active = self.active.read().await;
        let entry = active.get(identifier).ok_or(Error::NotConnected)?;
        Ok((Arc::clone(&entry.link), entry.characteristics.clone()))
    }

    /// Periodic signal refresh for one connected device. Cancelled
    /// synchronously on disconnect, so a stale timer never mutates a
    /// device after teardown.
    async fn refresh_rssi_loop(
        registry: Arc<DeviceRegistry>,
        link: Arc<dyn PeripheralLink>,
        identifier: String,
        interval: Duration,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(interval) => {
                    match link.rssi().await {
                        Ok(rssi) => registry.apply_rssi(&identifier, rssi).await,
                        Err(e) => debug!("rssi refresh for {} failed: {}", identifier, e),
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
