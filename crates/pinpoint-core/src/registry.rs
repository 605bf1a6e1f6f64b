//! The device registry: single source of truth for all device state.
//!
//! Every mutation of the device collection goes through this type, which
//! applies it atomically under a write lock and emits the corresponding
//! event. Reads hand out snapshots, so observers never alias live mutable
//! state. Discovery, connection, battery, and user actions (save, remove,
//! mark found) all converge here.

use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use pinpoint_types::{ConnectionState, DeviceCategory, SavedDevice, SignalQuality};

use crate::advertisement::AdvertisementMeta;
use crate::classify::classify;
use crate::device::{Device, DeviceOrdering, sort_devices};
use crate::error::Result;
use crate::events::{Condition, DeviceEvent, DeviceRef, EventDispatcher};
use crate::location::{LocationProvider, NoLocation};
use crate::persist::SavedDeviceStore;
use crate::proximity::PathLossModel;
use crate::util::short_id;

/// The single authoritative upsert point for all device state.
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Device>>,
    events: EventDispatcher,
    path_loss: PathLossModel,
    location: Arc<dyn LocationProvider>,
    store: Option<Arc<dyn SavedDeviceStore>>,
}

impl DeviceRegistry {
    /// Create a registry with no persistence and no location source.
    pub fn new(events: EventDispatcher) -> Self {
        Self::with_collaborators(events, PathLossModel::default(), Arc::new(NoLocation), None)
    }

    /// Create a registry wired to its external collaborators.
    pub fn with_collaborators(
        events: EventDispatcher,
        path_loss: PathLossModel,
        location: Arc<dyn LocationProvider>,
        store: Option<Arc<dyn SavedDeviceStore>>,
    ) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            events,
            path_loss,
            location,
            store,
        }
    }

    /// The event dispatcher observers subscribe to.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    fn device_ref(device: &Device) -> DeviceRef {
        DeviceRef {
            id: device.id.clone(),
            name: Some(device.name.clone()),
            category: Some(device.category),
        }
    }

    /// Load persisted saved devices into the registry at startup.
    ///
    /// Already-known identities are left untouched. Returns how many
    /// records were hydrated.
    pub async fn hydrate_saved(&self) -> Result<usize> {
        let Some(store) = self.store.clone() else {
            return Ok(0);
        };

        let saved = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| crate::error::Error::Persistence(e.to_string()))??;

        let mut devices = self.devices.write().await;
        let mut hydrated = 0;
        for record in saved {
            if devices.contains_key(&record.id) {
                continue;
            }
            let device = Device {
                id: record.id.clone(),
                name: record.name,
                category: record.category,
                rssi: None,
                signal: SignalQuality::Unknown,
                distance: self.path_loss.distance(None),
                last_seen: record.last_seen.unwrap_or(OffsetDateTime::UNIX_EPOCH),
                battery: None,
                connection: ConnectionState::Disconnected,
                saved: true,
                location: None,
            };
            devices.insert(record.id, device);
            hydrated += 1;
        }

        if hydrated > 0 {
            info!("hydrated {} saved device(s)", hydrated);
        }
        Ok(hydrated)
    }

    /// Reconcile a discovery event into the collection.
    ///
    /// Creates a new record on first sight of an identity; otherwise
    /// updates signal, last-seen, and (while the category is still
    /// unknown) re-runs the classifier. A resolved category is never
    /// downgraded back to unknown. Every call results in either a create
    /// or an update.
    pub async fn upsert_from_discovery(
        &self,
        identifier: &str,
        rssi: Option<i16>,
        meta: &AdvertisementMeta,
    ) {
        let event = {
            let mut devices = self.devices.write().await;
            let now = OffsetDateTime::now_utc();

            match devices.get_mut(identifier) {
                Some(device) => {
                    if let Some(rssi) = rssi {
                        device.rssi = Some(rssi);
                        device.signal = SignalQuality::from_rssi(rssi);
                        device.distance = self.path_loss.distance(Some(rssi));
                    }
                    device.last_seen = now;

                    // A later advertisement may carry the name an earlier
                    // one lacked.
                    if let Some(name) = &meta.local_name
                        && device.name.starts_with("Unknown device")
                    {
                        device.name = name.clone();
                    }

                    if device.category == DeviceCategory::Unknown {
                        let category = classify(meta, Some(&device.name));
                        if category.is_known() {
                            device.category = category;
                        }
                    }

                    DeviceEvent::Updated {
                        device: Self::device_ref(device),
                        rssi,
                    }
                }
                None => {
                    let name = meta
                        .local_name
                        .clone()
                        .unwrap_or_else(|| format!("Unknown device {}", short_id(identifier)));
                    let category = classify(meta, Some(&name));
                    let device = Device {
                        id: identifier.to_string(),
                        name,
                        category,
                        rssi,
                        signal: SignalQuality::from_optional_rssi(rssi),
                        distance: self.path_loss.distance(rssi),
                        last_seen: now,
                        battery: None,
                        connection: ConnectionState::Disconnected,
                        saved: false,
                        location: None,
                    };
                    debug!("discovered {} ({})", device.name, identifier);
                    let event = DeviceEvent::Discovered {
                        device: Self::device_ref(&device),
                        rssi,
                    };
                    devices.insert(identifier.to_string(), device);
                    event
                }
            }
        };

        self.events.send(event);
    }

    /// Create a minimal record for an identity observed outside discovery
    /// (e.g. a connect callback for a previously unlisted peripheral).
    pub async fn ensure_device(&self, identifier: &str, name: Option<&str>) {
        let known = self.devices.read().await.contains_key(identifier);
        if known {
            return;
        }
        let meta = match name {
            Some(name) => AdvertisementMeta::with_name(name),
            None => AdvertisementMeta::default(),
        };
        self.upsert_from_discovery(identifier, None, &meta).await;
    }

    /// Record a connection state transition.
    ///
    /// No-op for unknown identities, so a late callback can never mutate a
    /// removed device.
    pub async fn mark_connection_state(&self, identifier: &str, state: ConnectionState) {
        let event = {
            let mut devices = self.devices.write().await;
            match devices.get_mut(identifier) {
                Some(device) => {
                    device.connection = state;
                    device.last_seen = OffsetDateTime::now_utc();
                    Some(DeviceEvent::ConnectionChanged {
                        device: Self::device_ref(device),
                        state,
                    })
                }
                None => {
                    debug!("state change for unknown device {} ignored", identifier);
                    None
                }
            }
        };
        if let Some(event) = event {
            self.events.send(event);
        }
    }

    /// Atomically claim a device for a connection attempt.
    ///
    /// Returns `true` and transitions to `Connecting` only when the device
    /// exists and no attempt or connection is in flight; concurrent
    /// connects collapse to a single attempt.
    pub async fn begin_connect(&self, identifier: &str) -> bool {
        let event = {
            let mut devices = self.devices.write().await;
            match devices.get_mut(identifier) {
                Some(device)
                    if !device.connection.is_connecting_or_established()
                        && device.connection != ConnectionState::Disconnecting =>
                {
                    device.connection = ConnectionState::Connecting;
                    device.last_seen = OffsetDateTime::now_utc();
                    Some(DeviceEvent::ConnectionChanged {
                        device: Self::device_ref(device),
                        state: ConnectionState::Connecting,
                    })
                }
                _ => None,
            }
        };
        match event {
            Some(event) => {
                self.events.send(event);
                true
            }
            None => false,
        }
    }

    /// Apply an opportunistic battery reading. Clamped to 0-100; no-op for
    /// unknown identities.
    pub async fn apply_battery_level(&self, identifier: &str, percent: u8) {
        let level = percent.min(100);
        let event = {
            let mut devices = self.devices.write().await;
            devices.get_mut(identifier).map(|device| {
                device.battery = Some(level);
                device.last_seen = OffsetDateTime::now_utc();
                DeviceEvent::BatteryUpdated {
                    device: Self::device_ref(device),
                    level,
                }
            })
        };
        if let Some(event) = event {
            self.events.send(event);
        }
    }

    /// Apply a signal refresh for a connected device.
    pub async fn apply_rssi(&self, identifier: &str, rssi: Option<i16>) {
        if rssi.is_none() {
            return;
        }
        let event = {
            let mut devices = self.devices.write().await;
            devices.get_mut(identifier).map(|device| {
                device.rssi = rssi;
                device.signal = SignalQuality::from_optional_rssi(rssi);
                device.distance = self.path_loss.distance(rssi);
                device.last_seen = OffsetDateTime::now_utc();
                DeviceEvent::Updated {
                    device: Self::device_ref(device),
                    rssi,
                }
            })
        };
        if let Some(event) = event {
            self.events.send(event);
        }
    }

    /// Toggle the user-favorited flag.
    ///
    /// Returns the new flag, or `None` for unknown identities. The saved
    /// subset is persisted fire-and-forget.
    pub async fn toggle_saved(&self, identifier: &str) -> Option<bool> {
        let (event, saved, snapshot) = {
            let mut devices = self.devices.write().await;
            let device = devices.get_mut(identifier)?;
            device.saved = !device.saved;
            let saved = device.saved;
            let event = DeviceEvent::SavedChanged {
                device: Self::device_ref(device),
                saved,
            };
            let snapshot = Self::saved_snapshot(&devices);
            (event, saved, snapshot)
        };

        self.events.send(event);
        self.persist_snapshot(snapshot);
        Some(saved)
    }

    /// Remove a device from the registry (explicit user action).
    ///
    /// Returns whether the identity was known. If the device was saved,
    /// the persisted subset is rewritten.
    pub async fn remove(&self, identifier: &str) -> bool {
        let removed = {
            let mut devices = self.devices.write().await;
            let removed = devices.remove(identifier);
            removed.map(|device| {
                let snapshot = device.saved.then(|| Self::saved_snapshot(&devices));
                (device, snapshot)
            })
        };

        match removed {
            Some((device, snapshot)) => {
                info!("removed device {} ({})", device.name, device.id);
                self.events.send(DeviceEvent::Removed {
                    device: Self::device_ref(&device),
                });
                if let Some(snapshot) = snapshot {
                    self.persist_snapshot(snapshot);
                }
                true
            }
            None => false,
        }
    }

    /// Record that the user physically located this device.
    ///
    /// Stamps a location snapshot from the location collaborator and
    /// refreshes last-seen, without touching connection or saved state.
    /// When no position is available the stamp is skipped and a
    /// `LocationUnavailable` condition is surfaced.
    pub async fn mark_found(&self, identifier: &str) {
        let position = self.location.current_position();

        let (event, missing_position) = {
            let mut devices = self.devices.write().await;
            match devices.get_mut(identifier) {
                Some(device) => {
                    device.last_seen = OffsetDateTime::now_utc();
                    if let Some(position) = position {
                        device.location = Some(position);
                    }
                    (
                        Some(DeviceEvent::Found {
                            device: Self::device_ref(device),
                        }),
                        position.is_none(),
                    )
                }
                None => (None, false),
            }
        };

        if let Some(event) = event {
            if missing_position {
                self.events.condition(
                    Some(DeviceRef::new(identifier)),
                    Condition::LocationUnavailable,
                );
            }
            self.events.send(event);
        }
    }

    /// Snapshot of the live collection in the requested ordering.
    pub async fn devices(&self, ordering: DeviceOrdering) -> Vec<Device> {
        let mut list: Vec<Device> = self.devices.read().await.values().cloned().collect();
        sort_devices(&mut list, ordering);
        list
    }

    /// Snapshot of a single device.
    pub async fn get(&self, identifier: &str) -> Option<Device> {
        self.devices.read().await.get(identifier).cloned()
    }

    /// Current connection state of a device.
    pub async fn connection_state(&self, identifier: &str) -> Option<ConnectionState> {
        self.devices
            .read()
            .await
            .get(identifier)
            .map(|d| d.connection)
    }

    /// Number of devices in the registry.
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    fn saved_snapshot(devices: &HashMap<String, Device>) -> Vec<SavedDevice> {
        let mut saved: Vec<SavedDevice> = devices
            .values()
            .filter(|d| d.saved)
            .map(Device::to_saved)
            .collect();
        saved.sort_by(|a, b| a.id.cmp(&b.id));
        saved
    }

    /// Persist the saved subset without blocking the caller. A store
    /// failure is logged and surfaced, never rolled back.
    fn persist_snapshot(&self, snapshot: Vec<SavedDevice>) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let events = self.events.clone();
        tokio::spawn(async move {
            match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("failed to persist saved devices: {}", e);
                    events.condition(
                        None,
                        Condition::PersistenceFailure {
                            message: e.to_string(),
                        },
                    );
                }
                Err(e) => warn!("persistence task failed: {}", e),
            }
        });
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::FixedLocation;
    use crate::persist::MemoryStore;
    use pinpoint_types::Coordinate;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new(EventDispatcher::new(64))
    }

    fn registry_with_store() -> (DeviceRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let registry = DeviceRegistry::with_collaborators(
            EventDispatcher::new(64),
            PathLossModel::default(),
            Arc::new(NoLocation),
            Some(store.clone()),
        );
        (registry, store)
    }

    async fn settle() {
        // Let fire-and-forget persistence tasks (blocking pool) run.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_repeated_discovery_yields_one_device() {
        let registry = registry();
        for rssi in [-45, -50, -60, -55] {
            registry
                .upsert_from_discovery("A", Some(rssi), &AdvertisementMeta::default())
                .await;
        }
        assert_eq!(registry.len().await, 1);
        let device = registry.get("A").await.unwrap();
        assert_eq!(device.rssi, Some(-55));
    }

    #[tokio::test]
    async fn test_signal_downgrade_scenario() {
        let registry = registry();
        registry
            .upsert_from_discovery("A", Some(-45), &AdvertisementMeta::default())
            .await;
        let near = registry.get("A").await.unwrap();

        registry
            .upsert_from_discovery("A", Some(-70), &AdvertisementMeta::default())
            .await;
        let far = registry.get("A").await.unwrap();

        assert_eq!(registry.len().await, 1);
        assert_eq!(far.rssi, Some(-70));
        assert!(far.signal < near.signal);
        assert!(far.distance > near.distance);
    }

    #[tokio::test]
    async fn test_category_monotonic() {
        let registry = registry();
        registry
            .upsert_from_discovery("A", None, &AdvertisementMeta::with_name("Pixel Buds"))
            .await;
        assert_eq!(
            registry.get("A").await.unwrap().category,
            DeviceCategory::Headphones
        );

        // A later anonymous advertisement must not reset the category.
        registry
            .upsert_from_discovery("A", Some(-70), &AdvertisementMeta::default())
            .await;
        assert_eq!(
            registry.get("A").await.unwrap().category,
            DeviceCategory::Headphones
        );
    }

    #[tokio::test]
    async fn test_unknown_category_resolved_later() {
        let registry = registry();
        registry
            .upsert_from_discovery("A", None, &AdvertisementMeta::default())
            .await;
        assert_eq!(
            registry.get("A").await.unwrap().category,
            DeviceCategory::Unknown
        );

        registry
            .upsert_from_discovery("A", None, &AdvertisementMeta::with_name("Galaxy Watch6"))
            .await;
        let device = registry.get("A").await.unwrap();
        assert_eq!(device.category, DeviceCategory::Watch);
        assert_eq!(device.name, "Galaxy Watch6");
    }

    #[tokio::test]
    async fn test_placeholder_name_assigned() {
        let registry = registry();
        registry
            .upsert_from_discovery("AA:BB:CC:DD:EE:FF", None, &AdvertisementMeta::default())
            .await;
        let device = registry.get("AA:BB:CC:DD:EE:FF").await.unwrap();
        assert!(device.name.starts_with("Unknown device"));
        assert!(device.name.contains("EEFF"));
    }

    #[tokio::test]
    async fn test_battery_clamped_and_unknown_ignored() {
        let registry = registry();
        registry
            .upsert_from_discovery("A", None, &AdvertisementMeta::default())
            .await;

        registry.apply_battery_level("A", 150).await;
        assert_eq!(registry.get("A").await.unwrap().battery, Some(100));

        registry.apply_battery_level("ghost", 50).await;
        assert!(registry.get("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_toggle_saved_persists_subset() {
        let (registry, store) = registry_with_store();
        registry
            .upsert_from_discovery("A", None, &AdvertisementMeta::with_name("Pixel Buds"))
            .await;

        assert_eq!(registry.toggle_saved("A").await, Some(true));
        settle().await;
        let persisted = store.snapshot();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].id, "A");

        assert_eq!(registry.toggle_saved("A").await, Some(false));
        settle().await;
        assert!(store.snapshot().is_empty());

        assert_eq!(registry.toggle_saved("ghost").await, None);
    }

    #[tokio::test]
    async fn test_remove_rewrites_saved_subset() {
        let (registry, store) = registry_with_store();
        registry
            .upsert_from_discovery("A", None, &AdvertisementMeta::default())
            .await;
        registry.toggle_saved("A").await;
        settle().await;
        assert_eq!(store.snapshot().len(), 1);

        assert!(registry.remove("A").await);
        settle().await;
        assert!(store.snapshot().is_empty());
        assert_eq!(registry.len().await, 0);

        assert!(!registry.remove("A").await);
    }

    #[tokio::test]
    async fn test_mark_found_stamps_location() {
        let position = Coordinate::new(48.8584, 2.2945);
        let registry = DeviceRegistry::with_collaborators(
            EventDispatcher::new(64),
            PathLossModel::default(),
            Arc::new(FixedLocation(position)),
            None,
        );
        registry
            .upsert_from_discovery("A", None, &AdvertisementMeta::default())
            .await;
        let before = registry.get("A").await.unwrap();
        assert!(before.location.is_none());

        registry.mark_found("A").await;
        let after = registry.get("A").await.unwrap();
        assert_eq!(after.location, Some(position));
        assert_eq!(after.connection, before.connection);
        assert_eq!(after.saved, before.saved);
    }

    #[tokio::test]
    async fn test_mark_found_without_position_surfaces_condition() {
        let registry = registry();
        registry
            .upsert_from_discovery("A", None, &AdvertisementMeta::default())
            .await;
        let mut rx = registry.events().subscribe();

        registry.mark_found("A").await;

        let mut saw_condition = false;
        let mut saw_found = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                DeviceEvent::Condition {
                    condition: Condition::LocationUnavailable,
                    ..
                } => saw_condition = true,
                DeviceEvent::Found { .. } => saw_found = true,
                _ => {}
            }
        }
        assert!(saw_condition);
        assert!(saw_found);
        assert!(registry.get("A").await.unwrap().location.is_none());
    }

    #[tokio::test]
    async fn test_begin_connect_is_atomic() {
        let registry = registry();
        registry
            .upsert_from_discovery("A", None, &AdvertisementMeta::default())
            .await;

        assert!(registry.begin_connect("A").await);
        // Second claim while the first is in flight must lose.
        assert!(!registry.begin_connect("A").await);
        assert_eq!(
            registry.connection_state("A").await,
            Some(ConnectionState::Connecting)
        );

        assert!(!registry.begin_connect("ghost").await);
    }

    #[tokio::test]
    async fn test_connection_state_for_unknown_device_ignored() {
        let registry = registry();
        registry
            .mark_connection_state("ghost", ConnectionState::Connected)
            .await;
        assert!(registry.get("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_device_ordering() {
        let registry = registry();
        registry
            .upsert_from_discovery("1", Some(-80), &AdvertisementMeta::with_name("Zed"))
            .await;
        registry
            .upsert_from_discovery("2", Some(-40), &AdvertisementMeta::with_name("Alpha"))
            .await;

        let by_name = registry.devices(DeviceOrdering::Name).await;
        assert_eq!(by_name[0].name, "Alpha");

        let by_signal = registry.devices(DeviceOrdering::SignalStrength).await;
        assert_eq!(by_signal[0].id, "2");

        let by_seen = registry.devices(DeviceOrdering::LastSeen).await;
        assert_eq!(by_seen[0].id, "2"); // most recently upserted
    }

    #[tokio::test]
    async fn test_hydrate_saved() {
        let store = Arc::new(MemoryStore::with_devices(vec![SavedDevice {
            id: "A".to_string(),
            name: "Pixel Buds".to_string(),
            category: DeviceCategory::Headphones,
            last_seen: None,
        }]));
        let registry = DeviceRegistry::with_collaborators(
            EventDispatcher::new(64),
            PathLossModel::default(),
            Arc::new(NoLocation),
            Some(store),
        );

        assert_eq!(registry.hydrate_saved().await.unwrap(), 1);
        let device = registry.get("A").await.unwrap();
        assert!(device.saved);
        assert_eq!(device.category, DeviceCategory::Headphones);
        assert_eq!(device.connection, ConnectionState::Disconnected);

        // Hydrating again does not duplicate.
        assert_eq!(registry.hydrate_saved().await.unwrap(), 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_ensure_device_minimal_record() {
        let registry = registry();
        registry.ensure_device("ext-1", None).await;
        let device = registry.get("ext-1").await.unwrap();
        assert!(device.name.starts_with("Unknown device"));

        // Idempotent for known identities.
        registry.ensure_device("ext-1", Some("Named Later")).await;
        assert_eq!(registry.len().await, 1);
        // ensure_device never overwrites an existing record
        assert!(registry.get("ext-1").await.unwrap().name.starts_with("Unknown device"));
    }
}
