//! End-to-end tests of the synthetic discovery pipeline.
//!
//! These exercise the full stack (synthetic source, registry, connection
//! manager, persistence) exactly the way a real radio session would,
//! with no hardware required.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use pinpoint_core::connection::{ConnectionConfig, ConnectionManager, SignalKind};
use pinpoint_core::events::EventDispatcher;
use pinpoint_core::persist::MemoryStore;
use pinpoint_core::registry::DeviceRegistry;
use pinpoint_core::synthetic::{CATALOG, SyntheticOptions, SyntheticSource};
use pinpoint_core::{DeviceOrdering, PathLossModel};
use pinpoint_types::{ConnectionState, DeviceCategory};

struct Session {
    registry: Arc<DeviceRegistry>,
    source: Arc<SyntheticSource>,
    connections: ConnectionManager,
    store: Arc<MemoryStore>,
}

fn session() -> Session {
    let events = EventDispatcher::new(512);
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(DeviceRegistry::with_collaborators(
        events.clone(),
        PathLossModel::default(),
        Arc::new(pinpoint_core::NoLocation),
        Some(store.clone()),
    ));
    let source = Arc::new(SyntheticSource::new(
        Arc::clone(&registry),
        events.clone(),
        SyntheticOptions::fast(),
    ));
    let connections = ConnectionManager::new(
        Arc::clone(&registry),
        events,
        Arc::clone(&source) as _,
        ConnectionConfig::default().refresh_rssi(false),
    );
    Session {
        registry,
        source,
        connections,
        store,
    }
}

#[tokio::test(start_paused = true)]
async fn synthetic_pipeline_discovers_and_connects() {
    let s = session();
    s.source.start_scanning().await.unwrap();

    // Let the whole catalog appear and re-advertise.
    sleep(Duration::from_secs(5)).await;

    let devices = s.registry.devices(DeviceOrdering::SignalStrength).await;
    assert_eq!(devices.len(), CATALOG.len());
    // Signal ordering is strongest-first.
    for pair in devices.windows(2) {
        assert!(pair[0].rssi >= pair[1].rssi);
    }

    // Connect to the headphones profile; synthetic links go all the way
    // to Ready and report battery during the cascade.
    let target = devices
        .iter()
        .find(|d| d.category == DeviceCategory::Headphones)
        .unwrap()
        .id
        .clone();
    s.connections.connect(&target).await.unwrap();
    let connected = s.registry.get(&target).await.unwrap();
    assert_eq!(connected.connection, ConnectionState::Ready);
    assert!(connected.battery.is_some());

    // Signalling uses the synthetic immediate-alert characteristic.
    s.connections
        .send_signal(&target, SignalKind::Sound)
        .await
        .unwrap();

    // Battery reads on demand while connected.
    let level = s.connections.read_battery(&target).await.unwrap();
    assert!(level <= 100);

    s.connections.disconnect(&target).await.unwrap();
    assert_eq!(
        s.registry.get(&target).await.unwrap().connection,
        ConnectionState::Disconnected
    );
}

// Real time here: persistence runs on the blocking pool, which paused
// virtual time does not track.
#[tokio::test]
async fn saved_devices_survive_a_session_restart() {
    let s = session();
    s.source.start_scanning().await.unwrap();
    sleep(Duration::from_millis(500)).await;

    let device = s
        .registry
        .devices(DeviceOrdering::Name)
        .await
        .into_iter()
        .next()
        .unwrap();
    assert_eq!(s.registry.toggle_saved(&device.id).await, Some(true));

    // Let the fire-and-forget persistence task run.
    sleep(Duration::from_millis(200)).await;
    let persisted = s.store.snapshot();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].id, device.id);
    assert_eq!(persisted[0].name, device.name);
    assert_eq!(persisted[0].category, device.category);

    // A fresh registry over the same store hydrates the saved device.
    let events = EventDispatcher::new(64);
    let restarted = DeviceRegistry::with_collaborators(
        events,
        PathLossModel::default(),
        Arc::new(pinpoint_core::NoLocation),
        Some(s.store.clone()),
    );
    assert_eq!(restarted.hydrate_saved().await.unwrap(), 1);
    let hydrated = restarted.get(&device.id).await.unwrap();
    assert!(hydrated.saved);
    assert_eq!(hydrated.name, device.name);
    assert_eq!(hydrated.connection, ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn connect_is_idempotent_through_the_full_stack() {
    let s = session();
    s.source.start_scanning().await.unwrap();
    sleep(Duration::from_secs(5)).await;

    let target = s.registry.devices(DeviceOrdering::Name).await[0].id.clone();
    s.connections.connect(&target).await.unwrap();
    assert_eq!(
        s.registry.connection_state(&target).await,
        Some(ConnectionState::Ready)
    );

    // A second connect is a no-op; the state machine is untouched.
    s.connections.connect(&target).await.unwrap();
    assert_eq!(
        s.registry.connection_state(&target).await,
        Some(ConnectionState::Ready)
    );
}

#[tokio::test(start_paused = true)]
async fn stop_scanning_freezes_the_population() {
    let s = session();
    s.source.start_scanning().await.unwrap();
    sleep(Duration::from_secs(5)).await;
    let count = s.registry.len().await;
    assert_eq!(count, CATALOG.len());

    s.source.stop_scanning().await;
    sleep(Duration::from_secs(30)).await;
    // Stale devices are never removed automatically.
    assert_eq!(s.registry.len().await, count);
}
