//! Event system for registry and connection notifications.
//!
//! All observable state changes flow through one broadcast channel: device
//! discovery and updates, connection transitions, saved-state changes, radio
//! power transitions, and the error/notification stream ([`Condition`]).
//! UI layers subscribe once and render from snapshots plus events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use pinpoint_types::{ConnectionState, DeviceCategory, RadioState};

/// Lightweight device reference carried inside events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    /// Stable device identity.
    pub id: String,
    /// Display name if known.
    pub name: Option<String>,
    /// Resolved category if known.
    pub category: Option<DeviceCategory>,
}

impl DeviceRef {
    /// Create a new device reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            category: None,
        }
    }

    /// Create a device reference with a name.
    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            category: None,
        }
    }
}

/// Why a scan session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ScanStopReason {
    /// The caller asked for the scan to stop.
    Requested,
    /// The bounded scan duration elapsed.
    DurationCap,
    /// The radio left the powered-on state while scanning.
    RadioLost,
}

/// A surfaced condition from the error taxonomy.
///
/// Conditions are observable, recoverable situations: they are reported on
/// the event stream instead of being thrown, and never terminate the
/// session or corrupt the device collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Condition {
    /// The radio is off, unauthorized, or unsupported; scanning and
    /// connecting are blocked until the state changes.
    RadioUnavailable {
        /// The observed radio state.
        state: RadioState,
    },
    /// A connection attempt exceeded its timeout bound.
    ConnectionTimeout,
    /// The radio stack rejected a connection attempt.
    ConnectionFailed {
        /// Human-readable failure reason.
        reason: String,
    },
    /// Service discovery retries were exhausted; the connection remains
    /// usable at reduced capability.
    ServiceDiscoveryDegraded {
        /// How many discovery attempts were made.
        attempts: u32,
    },
    /// An operation required an established connection.
    NotConnected,
    /// The location collaborator has no current position.
    LocationUnavailable,
    /// The persistence collaborator failed; in-memory state is unaffected.
    PersistenceFailure {
        /// Description of the failure.
        message: String,
    },
}

/// Events emitted by the registry, scan controller, and connection manager.
///
/// All events are serializable for logging and IPC. This enum is marked
/// `#[non_exhaustive]` to allow adding new event types in future versions
/// without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DeviceEvent {
    /// A device was seen for the first time.
    Discovered {
        device: DeviceRef,
        rssi: Option<i16>,
    },
    /// A known device re-advertised or refreshed its signal.
    Updated {
        device: DeviceRef,
        rssi: Option<i16>,
    },
    /// A device changed connection state.
    ConnectionChanged {
        device: DeviceRef,
        state: ConnectionState,
    },
    /// A battery level was read or notified.
    BatteryUpdated { device: DeviceRef, level: u8 },
    /// The user toggled the saved flag.
    SavedChanged { device: DeviceRef, saved: bool },
    /// The device was removed from the registry.
    Removed { device: DeviceRef },
    /// The user marked the device as physically located.
    Found { device: DeviceRef },
    /// The radio adapter changed power state.
    RadioStateChanged { state: RadioState },
    /// A scan session started.
    ScanStarted,
    /// A scan session stopped.
    ScanStopped { reason: ScanStopReason },
    /// A recoverable condition was surfaced.
    Condition {
        device: Option<DeviceRef>,
        condition: Condition,
    },
}

/// Sender for device events.
pub type EventSender = broadcast::Sender<DeviceEvent>;

/// Receiver for device events.
pub type EventReceiver = broadcast::Receiver<DeviceEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: DeviceEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Surface a condition, optionally tied to a device.
    pub fn condition(&self, device: Option<DeviceRef>, condition: Condition) {
        self.send(DeviceEvent::Condition { device, condition });
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatcher_delivers_to_subscribers() {
        let dispatcher = EventDispatcher::default();
        let mut rx = dispatcher.subscribe();

        dispatcher.send(DeviceEvent::ScanStarted);
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, DeviceEvent::ScanStarted));
    }

    #[test]
    fn test_send_without_subscribers_is_ok() {
        let dispatcher = EventDispatcher::new(8);
        dispatcher.send(DeviceEvent::ScanStarted);
        assert_eq!(dispatcher.receiver_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = DeviceEvent::Discovered {
            device: DeviceRef::with_name("dev-1", "Pixel Buds"),
            rssi: Some(-48),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"discovered\""));
        assert!(json.contains("Pixel Buds"));
    }

    #[test]
    fn test_condition_serialization() {
        let condition = Condition::RadioUnavailable {
            state: RadioState::PoweredOff,
        };
        let json = serde_json::to_string(&condition).unwrap();
        assert!(json.contains("radio_unavailable"));
    }
}
