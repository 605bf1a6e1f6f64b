//! The canonical device record.
//!
//! A [`Device`] is an immutable snapshot of one physical peripheral as the
//! registry last reconciled it. Components never share mutable device
//! state: the registry hands out clones and applies every mutation itself.
//! The opaque radio handle is deliberately absent: links are resolved by
//! identity through [`crate::link::LinkProvider`], so handle ownership
//! stays with the radio session.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use pinpoint_types::{
    ConnectionState, Coordinate, DeviceCategory, SavedDevice, SignalQuality,
};

/// Canonical record for one physical peripheral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Stable identity: platform identifier for real devices, a generated
    /// UUID for synthetic ones.
    pub id: String,
    /// Display name; a placeholder when the advertisement carried none.
    pub name: String,
    /// Derived category. Once resolved to something concrete it is never
    /// reset to `Unknown`.
    pub category: DeviceCategory,
    /// Last observed raw signal strength in dBm.
    pub rssi: Option<i16>,
    /// Qualitative signal bucket derived from `rssi`.
    pub signal: SignalQuality,
    /// Estimated distance in metres derived from `rssi`.
    pub distance: f64,
    /// Timestamp of the most recent discovery or connection activity.
    pub last_seen: OffsetDateTime,
    /// Battery percentage (0-100), populated opportunistically after
    /// connection.
    pub battery: Option<u8>,
    /// Connection lifecycle state.
    pub connection: ConnectionState,
    /// User-favorited flag.
    pub saved: bool,
    /// Last known coordinate, set while connected or on explicit
    /// mark-found.
    pub location: Option<Coordinate>,
}

impl Device {
    /// Whether a usable link currently exists.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_established()
    }

    /// Geographic distance from `origin` in metres, when the device has a
    /// known location.
    #[must_use]
    pub fn geo_distance_from(&self, origin: &Coordinate) -> Option<f64> {
        self.location.map(|loc| origin.distance_to(&loc))
    }

    /// Project this record into its persisted form.
    #[must_use]
    pub fn to_saved(&self) -> SavedDevice {
        SavedDevice {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category,
            last_seen: Some(self.last_seen),
        }
    }
}

/// Caller-selectable ordering of the device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceOrdering {
    /// Stable sort by name ascending (the default).
    #[default]
    Name,
    /// Strongest signal first; devices without a reading sort last.
    SignalStrength,
    /// Most recently seen first.
    LastSeen,
}

/// Sort a device list in place. Ties are always broken by name, then id,
/// so the ordering is total and stable across calls.
pub fn sort_devices(devices: &mut [Device], ordering: DeviceOrdering) {
    match ordering {
        DeviceOrdering::Name => {
            devices.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        }
        DeviceOrdering::SignalStrength => {
            devices.sort_by(|a, b| {
                // None sorts last; stronger (less negative) first
                b.rssi
                    .cmp(&a.rssi)
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        DeviceOrdering::LastSeen => {
            devices.sort_by(|a, b| {
                b.last_seen
                    .cmp(&a.last_seen)
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
    }
}
