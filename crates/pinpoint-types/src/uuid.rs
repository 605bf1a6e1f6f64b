//! Bluetooth SIG UUIDs used by Pinpoint.
//!
//! This module contains the GATT service and characteristic UUIDs the
//! connection manager and classifier care about, along with the BLE
//! manufacturer IDs used for advertisement signatures.

use uuid::{Uuid, uuid};

// --- Standard GATT service UUIDs ---

/// Generic Access Profile (GAP) service.
pub const GAP_SERVICE: Uuid = uuid!("00001800-0000-1000-8000-00805f9b34fb");

/// Immediate Alert service (used to make a device beep or flash).
pub const IMMEDIATE_ALERT_SERVICE: Uuid = uuid!("00001802-0000-1000-8000-00805f9b34fb");

/// Link Loss service (alert on disconnection; fallback signalling path).
pub const LINK_LOSS_SERVICE: Uuid = uuid!("00001803-0000-1000-8000-00805f9b34fb");

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

/// Heart Rate service (advertised by watches and fitness trackers).
pub const HEART_RATE_SERVICE: Uuid = uuid!("0000180d-0000-1000-8000-00805f9b34fb");

/// Battery service.
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

/// Human Interface Device service (keyboards, mice).
pub const HID_SERVICE: Uuid = uuid!("00001812-0000-1000-8000-00805f9b34fb");

// --- Audio profile UUIDs (advertised by headphones and speakers) ---

/// Audio Sink (A2DP sink).
pub const AUDIO_SINK_SERVICE: Uuid = uuid!("0000110b-0000-1000-8000-00805f9b34fb");

/// Advanced Audio Distribution profile.
pub const ADVANCED_AUDIO_SERVICE: Uuid = uuid!("0000110d-0000-1000-8000-00805f9b34fb");

/// A/V Remote Control profile.
pub const AV_REMOTE_CONTROL_SERVICE: Uuid = uuid!("0000110e-0000-1000-8000-00805f9b34fb");

/// Handsfree profile.
pub const HANDSFREE_SERVICE: Uuid = uuid!("0000111e-0000-1000-8000-00805f9b34fb");

// --- Characteristic UUIDs ---

/// Device name characteristic (GAP).
pub const DEVICE_NAME: Uuid = uuid!("00002a00-0000-1000-8000-00805f9b34fb");

/// Appearance characteristic (GAP).
pub const APPEARANCE: Uuid = uuid!("00002a01-0000-1000-8000-00805f9b34fb");

/// Alert Level characteristic (Immediate Alert and Link Loss services).
pub const ALERT_LEVEL: Uuid = uuid!("00002a06-0000-1000-8000-00805f9b34fb");

/// Battery level characteristic.
pub const BATTERY_LEVEL: Uuid = uuid!("00002a19-0000-1000-8000-00805f9b34fb");

/// Model number string characteristic.
pub const MODEL_NUMBER: Uuid = uuid!("00002a24-0000-1000-8000-00805f9b34fb");

/// Manufacturer name string characteristic.
pub const MANUFACTURER_NAME: Uuid = uuid!("00002a29-0000-1000-8000-00805f9b34fb");

// --- Alert Level values ---

/// No alert.
pub const ALERT_LEVEL_NONE: u8 = 0x00;

/// Mild alert (typically a vibration or soft tone).
pub const ALERT_LEVEL_MILD: u8 = 0x01;

/// High alert (typically a loud tone).
pub const ALERT_LEVEL_HIGH: u8 = 0x02;

// --- Manufacturer IDs for advertisement signatures ---

/// Apple Inc. company identifier.
pub const APPLE_MANUFACTURER_ID: u16 = 0x004C;

/// Microsoft company identifier.
pub const MICROSOFT_MANUFACTURER_ID: u16 = 0x0006;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_service_uuids() {
        assert_eq!(
            BATTERY_SERVICE.to_string(),
            "0000180f-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            IMMEDIATE_ALERT_SERVICE.to_string(),
            "00001802-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            LINK_LOSS_SERVICE.to_string(),
            "00001803-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_characteristic_uuids_use_16_bit_form() {
        for uuid in [DEVICE_NAME, APPEARANCE, ALERT_LEVEL, BATTERY_LEVEL] {
            assert!(
                uuid.to_string().starts_with("00002a"),
                "UUID {} should start with 00002a",
                uuid
            );
        }
    }

    #[test]
    fn test_alert_levels_are_distinct() {
        assert_ne!(ALERT_LEVEL_NONE, ALERT_LEVEL_MILD);
        assert_ne!(ALERT_LEVEL_MILD, ALERT_LEVEL_HIGH);
    }

    #[test]
    fn test_service_uuids_are_distinct() {
        let uuids = [
            GAP_SERVICE,
            IMMEDIATE_ALERT_SERVICE,
            LINK_LOSS_SERVICE,
            DEVICE_INFO_SERVICE,
            HEART_RATE_SERVICE,
            BATTERY_SERVICE,
            HID_SERVICE,
            AUDIO_SINK_SERVICE,
        ];
        for (i, a) in uuids.iter().enumerate() {
            for b in &uuids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
