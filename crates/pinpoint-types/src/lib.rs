//! Platform-agnostic types for the Pinpoint device finder.
//!
//! This crate provides the shared vocabulary used across the Pinpoint
//! workspace: device categories, signal-quality buckets, connection and
//! radio states, geographic coordinates, the persisted saved-device record,
//! and the GATT UUID constants the core crate cares about.
//!
//! # Example
//!
//! ```
//! use pinpoint_types::{DeviceCategory, SignalQuality};
//!
//! assert_eq!(SignalQuality::from_rssi(-50), SignalQuality::Excellent);
//! assert_eq!(DeviceCategory::from_name("Pixel Buds"), Some(DeviceCategory::Headphones));
//! ```

pub mod error;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use types::{
    ConnectionState, Coordinate, DeviceCategory, RadioState, SavedDevice, SignalQuality,
};
pub use uuid as uuids;

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    // --- DeviceCategory tests ---

    #[test]
    fn test_category_from_name_keywords() {
        assert_eq!(
            DeviceCategory::from_name("Galaxy Watch6"),
            Some(DeviceCategory::Watch)
        );
        assert_eq!(
            DeviceCategory::from_name("MX Keys Keyboard"),
            Some(DeviceCategory::Keyboard)
        );
        assert_eq!(
            DeviceCategory::from_name("MX Master Mouse"),
            Some(DeviceCategory::Mouse)
        );
        assert_eq!(
            DeviceCategory::from_name("AirPods Pro"),
            Some(DeviceCategory::Headphones)
        );
        assert_eq!(
            DeviceCategory::from_name("Flip 6 Speaker"),
            Some(DeviceCategory::Speaker)
        );
        assert_eq!(
            DeviceCategory::from_name("Pixel Phone"),
            Some(DeviceCategory::Phone)
        );
        assert_eq!(
            DeviceCategory::from_name("Tab S9 Tablet"),
            Some(DeviceCategory::Tablet)
        );
        assert_eq!(
            DeviceCategory::from_name("MacBook Air"),
            Some(DeviceCategory::Laptop)
        );
        assert_eq!(
            DeviceCategory::from_name("Office Desktop"),
            Some(DeviceCategory::Computer)
        );
        assert_eq!(DeviceCategory::from_name("QX-900"), None);
    }

    #[test]
    fn test_category_headphone_beats_phone() {
        // "headphone" contains "phone"; the headphones keyword list is
        // checked first so the more specific category wins.
        assert_eq!(
            DeviceCategory::from_name("Studio Headphones"),
            Some(DeviceCategory::Headphones)
        );
    }

    #[test]
    fn test_category_case_insensitive() {
        assert_eq!(
            DeviceCategory::from_name("EARBUDS X2"),
            Some(DeviceCategory::Headphones)
        );
    }

    #[test]
    fn test_category_from_str_roundtrip() {
        for category in [
            DeviceCategory::Headphones,
            DeviceCategory::Speaker,
            DeviceCategory::Watch,
            DeviceCategory::Phone,
            DeviceCategory::Tablet,
            DeviceCategory::Laptop,
            DeviceCategory::Computer,
            DeviceCategory::Keyboard,
            DeviceCategory::Mouse,
            DeviceCategory::Unknown,
        ] {
            let parsed = DeviceCategory::from_str(&category.to_string()).unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_category_from_str_rejects_garbage() {
        assert!(matches!(
            DeviceCategory::from_str("toaster"),
            Err(ParseError::InvalidCategory(_))
        ));
    }

    // --- SignalQuality tests ---

    #[test]
    fn test_signal_quality_boundaries() {
        assert_eq!(SignalQuality::from_rssi(-40), SignalQuality::Excellent);
        assert_eq!(SignalQuality::from_rssi(-59), SignalQuality::Excellent);
        assert_eq!(SignalQuality::from_rssi(-60), SignalQuality::Good);
        assert_eq!(SignalQuality::from_rssi(-74), SignalQuality::Good);
        assert_eq!(SignalQuality::from_rssi(-75), SignalQuality::Fair);
        assert_eq!(SignalQuality::from_rssi(-84), SignalQuality::Fair);
        assert_eq!(SignalQuality::from_rssi(-85), SignalQuality::Poor);
        assert_eq!(SignalQuality::from_rssi(-100), SignalQuality::Poor);
    }

    #[test]
    fn test_signal_quality_monotonic_in_rssi() {
        let mut previous = SignalQuality::Poor;
        for rssi in -100..=-30 {
            let quality = SignalQuality::from_rssi(rssi);
            assert!(
                quality >= previous,
                "bucket regressed at rssi {}: {:?} < {:?}",
                rssi,
                quality,
                previous
            );
            previous = quality;
        }
    }

    #[test]
    fn test_signal_quality_from_optional() {
        assert_eq!(
            SignalQuality::from_optional_rssi(None),
            SignalQuality::Unknown
        );
        assert_eq!(
            SignalQuality::from_optional_rssi(Some(-50)),
            SignalQuality::Excellent
        );
    }

    #[test]
    fn test_signal_quality_ordering() {
        assert!(SignalQuality::Excellent > SignalQuality::Good);
        assert!(SignalQuality::Good > SignalQuality::Fair);
        assert!(SignalQuality::Fair > SignalQuality::Poor);
        assert!(SignalQuality::Poor > SignalQuality::Unknown);
    }

    // --- ConnectionState tests ---

    #[test]
    fn test_connection_state_established() {
        assert!(ConnectionState::Connected.is_established());
        assert!(ConnectionState::ServiceDiscovery.is_established());
        assert!(ConnectionState::Ready.is_established());
        assert!(!ConnectionState::Disconnected.is_established());
        assert!(!ConnectionState::Connecting.is_established());
        assert!(!ConnectionState::Disconnecting.is_established());
        assert!(!ConnectionState::Failed.is_established());
    }

    #[test]
    fn test_connection_state_no_op_set() {
        assert!(ConnectionState::Connecting.is_connecting_or_established());
        assert!(ConnectionState::Ready.is_connecting_or_established());
        assert!(!ConnectionState::Disconnected.is_connecting_or_established());
    }

    // --- RadioState tests ---

    #[test]
    fn test_radio_state_availability() {
        assert!(RadioState::PoweredOn.is_available());
        for state in [
            RadioState::Unknown,
            RadioState::Unsupported,
            RadioState::Unauthorized,
            RadioState::PoweredOff,
            RadioState::Resetting,
        ] {
            assert!(!state.is_available(), "{} should be unavailable", state);
        }
    }

    // --- Coordinate tests ---

    #[test]
    fn test_coordinate_distance_zero() {
        let c = Coordinate::new(51.5007, -0.1246);
        assert!(c.distance_to(&c) < 1e-6);
    }

    #[test]
    fn test_coordinate_distance_known_pair() {
        // Big Ben to the London Eye, roughly 450 m apart.
        let big_ben = Coordinate::new(51.5007, -0.1246);
        let london_eye = Coordinate::new(51.5033, -0.1196);
        let d = big_ben.distance_to(&london_eye);
        assert!((300.0..600.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_coordinate_distance_symmetric() {
        let a = Coordinate::new(40.7128, -74.0060);
        let b = Coordinate::new(34.0522, -118.2437);
        let ab = a.distance_to(&b);
        let ba = b.distance_to(&a);
        assert!((ab - ba).abs() < 1e-6);
        // New York to Los Angeles is close to 3,940 km.
        assert!((3_900_000.0..4_000_000.0).contains(&ab), "got {}", ab);
    }

    #[test]
    fn test_coordinate_parse() {
        let c = Coordinate::from_str("51.5007, -0.1246").unwrap();
        assert!((c.latitude - 51.5007).abs() < 1e-9);
        assert!((c.longitude + 0.1246).abs() < 1e-9);

        assert!(Coordinate::from_str("not-a-coordinate").is_err());
        assert!(Coordinate::from_str("91.0,0.0").is_err());
        assert!(Coordinate::from_str("0.0,181.0").is_err());
        assert!(Coordinate::from_str("12.0").is_err());
    }

    // --- Serialization tests ---

    #[test]
    fn test_category_serialization() {
        assert_eq!(
            serde_json::to_string(&DeviceCategory::Headphones).unwrap(),
            "\"Headphones\""
        );
        let parsed: DeviceCategory = serde_json::from_str("\"Watch\"").unwrap();
        assert_eq!(parsed, DeviceCategory::Watch);
    }

    #[test]
    fn test_saved_device_roundtrip() {
        let saved = SavedDevice {
            id: "AA:BB:CC:DD:EE:FF".to_string(),
            name: "Pixel Buds".to_string(),
            category: DeviceCategory::Headphones,
            last_seen: None,
        };
        let json = serde_json::to_string(&saved).unwrap();
        let parsed: SavedDevice = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, saved);
    }
}
