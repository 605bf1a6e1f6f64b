//! Core types for Pinpoint device records.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ParseError;

/// Category of a discovered peripheral.
///
/// Categories are derived from advertisement metadata and device names.
/// This enum is marked `#[non_exhaustive]` to allow adding new categories
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub enum DeviceCategory {
    /// Headphones, earbuds, and headsets.
    Headphones,
    /// Standalone speakers and soundbars.
    Speaker,
    /// Smart watches and fitness trackers.
    Watch,
    /// Mobile phones.
    Phone,
    /// Tablets.
    Tablet,
    /// Laptops and notebooks.
    Laptop,
    /// Desktop computers.
    Computer,
    /// Keyboards.
    Keyboard,
    /// Mice and pointing devices.
    Mouse,
    /// Category could not be determined.
    #[default]
    Unknown,
}

/// Name keyword lists checked in order; first category with a matching
/// keyword wins. Substring match, case-insensitive.
const NAME_KEYWORDS: &[(DeviceCategory, &[&str])] = &[
    (DeviceCategory::Watch, &["watch"]),
    (DeviceCategory::Keyboard, &["keyboard"]),
    (DeviceCategory::Mouse, &["mouse", "trackpad"]),
    (
        DeviceCategory::Headphones,
        &["headphone", "earbud", "airpod", "headset", "buds"],
    ),
    (DeviceCategory::Speaker, &["speaker", "soundbar"]),
    (DeviceCategory::Phone, &["phone"]),
    (DeviceCategory::Tablet, &["tablet", "ipad"]),
    (DeviceCategory::Laptop, &["laptop", "book"]),
    (DeviceCategory::Computer, &["computer", "desktop", "imac"]),
];

impl DeviceCategory {
    /// Detect a category from a device name.
    ///
    /// Analyzes the name (case-insensitive) against keyword lists for each
    /// category. Returns `None` when no keyword matches; callers decide
    /// whether that means `Unknown` or "keep looking".
    ///
    /// # Examples
    ///
    /// ```
    /// use pinpoint_types::DeviceCategory;
    ///
    /// assert_eq!(DeviceCategory::from_name("Galaxy Watch6"), Some(DeviceCategory::Watch));
    /// assert_eq!(DeviceCategory::from_name("WH-1000XM5 Headphones"), Some(DeviceCategory::Headphones));
    /// assert_eq!(DeviceCategory::from_name("MacBook Pro"), Some(DeviceCategory::Laptop));
    /// assert_eq!(DeviceCategory::from_name("XYZ-42"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name_lower = name.to_lowercase();
        for (category, keywords) in NAME_KEYWORDS {
            if keywords.iter().any(|k| name_lower.contains(k)) {
                return Some(*category);
            }
        }
        None
    }

    /// Whether the category has been resolved to something concrete.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, DeviceCategory::Unknown)
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceCategory::Headphones => "Headphones",
            DeviceCategory::Speaker => "Speaker",
            DeviceCategory::Watch => "Watch",
            DeviceCategory::Phone => "Phone",
            DeviceCategory::Tablet => "Tablet",
            DeviceCategory::Laptop => "Laptop",
            DeviceCategory::Computer => "Computer",
            DeviceCategory::Keyboard => "Keyboard",
            DeviceCategory::Mouse => "Mouse",
            DeviceCategory::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for DeviceCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "headphones" => Ok(DeviceCategory::Headphones),
            "speaker" => Ok(DeviceCategory::Speaker),
            "watch" => Ok(DeviceCategory::Watch),
            "phone" => Ok(DeviceCategory::Phone),
            "tablet" => Ok(DeviceCategory::Tablet),
            "laptop" => Ok(DeviceCategory::Laptop),
            "computer" => Ok(DeviceCategory::Computer),
            "keyboard" => Ok(DeviceCategory::Keyboard),
            "mouse" => Ok(DeviceCategory::Mouse),
            "unknown" => Ok(DeviceCategory::Unknown),
            other => Err(ParseError::InvalidCategory(other.to_string())),
        }
    }
}

/// Signal strength quality levels based on RSSI values.
///
/// # Ordering
///
/// Buckets are ordered by quality: `Unknown < Poor < Fair < Good <
/// Excellent`, which allows threshold comparisons like
/// `if quality >= SignalQuality::Good { ... }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SignalQuality {
    /// No RSSI observation is available.
    #[default]
    Unknown,
    /// Signal too weak for reliable operation (< -85 dBm).
    Poor,
    /// Usable but may have issues (-85 to -75 dBm).
    Fair,
    /// Good signal strength (-75 to -60 dBm).
    Good,
    /// Excellent signal strength (> -60 dBm).
    Excellent,
}

impl SignalQuality {
    /// Determine signal quality from an RSSI value in dBm.
    ///
    /// Values closer to zero indicate a stronger signal; typical readings
    /// range from -30 (very close) to -100 (edge of range).
    #[must_use]
    pub fn from_rssi(rssi: i16) -> Self {
        match rssi {
            r if r > -60 => SignalQuality::Excellent,
            r if r > -75 => SignalQuality::Good,
            r if r > -85 => SignalQuality::Fair,
            _ => SignalQuality::Poor,
        }
    }

    /// Determine signal quality from an optional RSSI observation.
    #[must_use]
    pub fn from_optional_rssi(rssi: Option<i16>) -> Self {
        rssi.map(Self::from_rssi).unwrap_or(SignalQuality::Unknown)
    }

    /// Get a human-readable description of the signal quality.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            SignalQuality::Excellent => "Excellent signal",
            SignalQuality::Good => "Good signal",
            SignalQuality::Fair => "Fair signal - connection may be unstable",
            SignalQuality::Poor => "Poor signal - consider moving closer",
            SignalQuality::Unknown => "Signal strength unknown",
        }
    }
}

impl fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignalQuality::Excellent => "Excellent",
            SignalQuality::Good => "Good",
            SignalQuality::Fair => "Fair",
            SignalQuality::Poor => "Poor",
            SignalQuality::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

/// Connection lifecycle state of a device.
///
/// The happy path is `Disconnected -> Connecting -> Connected ->
/// ServiceDiscovery -> Ready`. Failed attempts pass through `Failed` on the
/// way back to `Disconnected`; teardown passes through `Disconnecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Link established, services not yet enumerated.
    Connected,
    /// Enumerating GATT services and characteristics.
    ServiceDiscovery,
    /// Link established and core services enumerated.
    Ready,
    /// Teardown requested, waiting for the stack to confirm.
    Disconnecting,
    /// The last connection attempt failed; transient state before
    /// `Disconnected`.
    Failed,
}

impl ConnectionState {
    /// Whether a usable link exists (connected, discovering, or ready).
    #[must_use]
    pub fn is_established(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected
                | ConnectionState::ServiceDiscovery
                | ConnectionState::Ready
        )
    }

    /// Whether a connect request would be a no-op in this state.
    #[must_use]
    pub fn is_connecting_or_established(&self) -> bool {
        matches!(self, ConnectionState::Connecting) || self.is_established()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::ServiceDiscovery => "discovering services",
            ConnectionState::Ready => "ready",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Power state of the underlying radio adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub enum RadioState {
    /// State has not been reported yet.
    #[default]
    Unknown,
    /// The platform has no usable radio.
    Unsupported,
    /// The application is not authorized to use the radio.
    Unauthorized,
    /// The radio is powered off.
    PoweredOff,
    /// The radio is powered on and usable.
    PoweredOn,
    /// The radio stack is resetting.
    Resetting,
}

impl RadioState {
    /// Whether scanning and connecting are possible in this state.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, RadioState::PoweredOn)
    }
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RadioState::Unknown => "unknown",
            RadioState::Unsupported => "unsupported",
            RadioState::Unauthorized => "unauthorized",
            RadioState::PoweredOff => "powered off",
            RadioState::PoweredOn => "powered on",
            RadioState::Resetting => "resetting",
        };
        write!(f, "{}", label)
    }
}

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    /// Latitude in decimal degrees, positive north.
    pub latitude: f64,
    /// Longitude in decimal degrees, positive east.
    pub longitude: f64,
}

/// Mean Earth radius in metres, used for haversine distances.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

impl Coordinate {
    /// Create a coordinate from latitude and longitude in decimal degrees.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another coordinate in metres (haversine).
    #[must_use]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = ParseError;

    /// Parse a `"lat,lon"` pair in decimal degrees.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ',');
        let lat = parts
            .next()
            .and_then(|p| p.trim().parse::<f64>().ok())
            .ok_or_else(|| ParseError::InvalidCoordinate(s.to_string()))?;
        let lon = parts
            .next()
            .and_then(|p| p.trim().parse::<f64>().ok())
            .ok_or_else(|| ParseError::InvalidCoordinate(s.to_string()))?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ParseError::InvalidCoordinate(s.to_string()));
        }

        Ok(Coordinate::new(lat, lon))
    }
}

/// The persisted projection of a user-favorited device.
///
/// Only identity, name, category, and the last-seen stamp survive the
/// save/load round trip; live state (signal, connection, battery) does not.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SavedDevice {
    /// Stable device identity.
    pub id: String,
    /// Display name at the time of saving.
    pub name: String,
    /// Resolved category at the time of saving.
    pub category: DeviceCategory,
    /// When the device was last observed, if known.
    pub last_seen: Option<OffsetDateTime>,
}
