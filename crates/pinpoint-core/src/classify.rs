//! Device type classification from advertisement metadata.
//!
//! The classifier is an ordered pipeline of pure matcher functions tried in
//! sequence; the first match wins. Precedence: advertised service UUIDs,
//! then manufacturer-specific data signatures, then name keywords, then
//! [`DeviceCategory::Unknown`]. Identical input always yields identical
//! output.

use pinpoint_types::DeviceCategory;
use pinpoint_types::uuids::{
    ADVANCED_AUDIO_SERVICE, APPLE_MANUFACTURER_ID, AUDIO_SINK_SERVICE, HANDSFREE_SERVICE,
    HEART_RATE_SERVICE, MICROSOFT_MANUFACTURER_ID,
};

use crate::advertisement::AdvertisementMeta;

/// A single classification stage.
type Matcher = fn(&AdvertisementMeta, Option<&str>) -> Option<DeviceCategory>;

/// Classification stages in precedence order.
const MATCHERS: &[Matcher] = &[match_services, match_manufacturer_data, match_name];

/// Classify a peripheral from its advertisement metadata and current name.
///
/// Pure and deterministic; returns [`DeviceCategory::Unknown`] when no
/// stage matches.
///
/// # Example
///
/// ```
/// use pinpoint_core::advertisement::AdvertisementMeta;
/// use pinpoint_core::classify::classify;
/// use pinpoint_types::DeviceCategory;
///
/// let meta = AdvertisementMeta::with_name("Vertex Watch 4");
/// assert_eq!(classify(&meta, None), DeviceCategory::Watch);
/// ```
#[must_use]
pub fn classify(meta: &AdvertisementMeta, name: Option<&str>) -> DeviceCategory {
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(meta, name))
        .unwrap_or(DeviceCategory::Unknown)
}

/// Stage 1: advertised service UUIDs with an unambiguous category.
fn match_services(meta: &AdvertisementMeta, _name: Option<&str>) -> Option<DeviceCategory> {
    for service in &meta.services {
        if *service == AUDIO_SINK_SERVICE
            || *service == ADVANCED_AUDIO_SERVICE
            || *service == HANDSFREE_SERVICE
        {
            return Some(DeviceCategory::Headphones);
        }
        if *service == HEART_RATE_SERVICE {
            return Some(DeviceCategory::Watch);
        }
    }
    None
}

/// Stage 2: manufacturer-specific data signatures.
///
/// Apple proximity-pairing frames (type 0x07) are emitted by AirPods-class
/// audio devices; nearby-info frames (type 0x10) by phones. Microsoft CDP
/// beacons carry a device-type code in their second byte.
fn match_manufacturer_data(
    meta: &AdvertisementMeta,
    _name: Option<&str>,
) -> Option<DeviceCategory> {
    if let Some(data) = meta.manufacturer_data.get(&APPLE_MANUFACTURER_ID) {
        match data.first() {
            Some(0x07) => return Some(DeviceCategory::Headphones),
            Some(0x10) => return Some(DeviceCategory::Phone),
            _ => {}
        }
    }

    if let Some(data) = meta.manufacturer_data.get(&MICROSOFT_MANUFACTURER_ID)
        && data.len() >= 2
        && data[0] == 0x01
    {
        let device_type = data[1] & 0x1F;
        return match device_type {
            6 | 7 | 8 | 13 => Some(DeviceCategory::Phone),
            5 | 12 | 14 => Some(DeviceCategory::Tablet),
            11 => Some(DeviceCategory::Laptop),
            9 => Some(DeviceCategory::Computer),
            _ => None,
        };
    }

    None
}

/// Stage 3: case-insensitive keyword match over the current name, falling
/// back to the advertised local name.
fn match_name(meta: &AdvertisementMeta, name: Option<&str>) -> Option<DeviceCategory> {
    name.or(meta.local_name.as_deref())
        .and_then(DeviceCategory::from_name)
}
