//! Normalized advertisement metadata.
//!
//! The scan controller reduces platform advertisement callbacks to
//! [`AdvertisementMeta`] before handing them to the registry, so the
//! registry and classifier never touch the radio stack directly.

use std::collections::HashMap;

use btleplug::api::PeripheralProperties;
use uuid::Uuid;

/// The side-channel data broadcast alongside a discovery event.
#[derive(Debug, Clone, Default)]
pub struct AdvertisementMeta {
    /// Advertised local name, if any.
    pub local_name: Option<String>,
    /// Advertised service UUIDs.
    pub services: Vec<Uuid>,
    /// Manufacturer-specific data, keyed by company identifier.
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    /// Advertised transmit power, if present.
    pub tx_power: Option<i16>,
}

impl AdvertisementMeta {
    /// Build metadata from btleplug peripheral properties.
    pub fn from_properties(properties: &PeripheralProperties) -> Self {
        let mut services = properties.services.clone();
        // Service-data keys are advertised services too.
        for uuid in properties.service_data.keys() {
            if !services.contains(uuid) {
                services.push(*uuid);
            }
        }

        Self {
            local_name: properties.local_name.clone(),
            services,
            manufacturer_data: properties.manufacturer_data.clone(),
            tx_power: properties.tx_power_level,
        }
    }

    /// Metadata carrying only a local name (synthetic advertisements).
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            local_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Whether the advertisement carries the given service UUID.
    pub fn advertises_service(&self, uuid: &Uuid) -> bool {
        self.services.contains(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinpoint_types::uuids::BATTERY_SERVICE;

    #[test]
    fn test_with_name() {
        let meta = AdvertisementMeta::with_name("Pixel Buds");
        assert_eq!(meta.local_name.as_deref(), Some("Pixel Buds"));
        assert!(meta.services.is_empty());
        assert!(meta.manufacturer_data.is_empty());
    }

    #[test]
    fn test_advertises_service() {
        let meta = AdvertisementMeta {
            services: vec![BATTERY_SERVICE],
            ..Default::default()
        };
        assert!(meta.advertises_service(&BATTERY_SERVICE));
        assert!(!meta.advertises_service(&uuid::Uuid::nil()));
    }
}
