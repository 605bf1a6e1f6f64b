//! Peripheral link abstraction.
//!
//! [`PeripheralLink`] abstracts the per-device radio operations the
//! connection manager needs, so the real btleplug-backed link and the
//! synthetic link interchange freely. [`LinkProvider`] is the seam through
//! which the connection manager resolves a device identity to a link,
//! implemented by the scan controller (real radio) and by the synthetic
//! source.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use pinpoint_types::RadioState;

use crate::error::{Error, Result};

/// A discovered GATT characteristic, reduced to what the connection
/// manager needs to drive the capability cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// UUID of the service that contains this characteristic.
    pub service: Uuid,
    /// Whether the characteristic supports reads.
    pub readable: bool,
    /// Whether the characteristic supports writes.
    pub writable: bool,
    /// Whether the characteristic supports notifications.
    pub notifiable: bool,
}

/// Per-device radio operations.
///
/// Implementations: [`BtleLink`] (real hardware) and the synthetic link in
/// [`crate::synthetic`]. Tests script their own fakes against this trait.
#[async_trait]
pub trait PeripheralLink: Send + Sync {
    /// Establish the underlying connection.
    async fn connect(&self) -> Result<()>;

    /// Tear down the underlying connection.
    ///
    /// Implementations should make a best effort and report errors, but
    /// callers treat disconnection as always accepted.
    async fn disconnect(&self) -> Result<()>;

    /// Enumerate all GATT services and their characteristics.
    async fn discover_services(&self) -> Result<Vec<GattCharacteristic>>;

    /// Read a characteristic value.
    async fn read(&self, characteristic: &GattCharacteristic) -> Result<Vec<u8>>;

    /// Write a characteristic value.
    async fn write(&self, characteristic: &GattCharacteristic, value: &[u8]) -> Result<()>;

    /// Subscribe to notifications for a characteristic.
    async fn subscribe(&self, characteristic: &GattCharacteristic) -> Result<()>;

    /// Read the current signal strength, if the stack exposes it.
    async fn rssi(&self) -> Result<Option<i16>>;
}

/// Resolves device identities to links and reports radio availability.
#[async_trait]
pub trait LinkProvider: Send + Sync {
    /// Resolve a device identity to a connectable link.
    async fn link_for(&self, identifier: &str) -> Result<Arc<dyn PeripheralLink>>;

    /// The current power state of the backing radio.
    ///
    /// The synthetic provider always reports [`RadioState::PoweredOn`].
    async fn radio_state(&self) -> RadioState;
}

/// Real peripheral link backed by btleplug.
pub struct BtleLink {
    peripheral: Peripheral,
    /// Cache of btleplug characteristics keyed by (service, characteristic)
    /// UUID, built during service discovery for O(1) lookup.
    characteristics: RwLock<HashMap<(Uuid, Uuid), Characteristic>>,
}

impl BtleLink {
    /// Wrap an already-discovered peripheral.
    pub fn new(peripheral: Peripheral) -> Self {
        Self {
            peripheral,
            characteristics: RwLock::new(HashMap::new()),
        }
    }

    async fn lookup(&self, characteristic: &GattCharacteristic) -> Result<Characteristic> {
        let cache = self.characteristics.read().await;
        cache
            .get(&(characteristic.service, characteristic.uuid))
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(characteristic.uuid.to_string()))
    }
}

impl std::fmt::Debug for BtleLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtleLink")
            .field("peripheral", &self.peripheral.id())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PeripheralLink for BtleLink {
    async fn connect(&self) -> Result<()> {
        self.peripheral.connect().await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await?;
        Ok(())
    }

    async fn discover_services(&self) -> Result<Vec<GattCharacteristic>> {
        self.peripheral.discover_services().await?;

        let mut cache = self.characteristics.write().await;
        cache.clear();

        let mut discovered = Vec::new();
        for service in self.peripheral.services() {
            debug!("service: {}", service.uuid);
            for characteristic in &service.characteristics {
                let props = characteristic.properties;
                discovered.push(GattCharacteristic {
                    uuid: characteristic.uuid,
                    service: service.uuid,
                    readable: props.contains(CharPropFlags::READ),
                    writable: props.contains(CharPropFlags::WRITE)
                        || props.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
                    notifiable: props.contains(CharPropFlags::NOTIFY)
                        || props.contains(CharPropFlags::INDICATE),
                });
                cache.insert(
                    (service.uuid, characteristic.uuid),
                    characteristic.clone(),
                );
            }
        }

        debug!("discovered {} characteristics", discovered.len());
        Ok(discovered)
    }

    async fn read(&self, characteristic: &GattCharacteristic) -> Result<Vec<u8>> {
        let inner = self.lookup(characteristic).await?;
        let data = self.peripheral.read(&inner).await?;
        Ok(data)
    }

    async fn write(&self, characteristic: &GattCharacteristic, value: &[u8]) -> Result<()> {
        let inner = self.lookup(characteristic).await?;
        let write_type = if inner.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        self.peripheral.write(&inner, value, write_type).await?;
        Ok(())
    }

    async fn subscribe(&self, characteristic: &GattCharacteristic) -> Result<()> {
        let inner = self.lookup(characteristic).await?;
        self.peripheral.subscribe(&inner).await?;
        Ok(())
    }

    async fn rssi(&self) -> Result<Option<i16>> {
        let properties = self.peripheral.properties().await?;
        Ok(properties.and_then(|p| p.rssi))
    }
}
