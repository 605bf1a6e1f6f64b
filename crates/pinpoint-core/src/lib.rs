//! Core discovery, registry, and connection engine for Pinpoint.
//!
//! This crate is the asynchronous, event-driven heart of the application:
//! it reconciles unordered, duplicate, and noisy radio callbacks into a
//! consistent device model, manages connection lifecycles under timeout
//! and retry discipline, estimates physical proximity from signal
//! strength, and classifies device types from advertisement metadata.
//!
//! # Components
//!
//! - [`scan::ScanController`]: owns the radio session; starts/stops
//!   discovery and normalizes advertisement callbacks
//! - [`synthetic::SyntheticSource`]: believable substitute event stream
//!   when no physical radio is usable
//! - [`registry::DeviceRegistry`]: single source of truth mapping stable
//!   identity to device records
//! - [`connection::ConnectionManager`]: per-device connection state
//!   machine with timeout, retry, and service-discovery cascade
//! - [`proximity`]: pure signal-strength to distance/bucket estimation
//! - [`classify`]: pure advertisement-metadata to category classification
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pinpoint_core::connection::{ConnectionConfig, ConnectionManager};
//! use pinpoint_core::events::EventDispatcher;
//! use pinpoint_core::registry::DeviceRegistry;
//! use pinpoint_core::scan::{ScanController, ScanOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let events = EventDispatcher::default();
//!     let registry = Arc::new(DeviceRegistry::new(events.clone()));
//!
//!     let controller = Arc::new(
//!         ScanController::new(Arc::clone(&registry), events.clone(), ScanOptions::default())
//!             .await?,
//!     );
//!     let connections = ConnectionManager::new(
//!         Arc::clone(&registry),
//!         events.clone(),
//!         Arc::clone(&controller) as _,
//!         ConnectionConfig::default(),
//!     );
//!
//!     controller.start_scanning().await?;
//!     // ... subscribe to events, read the registry, connect to devices
//!     # let _ = connections;
//!     Ok(())
//! }
//! ```

pub mod advertisement;
pub mod classify;
pub mod connection;
pub mod device;
pub mod error;
pub mod events;
pub mod link;
pub mod location;
pub mod persist;
pub mod proximity;
pub mod registry;
pub mod retry;
pub mod scan;
pub mod synthetic;
pub mod util;

// Core exports
pub use advertisement::AdvertisementMeta;
pub use connection::{ConnectionConfig, ConnectionManager, SignalKind};
pub use device::{Device, DeviceOrdering};
pub use error::{ConnectionFailureReason, Error, Result};
pub use events::{Condition, DeviceEvent, DeviceRef, EventDispatcher, EventReceiver, ScanStopReason};
pub use link::{GattCharacteristic, LinkProvider, PeripheralLink};
pub use location::{FixedLocation, LocationProvider, NoLocation};
pub use persist::{MemoryStore, SavedDeviceStore};
pub use proximity::PathLossModel;
pub use registry::DeviceRegistry;
pub use retry::{RetryConfig, with_retry};
pub use scan::{ScanController, ScanOptions, ScanSession};
pub use synthetic::{SyntheticOptions, SyntheticSource};

// Re-export the shared types crate
pub use pinpoint_types::{
    ConnectionState, Coordinate, DeviceCategory, RadioState, SavedDevice, SignalQuality,
};

/// Type alias for a shared registry reference.
///
/// The registry is the single authoritative owner of the device
/// collection; every component that reads or mutates device state holds
/// one of these.
pub type SharedRegistry = std::sync::Arc<DeviceRegistry>;
