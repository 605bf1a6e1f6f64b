//! Error types for pinpoint-core.
//!
//! This module defines all error conditions that can occur while
//! discovering, connecting to, and signalling nearby peripherals.
//!
//! # Recovery strategies
//!
//! | Error | Strategy |
//! |-------|----------|
//! | [`Error::RadioUnavailable`] | Surface to the user; retry after a radio state change |
//! | [`Error::ConnectionTimeout`] | Retry `connect` |
//! | [`Error::ConnectionFailed`] | Retry `connect` with backoff |
//! | [`Error::ServiceDiscoveryDegraded`] | None needed; the connection stays usable |
//! | [`Error::NotConnected`] | Connect first |
//! | [`Error::LocationUnavailable`] | Skip location stamping |
//! | [`Error::Persistence`] | Log only; in-memory state is authoritative |
//!
//! None of these conditions are fatal: they are surfaced on the event
//! stream (see [`crate::events::Condition`]) and never corrupt the device
//! collection.

use std::time::Duration;

use thiserror::Error;

use pinpoint_types::RadioState;

/// Errors that can occur in the Pinpoint core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error
/// variants in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error from the platform stack.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// The radio is not in a usable power state.
    #[error("radio unavailable: {state}")]
    RadioUnavailable {
        /// The observed radio power state.
        state: RadioState,
    },

    /// No device with the given identity is known.
    #[error("device not found: {identifier}")]
    DeviceNotFound {
        /// The identity that could not be resolved.
        identifier: String,
    },

    /// Operation attempted without an established connection.
    #[error("not connected to device")]
    NotConnected,

    /// A connection attempt exceeded its timeout bound.
    #[error("connection to {device_id} timed out after {duration:?}")]
    ConnectionTimeout {
        /// The device that failed to connect in time.
        device_id: String,
        /// The timeout bound that was exceeded.
        duration: Duration,
    },

    /// The radio stack explicitly rejected a connection attempt.
    #[error("connection failed: {reason}")]
    ConnectionFailed {
        /// The device identity, when known.
        device_id: Option<String>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// Service discovery retries were exhausted; the connection remains
    /// usable at reduced capability.
    #[error("service discovery degraded for {device_id} after {attempts} attempts")]
    ServiceDiscoveryDegraded {
        /// The affected device.
        device_id: String,
        /// How many discovery attempts were made.
        attempts: u32,
    },

    /// A required GATT characteristic was not found on the peripheral.
    #[error("characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
    },

    /// The peripheral exposes neither the primary nor the fallback
    /// signalling characteristic.
    #[error("device {device_id} does not support alert signalling")]
    AlertUnsupported {
        /// The affected device.
        device_id: String,
    },

    /// A generic operation timed out.
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// The location collaborator has no current position.
    #[error("current location unavailable")]
    LocationUnavailable,

    /// The persistence collaborator failed; in-memory state is unaffected.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Data received from a peripheral could not be interpreted.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Invalid configuration provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Structured reasons for connection failures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// Bluetooth adapter not available or powered off.
    AdapterUnavailable,
    /// Device is out of range.
    OutOfRange,
    /// Device rejected the connection.
    Rejected,
    /// Generic BLE error.
    BleError(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdapterUnavailable => write!(f, "Bluetooth adapter unavailable"),
            Self::OutOfRange => write!(f, "device out of range"),
            Self::Rejected => write!(f, "connection rejected by device"),
            Self::BleError(msg) => write!(f, "BLE error: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error {
    /// Create a radio-unavailable error for the given state.
    pub fn radio_unavailable(state: RadioState) -> Self {
        Self::RadioUnavailable { state }
    }

    /// Create a device-not-found error for a specific identity.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound {
            identifier: identifier.into(),
        }
    }

    /// Create a connection timeout error.
    pub fn connection_timeout(device_id: impl Into<String>, duration: Duration) -> Self {
        Self::ConnectionTimeout {
            device_id: device_id.into(),
            duration,
        }
    }

    /// Create a connection failure with a structured reason.
    pub fn connection_failed(device_id: Option<String>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed { device_id, reason }
    }

    /// Create a generic timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic-not-found error.
    pub fn characteristic_not_found(uuid: impl Into<String>) -> Self {
        Self::CharacteristicNotFound { uuid: uuid.into() }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias using pinpoint-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::device_not_found("AA:BB:CC:DD:EE:FF");
        assert!(err.to_string().contains("AA:BB:CC:DD:EE:FF"));

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "not connected to device");

        let err = Error::connection_timeout("dev-1", Duration::from_secs(12));
        assert!(err.to_string().contains("dev-1"));
        assert!(err.to_string().contains("12s"));

        let err = Error::radio_unavailable(RadioState::PoweredOff);
        assert!(err.to_string().contains("powered off"));
    }

    #[test]
    fn test_connection_failure_reasons() {
        let err = Error::connection_failed(
            Some("dev-1".to_string()),
            ConnectionFailureReason::Rejected,
        );
        assert!(err.to_string().contains("rejected"));

        let err = Error::connection_failed(None, ConnectionFailureReason::BleError("hci".into()));
        assert!(err.to_string().contains("hci"));
    }

    #[test]
    fn test_degraded_is_not_fatal_shaped() {
        let err = Error::ServiceDiscoveryDegraded {
            device_id: "dev-1".to_string(),
            attempts: 3,
        };
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_btleplug_error_conversion() {
        fn _assert_from_impl<T: From<btleplug::Error>>() {}
        _assert_from_impl::<Error>();
    }
}
