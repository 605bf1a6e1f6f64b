//! CLI configuration file handling.
//!
//! Read from `<config dir>/pinpoint/config.toml`; every field is optional
//! and falls back to its default.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pinpoint_core::PathLossModel;
use pinpoint_types::Coordinate;

/// Persistent CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Use the synthetic discovery source by default.
    pub synthetic: bool,
    /// The user's position as "lat,lon", used to stamp found devices.
    pub position: Option<String>,
    /// Path-loss calibration overrides.
    pub calibration: Calibration,
}

/// Tunable proximity calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Expected RSSI at one metre, in dBm.
    pub reference_power: f64,
    /// Environment path-loss exponent.
    pub exponent: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        let model = PathLossModel::default();
        Self {
            reference_power: model.reference_power,
            exponent: model.exponent,
        }
    }
}

impl Config {
    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pinpoint")
            .join("config.toml")
    }

    /// Load the config file, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// The configured path-loss model.
    pub fn path_loss(&self) -> PathLossModel {
        PathLossModel::new(self.calibration.reference_power, self.calibration.exponent)
    }

    /// The configured position, if valid.
    pub fn position(&self) -> Option<Coordinate> {
        self.position
            .as_deref()
            .and_then(|raw| Coordinate::from_str(raw).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.synthetic);
        assert!(config.position().is_none());
        let model = config.path_loss();
        assert!((model.reference_power + 59.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            synthetic = true
            position = "51.5007,-0.1246"
            "#,
        )
        .unwrap();
        assert!(config.synthetic);
        let position = config.position().unwrap();
        assert!((position.latitude - 51.5007).abs() < 1e-9);
        // Calibration falls back to defaults
        assert!((config.path_loss().exponent - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_calibration_override() {
        let config: Config = toml::from_str(
            r#"
            [calibration]
            reference_power = -63.0
            exponent = 2.0
            "#,
        )
        .unwrap();
        let model = config.path_loss();
        assert!((model.reference_power + 63.0).abs() < 1e-9);
        assert!((model.exponent - 2.0).abs() < 1e-9);
    }
}
