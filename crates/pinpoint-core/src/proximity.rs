//! Proximity estimation from signal strength.
//!
//! Two pure, stateless outputs from one raw RSSI input: a qualitative
//! bucket ([`SignalQuality`]) and a distance estimate in metres from a
//! log-distance path-loss model.
//!
//! The calibration constants are tunable defaults, not a compatibility
//! contract; the only hard guarantees are monotonicity (stronger signal
//! never increases the estimated distance or lowers the bucket) and a
//! strictly positive, finite result.

use serde::{Deserialize, Serialize};

use pinpoint_types::SignalQuality;

/// Distance reported when no RSSI observation is available.
const FALLBACK_DISTANCE_M: f64 = 25.0;

/// Log-distance path-loss calibration.
///
/// `distance = 10 ^ ((reference_power - rssi) / (10 * exponent))`
///
/// # Example
///
/// ```
/// use pinpoint_core::proximity::PathLossModel;
///
/// let model = PathLossModel::default();
/// // At the reference power the estimate is exactly one metre.
/// assert!((model.distance(Some(-59)) - 1.0).abs() < 1e-9);
/// // Weaker signal, larger distance.
/// assert!(model.distance(Some(-80)) > model.distance(Some(-50)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathLossModel {
    /// Expected RSSI at one metre, in dBm.
    pub reference_power: f64,
    /// Environment path-loss exponent (2.0 free space, higher indoors).
    pub exponent: f64,
    /// Distance reported when no RSSI is available, in metres.
    pub fallback_distance: f64,
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self {
            reference_power: -59.0,
            exponent: 2.5,
            fallback_distance: FALLBACK_DISTANCE_M,
        }
    }
}

impl PathLossModel {
    /// Create a model with custom calibration.
    pub fn new(reference_power: f64, exponent: f64) -> Self {
        Self {
            reference_power,
            exponent,
            ..Self::default()
        }
    }

    /// Estimate the distance to a peripheral in metres.
    ///
    /// Returns the fixed fallback distance when no RSSI is available.
    /// The estimate is strictly positive, finite, and strictly decreasing
    /// in signal strength.
    #[must_use]
    pub fn distance(&self, rssi: Option<i16>) -> f64 {
        match rssi {
            Some(rssi) => {
                let exponent = (self.reference_power - f64::from(rssi)) / (10.0 * self.exponent);
                10f64.powf(exponent)
            }
            None => self.fallback_distance,
        }
    }

    /// Qualitative signal bucket for an optional RSSI observation.
    #[must_use]
    pub fn quality(&self, rssi: Option<i16>) -> SignalQuality {
        SignalQuality::from_optional_rssi(rssi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_distance_is_one_metre() {
        let model = PathLossModel::default();
        assert!((model.distance(Some(-59)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_strictly_decreasing() {
        let model = PathLossModel::default();
        let mut previous = f64::INFINITY;
        for rssi in -100..=-30 {
            let d = model.distance(Some(rssi));
            assert!(
                d < previous,
                "distance not strictly decreasing at rssi {}",
                rssi
            );
            previous = d;
        }
    }

    #[test]
    fn test_distance_fallback() {
        let model = PathLossModel::default();
        assert!((model.distance(None) - model.fallback_distance).abs() < 1e-9);
    }

    #[test]
    fn test_weaker_signal_estimates_farther() {
        // Two observations for the same device: -45 then -70. The weaker
        // signal must estimate a larger distance and a lower bucket.
        let model = PathLossModel::default();
        let near = model.distance(Some(-45));
        let far = model.distance(Some(-70));
        assert!(far > near);
        assert!(model.quality(Some(-70)) < model.quality(Some(-45)));
    }

    #[test]
    fn test_custom_calibration() {
        let model = PathLossModel::new(-65.0, 2.0);
        assert!((model.distance(Some(-65)) - 1.0).abs() < 1e-9);
        // Every 20 dBm below reference is one decade at exponent 2.0.
        assert!((model.distance(Some(-85)) - 10.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_distance_positive_and_finite(rssi in -127i16..=20) {
            let model = PathLossModel::default();
            let d = model.distance(Some(rssi));
            prop_assert!(d.is_finite());
            prop_assert!(d > 0.0);
        }

        #[test]
        fn prop_distance_monotone(a in -127i16..=20, b in -127i16..=20) {
            prop_assume!(a < b);
            let model = PathLossModel::default();
            // b is the stronger signal, so its distance must be smaller.
            prop_assert!(model.distance(Some(b)) < model.distance(Some(a)));
        }

        #[test]
        fn prop_bucket_monotone(a in -127i16..=20, b in -127i16..=20) {
            prop_assume!(a <= b);
            let model = PathLossModel::default();
            prop_assert!(model.quality(Some(b)) >= model.quality(Some(a)));
        }
    }
}
