//! Location collaborator interface.
//!
//! Location tracking is an external concern: this core only consumes an
//! optional current position (to stamp devices when the user marks them
//! found) and a distance function. The permission/authorization state
//! machine behind the position lives outside this crate.

use pinpoint_types::Coordinate;

/// Supplies the current position, when one is known.
pub trait LocationProvider: Send + Sync {
    /// The current position, or `None` when no fix is available.
    fn current_position(&self) -> Option<Coordinate>;
}

/// Geographic distance between two coordinates in metres.
pub fn distance_between(a: &Coordinate, b: &Coordinate) -> f64 {
    a.distance_to(b)
}

/// A provider that never has a position. The default collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn current_position(&self) -> Option<Coordinate> {
        None
    }
}

/// A provider pinned to a fixed position. Useful for tests and for CLI
/// sessions where the user supplies their coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

impl LocationProvider for FixedLocation {
    fn current_position(&self) -> Option<Coordinate> {
        Some(self.0)
    }
}
