//! Geographic positions

use serde::{Deserialize, Serialize};

/// A WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl Position {
    /// Create a new position
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// The "no position" marker reported by the car
    pub const fn invalid() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    /// Whether this position carries usable coordinates.
    ///
    /// The car reports `(0, 0)` while no destination is set, so that exact
    /// pair is treated as absent just like NaN.
    pub fn is_valid(&self) -> bool {
        if self.latitude.is_nan() || self.longitude.is_nan() {
            return false;
        }
        !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// `Some(self)` when valid
    pub fn valid(self) -> Option<Self> {
        self.is_valid().then_some(self)
    }
}

impl From<(f64, f64)> for Position {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_zero_is_invalid() {
        assert!(!Position::new(0.0, 0.0).is_valid());
    }

    #[test]
    fn test_nan_is_invalid() {
        assert!(!Position::new(f64::NAN, 10.0).is_valid());
        assert!(!Position::new(52.0, f64::NAN).is_valid());
        assert!(!Position::invalid().is_valid());
    }

    #[test]
    fn test_single_zero_axis_is_valid() {
        assert!(Position::new(0.0, 12.5).is_valid());
        assert!(Position::new(51.5, 0.0).is_valid());
    }
}
