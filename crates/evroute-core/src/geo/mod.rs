//! Geodesic Primitives
//!
//! Flat-Earth distance calculations that are accurate enough for route
//! matching near a reference latitude, without per-query trigonometry.

mod position;
mod ruler;

pub use position::Position;
pub use ruler::{wrap_longitude, DistanceUnit, PositionRuler};
