//! Vehicle Telemetry
//!
//! Raw vehicle-bus changes arrive one field at a time as [`TelemetryEvent`]s.
//! The [`TelemetryAggregator`] folds them into the latest value of every field
//! and periodically snapshots them into an immutable [`CarData`].

mod aggregator;

pub use aggregator::{run_telemetry_context, TelemetryAggregator};

use serde::{Deserialize, Serialize};

use crate::geo::Position;

/// A destination reported by the car's navigation system
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DestinationInfo {
    /// Destination coordinates; `(0, 0)` while none is set
    pub position: Position,
    /// Display name, when the navigation system provides one
    #[serde(default)]
    pub title: Option<String>,
}

impl DestinationInfo {
    /// Destination without a title
    pub fn at(position: Position) -> Self {
        Self {
            position,
            title: None,
        }
    }

    /// Whether the position is usable
    pub fn is_valid(&self) -> bool {
        self.position.is_valid()
    }
}

/// Drive mode selected on the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivingMode {
    /// Not reported
    #[default]
    Unknown,
    /// Comfort / normal
    Comfort,
    /// Eco / range
    Eco,
    /// Sport / performance
    Sport,
}

/// Temperatures in °C, each optional because not every car reports them
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Temperatures {
    /// Ambient temperature
    pub outside: Option<f64>,
    /// Battery pack temperature
    pub battery: Option<f64>,
    /// Cabin temperature
    pub cabin: Option<f64>,
}

/// Immutable telemetry snapshot.
///
/// Replaced wholesale on every tick; comparing two snapshots is how the
/// planning state machine detects changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarData {
    /// Current GPS position
    pub position: Position,
    /// Next navigation waypoint
    pub next_destination: DestinationInfo,
    /// Final navigation destination
    pub final_destination: DestinationInfo,
    /// Odometer in meters
    pub odometer: f64,
    /// Battery state of charge in percent
    pub state_of_charge: f64,
    /// Selected drive mode
    pub driving_mode: DrivingMode,
    /// Speed in km/h
    pub speed: f64,
    /// Motor torque in Nm
    pub torque: f64,
    /// Reported temperatures
    pub temperatures: Temperatures,
}

impl Default for CarData {
    fn default() -> Self {
        Self {
            position: Position::invalid(),
            next_destination: DestinationInfo::at(Position::invalid()),
            final_destination: DestinationInfo::at(Position::invalid()),
            odometer: 0.0,
            state_of_charge: 0.0,
            driving_mode: DrivingMode::Unknown,
            speed: 0.0,
            torque: 0.0,
            temperatures: Temperatures::default(),
        }
    }
}

impl CarData {
    /// Whether the snapshot can drive planning: a valid position and at
    /// least one valid destination
    pub fn is_plannable(&self) -> bool {
        self.position.is_valid() && (self.next_destination.is_valid() || self.final_destination.is_valid())
    }

    /// Whether either destination differs from `other`'s
    pub fn destinations_changed(&self, other: &CarData) -> bool {
        !same_destination(&self.next_destination, &other.next_destination)
            || !same_destination(&self.final_destination, &other.final_destination)
    }

    /// Valid destinations, next first, without duplicates
    pub fn destinations(&self) -> Vec<&DestinationInfo> {
        let mut out: Vec<&DestinationInfo> = Vec::with_capacity(2);
        for d in [&self.next_destination, &self.final_destination] {
            if d.is_valid() && !out.iter().any(|o| o.position == d.position) {
                out.push(d);
            }
        }
        out
    }
}

/// Positions compare by value, two invalid positions count as equal
fn same_destination(a: &DestinationInfo, b: &DestinationInfo) -> bool {
    match (a.is_valid(), b.is_valid()) {
        (false, false) => true,
        (true, true) => a.position == b.position,
        _ => false,
    }
}

/// A single-field change from the vehicle bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// GPS position
    Position(Position),
    /// Next navigation waypoint
    NextDestination(DestinationInfo),
    /// Final navigation destination
    FinalDestination(DestinationInfo),
    /// Odometer in meters
    Odometer(f64),
    /// State of charge in percent
    StateOfCharge(f64),
    /// Drive mode
    DrivingMode(DrivingMode),
    /// Speed in km/h
    Speed(f64),
    /// Torque in Nm
    Torque(f64),
    /// Outside temperature in °C
    OutsideTemperature(f64),
    /// Battery temperature in °C
    BatteryTemperature(f64),
    /// Cabin temperature in °C
    CabinTemperature(f64),
}
