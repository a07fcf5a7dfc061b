//! Route Plans
//!
//! The planning API's result model: a plan holds alternative routes, a route
//! is an ordered list of steps (destinations and charge stops), and every
//! step carries the fine-grained path samples of the leg to the next step.

mod charger;

pub use charger::{Charger, Outlet};

use serde::{Deserialize, Serialize};

use crate::geo::Position;

/// A planning result with one or more alternative routes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Identifier assigned by the planning API
    pub plan_id: String,
    /// Alternatives, fastest first
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl Plan {
    /// Decode a plan from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Route at `index`
    pub fn route(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }
}

/// Aggregate values for a whole route
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteTotals {
    /// Driving distance in meters
    pub total_distance: f64,
    /// Total duration including charging, in seconds
    pub total_duration: f64,
    /// Time spent charging, in seconds
    pub total_charge_duration: f64,
}

/// One alternative route
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Route {
    /// Ordered steps; the first one is the departure point
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Route totals
    #[serde(default)]
    pub totals: RouteTotals,
}

impl Route {
    /// Whether any step carries path samples
    pub fn has_path(&self) -> bool {
        self.steps.iter().any(|s| !s.path.is_empty())
    }
}

/// A destination or charge stop along a route.
///
/// Distances (meters) and durations (seconds) are cumulative from the route
/// start; SoC values are percentages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Step {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Display name, chargers use `"Name [Operator]"`
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the vehicle charges here
    #[serde(default)]
    pub is_charger: bool,
    /// Planned SoC on arrival
    #[serde(default)]
    pub arrival_soc: f64,
    /// Planned SoC on departure
    #[serde(default)]
    pub departure_soc: f64,
    /// Distance driven when arriving
    #[serde(default)]
    pub arrival_distance: f64,
    /// Distance driven when departing
    #[serde(default)]
    pub departure_distance: f64,
    /// Time elapsed when arriving
    #[serde(default)]
    pub arrival_duration: f64,
    /// Time elapsed when departing
    #[serde(default)]
    pub departure_duration: f64,
    /// Time spent charging here
    #[serde(default)]
    pub charge_duration: f64,
    /// Outlet type the planner intends to use, e.g. `"ccs"`
    #[serde(default)]
    pub charger_type: Option<String>,
    /// Charger details for charge stops
    #[serde(default)]
    pub charger: Option<Charger>,
    /// Samples of the leg from this step to the next one
    #[serde(default)]
    pub path: Vec<PathStep>,
}

impl Step {
    /// Step coordinates
    pub fn position(&self) -> Position {
        Position::new(self.lat, self.lon)
    }
}

/// A fine-grained sample along a leg (~200 m apart)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathStep {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Meters left to the next step
    pub remaining_distance: f64,
    /// Seconds left to the next step
    pub remaining_time: f64,
    /// Estimated SoC at this sample
    pub soc: f64,
}

impl PathStep {
    /// Sample coordinates
    pub fn position(&self) -> Position {
        Position::new(self.lat, self.lon)
    }
}
