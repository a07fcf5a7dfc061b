//! Per-step display values

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::geo::Position;
use crate::preferences::NetworkPreference;

/// One route step, ready for display.
///
/// Distances are meters and durations seconds, measured from the vehicle's
/// matched position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayWaypoint {
    /// Index of the step in its route
    pub step_index: usize,
    /// Step coordinates
    pub position: Position,
    /// Display title
    pub title: String,
    /// Charger operator, from the `"Name [Operator]"` convention
    pub operator: Option<String>,
    /// User preference for the charger's network
    pub network_preference: NetworkPreference,
    /// Charger id
    pub charger_id: Option<u64>,
    /// Outlet type planned for this stop
    pub charger_type: Option<String>,
    /// Distance from the vehicle to this step
    pub trip_distance: f64,
    /// Distance from the previous displayed step (or the vehicle)
    pub step_distance: f64,
    /// Time from now until arrival
    pub trip_duration: f64,
    /// Arrival SoC corrected by the vehicle's actual SoC; first step only
    pub arrival_soc: Option<f64>,
    /// Arrival SoC as planned
    pub planned_arrival_soc: f64,
    /// Departure SoC, charge stops only
    pub departure_soc: Option<f64>,
    /// Charging time, charge stops only
    pub charge_duration: Option<f64>,
    /// Estimated time of arrival
    pub eta: DateTime<Utc>,
    /// Estimated time of departure, charge stops only
    pub etd: Option<DateTime<Utc>>,
    /// Free stalls of the planned outlet type
    pub available_stalls: Option<u32>,
    /// Total stalls of the planned outlet type
    pub total_stalls: Option<u32>,
    /// Whether the vehicle charges here
    pub is_charger: bool,
    /// Whether this step is one of the car's navigation destinations
    pub is_waypoint: bool,
    /// Charger the vehicle is departing from right now
    pub is_initial_charger: bool,
    /// Charger on the user's ignore list
    pub is_ignored_charger: bool,
}

impl DisplayWaypoint {
    /// Occupancy as `"free/total"`
    pub fn availability(&self) -> Option<String> {
        match (self.available_stalls, self.total_stalls) {
            (Some(free), Some(total)) => Some(format!("{free}/{total}")),
            _ => None,
        }
    }
}

/// Split `"Name [Operator]"` into its parts.
///
/// Names without a trailing bracket come back unchanged with no operator.
pub fn split_operator(name: &str) -> (String, Option<String>) {
    static OPERATOR: OnceLock<Regex> = OnceLock::new();
    let re = OPERATOR.get_or_init(|| Regex::new(r"^(.*?)\s*\[([^\[\]]+)\]\s*$").expect("operator pattern is valid"));

    match re.captures(name) {
        Some(caps) => {
            let title = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            let operator = caps.get(2).map(|m| m.as_str().trim().to_string());
            (title, operator)
        }
        None => (name.trim().to_string(), None),
    }
}
