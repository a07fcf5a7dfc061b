//! Plan requests and the planner interface

use serde::{Deserialize, Serialize};
use std::future::Future;

use super::PlanError;
use crate::config::CarProfile;
use crate::geo::Position;
use crate::plan::Plan;
use crate::telemetry::CarData;

/// Which kind of plan is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// Full route to the destinations
    Route,
    /// Lookahead for alternative next charge stops
    NextCharger,
}

/// One entry of a request's destination list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDestination {
    /// Coordinates
    pub position: Position,
    /// Optional display name
    pub title: Option<String>,
    /// Set on the first entry when it is the vehicle's own position
    pub is_current_position: bool,
}

/// A request to the planning API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Car model code
    pub car_model: String,
    /// Ordered destinations, starting at the vehicle
    pub destinations: Vec<PlanDestination>,
    /// SoC at departure in percent
    pub initial_soc: f64,
    /// Outside temperature in °C, if known
    pub outside_temperature: Option<f64>,
    /// Ask for alternative routes
    pub find_alternatives: bool,
    /// Planning mode
    pub mode: PlanMode,
}

impl PlanRequest {
    /// Build a request from a telemetry snapshot.
    ///
    /// The destination list is the current position followed by the valid
    /// destinations (next, then final). Returns `None` when the snapshot is
    /// not plannable.
    pub fn for_car(car: &CarData, profile: &CarProfile, find_alternatives: bool, mode: PlanMode) -> Option<Self> {
        if !car.is_plannable() {
            return None;
        }

        let mut destinations = vec![PlanDestination {
            position: car.position,
            title: None,
            is_current_position: true,
        }];
        destinations.extend(car.destinations().into_iter().map(|d| PlanDestination {
            position: d.position,
            title: d.title.clone(),
            is_current_position: false,
        }));

        Some(Self {
            car_model: profile.model.clone(),
            destinations,
            initial_soc: car.state_of_charge,
            outside_temperature: car.temperatures.outside,
            find_alternatives,
            mode,
        })
    }
}

/// The routing API.
///
/// Implementations own the transport; the core only consumes the
/// success/error outcome. Calls may take arbitrarily long and are always
/// awaited off the planning context.
pub trait RoutePlanner: Send + Sync + 'static {
    /// Plan a route
    fn plan(&self, request: PlanRequest) -> impl Future<Output = Result<Plan, PlanError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::DestinationInfo;

    #[test]
    fn test_request_lists_current_position_first() {
        let car = CarData {
            position: Position::new(52.0, 13.0),
            next_destination: DestinationInfo {
                position: Position::new(52.5, 13.5),
                title: Some("Office".into()),
            },
            final_destination: DestinationInfo::at(Position::new(53.0, 14.0)),
            state_of_charge: 64.0,
            ..Default::default()
        };

        let req = PlanRequest::for_car(&car, &CarProfile::default(), true, PlanMode::Route).unwrap();
        assert_eq!(req.destinations.len(), 3);
        assert!(req.destinations[0].is_current_position);
        assert_eq!(req.destinations[1].title.as_deref(), Some("Office"));
        assert!(!req.destinations[2].is_current_position);
        assert_eq!(req.initial_soc, 64.0);
        assert_eq!(req.outside_temperature, None);
    }

    #[test]
    fn test_request_requires_plannable_car() {
        assert!(PlanRequest::for_car(&CarData::default(), &CarProfile::default(), false, PlanMode::Route).is_none());
    }
}
