//! Display Model
//!
//! Pure transforms from the routing state to what the UI shows: one
//! [`DisplayRoute`] per alternative, the selected route's stops and the
//! next-charger comparison.

mod next_charger;
mod route;
mod waypoint;

pub use next_charger::{next_charger_options, NextChargerOption};
pub use route::{display_route, DisplayContext, DisplayRoute, INITIAL_CHARGER_PATH_STEPS};
pub use waypoint::{split_operator, DisplayWaypoint};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matching::WaypointIndexInfo;
use crate::planner::{PlanningPhase, RoutingSnapshot};
use crate::preferences::Preferences;

/// Everything the UI redraws from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayModel {
    /// Planning lifecycle phase
    pub phase: PlanningPhase,
    /// One entry per alternative route
    pub routes: Vec<DisplayRoute>,
    /// Route the vehicle follows
    pub selected_route: Option<usize>,
    /// Stop highlighted by the user, index into the selected route's stops
    pub selected_waypoint: Option<usize>,
    /// First charger of each lookahead alternative
    pub next_chargers: Vec<NextChargerOption>,
    /// Last planning error
    pub error: Option<String>,
    /// Meters driven since the plan was requested
    pub distance_since_plan: Option<f64>,
}

impl DisplayModel {
    /// Build the model for `snapshot`.
    ///
    /// Every route gets its own match; car destinations are only known on the
    /// followed route.
    pub fn build(
        snapshot: &RoutingSnapshot,
        preferences: &Preferences,
        outlet_type: Option<&str>,
        selected_waypoint: Option<usize>,
        now: DateTime<Utc>,
    ) -> Self {
        let current_soc = snapshot.car.state_of_charge;
        let base = DisplayContext {
            ignored_chargers: preferences.ignored_chargers(),
            network_preferences: preferences.network_preferences(),
            waypoints: &[],
            current_soc: (current_soc > 0.0).then_some(current_soc),
            outlet_type,
            now,
        };

        let routes: Vec<DisplayRoute> = snapshot
            .plan
            .as_deref()
            .map(|plan| {
                plan.routes
                    .iter()
                    .enumerate()
                    .map(|(i, route)| {
                        let waypoints: &[WaypointIndexInfo] =
                            if Some(i) == snapshot.route_index { &snapshot.waypoints } else { &[] };
                        let route_match = snapshot.route_matches.get(i).copied().flatten();
                        display_route(route, route_match, &DisplayContext { waypoints, ..base })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let next_chargers = snapshot
            .next_charger_plan
            .as_deref()
            .map(|plan| next_charger_options(plan, &base))
            .unwrap_or_default();

        let selected_route = snapshot.route_index.filter(|&i| i < routes.len());
        let stop_count = selected_route.map_or(0, |i| routes[i].waypoints.len());

        Self {
            phase: snapshot.phase,
            routes,
            selected_route,
            selected_waypoint: selected_waypoint.filter(|&i| i < stop_count),
            next_chargers,
            error: snapshot.error.clone(),
            distance_since_plan: snapshot.distance_since_plan,
        }
    }

    /// The followed route's view
    pub fn selected(&self) -> Option<&DisplayRoute> {
        self.selected_route.and_then(|i| self.routes.get(i))
    }

    /// Stops of the followed route
    pub fn waypoints(&self) -> &[DisplayWaypoint] {
        self.selected().map_or(&[], |r| r.waypoints.as_slice())
    }

    /// The stop highlighted by the user
    pub fn selected_waypoint(&self) -> Option<&DisplayWaypoint> {
        self.selected_waypoint.and_then(|i| self.waypoints().get(i))
    }
}
