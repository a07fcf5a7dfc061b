//! Next-charger view
//!
//! Compares the first charge stop of every alternative in a lookahead plan.

use serde::{Deserialize, Serialize};

use super::route::{display_route, DisplayContext};
use super::waypoint::DisplayWaypoint;
use crate::plan::Plan;

/// First charger of one alternative route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextChargerOption {
    /// Route index in the lookahead plan
    pub route_index: usize,
    /// The charge stop
    pub charger: DisplayWaypoint,
    /// Route distance minus the shortest alternative, meters
    pub delta_distance: f64,
    /// Route duration minus the fastest alternative, seconds
    pub delta_duration: f64,
}

/// First charge stop of every alternative that has one.
///
/// Deltas are taken against the minimum total distance and duration across
/// the returned alternatives, so the best option shows zero.
pub fn next_charger_options(plan: &Plan, ctx: &DisplayContext<'_>) -> Vec<NextChargerOption> {
    let candidates: Vec<(usize, DisplayWaypoint, f64, f64)> = plan
        .routes
        .iter()
        .enumerate()
        .filter_map(|(route_index, route)| {
            let view = display_route(route, None, ctx);
            let charger = view.chargers().next()?.clone();
            Some((route_index, charger, view.trip_distance, view.arrival_duration))
        })
        .collect();

    let min_distance = candidates.iter().map(|c| c.2).fold(f64::INFINITY, f64::min);
    let min_duration = candidates.iter().map(|c| c.3).fold(f64::INFINITY, f64::min);

    candidates
        .into_iter()
        .map(|(route_index, charger, distance, duration)| NextChargerOption {
            route_index,
            charger,
            delta_distance: distance - min_distance,
            delta_duration: duration - min_duration,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Charger, Route, Step};
    use crate::preferences::NetworkPreferences;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn alternative(charger_id: u64, distance: f64, duration: f64) -> Route {
        let charger = Step {
            lat: 52.5,
            lon: 13.0,
            is_charger: true,
            arrival_distance: distance / 2.0,
            departure_distance: distance / 2.0,
            arrival_duration: duration / 2.0,
            departure_duration: duration / 2.0 + 600.0,
            charge_duration: 600.0,
            charger: Some(Charger {
                id: charger_id,
                name: format!("Charger {charger_id}"),
                network_id: None,
                outlets: Vec::new(),
            }),
            ..Default::default()
        };
        let end = Step {
            lat: 53.0,
            lon: 13.0,
            arrival_distance: distance,
            arrival_duration: duration,
            ..Default::default()
        };
        Route {
            steps: vec![Step { lat: 52.0, lon: 13.0, ..Default::default() }, charger, end],
            ..Default::default()
        }
    }

    #[test]
    fn test_deltas_against_best_alternative() {
        let no_charger = Route {
            steps: vec![
                Step { lat: 52.0, lon: 13.0, ..Default::default() },
                Step { lat: 53.0, lon: 13.0, arrival_distance: 1.0, ..Default::default() },
            ],
            ..Default::default()
        };
        let plan = Plan {
            plan_id: "lookahead".to_string(),
            routes: vec![
                alternative(1, 120_000.0, 5000.0),
                no_charger,
                alternative(2, 100_000.0, 5600.0),
            ],
        };
        let ignored = BTreeSet::new();
        let prefs = NetworkPreferences::new();
        let ctx = DisplayContext {
            ignored_chargers: &ignored,
            network_preferences: &prefs,
            waypoints: &[],
            current_soc: None,
            outlet_type: None,
            now: Utc::now(),
        };

        let options = next_charger_options(&plan, &ctx);

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].route_index, 0);
        assert_eq!(options[0].charger.charger_id, Some(1));
        assert_eq!(options[0].delta_distance, 20_000.0);
        assert_eq!(options[0].delta_duration, 0.0);
        assert_eq!(options[1].route_index, 2);
        assert_eq!(options[1].delta_distance, 0.0);
        assert_eq!(options[1].delta_duration, 600.0);
    }

    #[test]
    fn test_empty_plan() {
        let ignored = BTreeSet::new();
        let prefs = NetworkPreferences::new();
        let ctx = DisplayContext {
            ignored_chargers: &ignored,
            network_preferences: &prefs,
            waypoints: &[],
            current_soc: None,
            outlet_type: None,
            now: Utc::now(),
        };
        assert!(next_charger_options(&Plan::default(), &ctx).is_empty());
    }
}
