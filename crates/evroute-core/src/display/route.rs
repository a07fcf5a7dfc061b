//! Route display transform
//!
//! Turns a route plus the vehicle's match on it into the list of upcoming
//! stops with trip distances, ETAs and charging summaries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::waypoint::{split_operator, DisplayWaypoint};
use crate::matching::{PositionRouteData, WaypointIndexInfo};
use crate::plan::{Route, Step};
use crate::preferences::{NetworkPreference, NetworkPreferences};

/// A matched charger is shown as the departure stop while the vehicle is
/// within this many path samples of it
pub const INITIAL_CHARGER_PATH_STEPS: usize = 2;

/// Inputs of the transform that do not come from the route itself
#[derive(Debug, Clone, Copy)]
pub struct DisplayContext<'a> {
    /// Charger ids on the ignore list
    pub ignored_chargers: &'a BTreeSet<u64>,
    /// Preferences per network id
    pub network_preferences: &'a NetworkPreferences,
    /// Car destinations matched on this route
    pub waypoints: &'a [WaypointIndexInfo],
    /// Vehicle state of charge in percent
    pub current_soc: Option<f64>,
    /// Outlet type used when a step does not name one
    pub outlet_type: Option<&'a str>,
    /// Reference time for ETAs
    pub now: DateTime<Utc>,
}

/// Display-ready view of one route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRoute {
    /// Distance from the vehicle to the final step, meters
    pub trip_distance: f64,
    /// Time from now until arrival at the final step, seconds
    pub arrival_duration: f64,
    /// Charge stops ahead
    pub charge_count: usize,
    /// Total charging time ahead, seconds
    pub charge_duration: f64,
    /// Distance between the vehicle and its match; `None` when unmatched
    pub deviation_from_route: Option<f64>,
    /// Whether any upcoming step is one of the car's destinations
    pub contains_waypoint: bool,
    /// Upcoming stops
    pub waypoints: Vec<DisplayWaypoint>,
}

impl DisplayRoute {
    /// Whether the vehicle could be placed on the route
    pub fn is_matched(&self) -> bool {
        self.deviation_from_route.is_some()
    }

    /// Upcoming charge stops
    pub fn chargers(&self) -> impl Iterator<Item = &DisplayWaypoint> {
        self.waypoints.iter().filter(|w| w.is_charger)
    }
}

/// Where the vehicle is along the route
#[derive(Debug, Clone, Copy)]
struct RouteOrigin {
    distance: f64,
    duration: f64,
}

/// Build the display view of `route` for a vehicle at `route_match`.
pub fn display_route(route: &Route, route_match: Option<PositionRouteData>, ctx: &DisplayContext<'_>) -> DisplayRoute {
    let steps = &route.steps;

    let (start, origin, soc_correction) = match route_match.and_then(|m| m.step_index.map(|i| (m, i))) {
        Some((m, i)) if i < steps.len() => {
            let is_initial_charger = steps[i].is_charger
                && m.path_step_index.map_or(false, |p| p < INITIAL_CHARGER_PATH_STEPS);
            let start = if is_initial_charger { i } else { i + 1 };
            (start, origin_of(steps, i, m), soc_correction(steps, i, m, ctx.current_soc))
        }
        _ => {
            let origin = steps.first().map_or(RouteOrigin { distance: 0.0, duration: 0.0 }, |s| RouteOrigin {
                distance: s.departure_distance,
                duration: s.departure_duration,
            });
            (1, origin, None)
        }
    };
    let matched_index = route_match.and_then(|m| m.step_index);

    let mut waypoints = Vec::new();
    let mut charge_count = 0;
    let mut charge_duration = 0.0;
    let mut previous_trip_distance = 0.0;

    for (index, step) in steps.iter().enumerate().skip(start) {
        let mut waypoint = display_step(index, step, origin, ctx);
        waypoint.step_distance = waypoint.trip_distance - previous_trip_distance;
        previous_trip_distance = waypoint.trip_distance;
        waypoint.is_initial_charger = Some(index) == matched_index;

        if let Some((next_index, delta)) = soc_correction {
            if index == next_index {
                waypoint.arrival_soc = Some(step.arrival_soc + delta);
            }
        }

        if waypoint.is_charger {
            charge_count += 1;
            charge_duration += step.charge_duration;
        }
        waypoints.push(waypoint);
    }

    let (trip_distance, arrival_duration) = waypoints
        .last()
        .map_or((0.0, 0.0), |w| (w.trip_distance, w.trip_duration));

    DisplayRoute {
        trip_distance,
        arrival_duration,
        charge_count,
        charge_duration,
        deviation_from_route: route_match.filter(|m| m.step_index.is_some()).map(|m| m.distance),
        contains_waypoint: waypoints.iter().any(|w| w.is_waypoint),
        waypoints,
    }
}

/// Cumulative distance and duration at the vehicle's match
fn origin_of(steps: &[Step], index: usize, m: PositionRouteData) -> RouteOrigin {
    let step = &steps[index];
    let fine = m
        .path_step_index
        .and_then(|p| step.path.get(p))
        .zip(steps.get(index + 1));

    match fine {
        Some((sample, next)) => RouteOrigin {
            distance: next.arrival_distance - sample.remaining_distance,
            duration: next.arrival_duration - sample.remaining_time,
        },
        None => RouteOrigin {
            distance: step.departure_distance,
            duration: step.departure_duration,
        },
    }
}

/// Step index that receives the corrected arrival SoC, and the correction
fn soc_correction(steps: &[Step], index: usize, m: PositionRouteData, current_soc: Option<f64>) -> Option<(usize, f64)> {
    if index + 1 >= steps.len() {
        return None;
    }
    let sample = steps[index].path.get(m.path_step_index?)?;
    Some((index + 1, current_soc? - sample.soc))
}

fn display_step(index: usize, step: &Step, origin: RouteOrigin, ctx: &DisplayContext<'_>) -> DisplayWaypoint {
    let waypoint_info = ctx.waypoints.iter().find(|w| w.index == index);

    let (name, operator) = match step.charger.as_ref().map(|c| c.name.as_str()).or(step.name.as_deref()) {
        Some(name) => split_operator(name),
        None => (String::new(), None),
    };
    let title = waypoint_info
        .and_then(|w| w.destination.title.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| {
            if name.is_empty() {
                format!("{:.5}, {:.5}", step.lat, step.lon)
            } else {
                name
            }
        });

    let charger_id = step.charger.as_ref().map(|c| c.id);
    let network_preference = step
        .charger
        .as_ref()
        .and_then(|c| c.network_id)
        .and_then(|id| ctx.network_preferences.get(&id).copied())
        .unwrap_or(NetworkPreference::DontCare);
    let charger_type = step.charger_type.clone().or_else(|| ctx.outlet_type.map(str::to_string));
    let occupancy = step
        .charger
        .as_ref()
        .and_then(|c| c.occupancy(charger_type.as_deref()));

    let trip_distance = (step.arrival_distance - origin.distance).max(0.0);
    let trip_duration = (step.arrival_duration - origin.duration).max(0.0);
    let eta = offset_by(ctx.now, trip_duration);
    let etd = step.is_charger.then(|| offset_by(eta, step.charge_duration));

    DisplayWaypoint {
        step_index: index,
        position: step.position(),
        title,
        operator,
        network_preference,
        charger_id,
        charger_type: if step.is_charger { charger_type } else { None },
        trip_distance,
        step_distance: 0.0,
        trip_duration,
        arrival_soc: None,
        planned_arrival_soc: step.arrival_soc,
        departure_soc: step.is_charger.then_some(step.departure_soc),
        charge_duration: step.is_charger.then_some(step.charge_duration),
        eta,
        etd,
        available_stalls: occupancy.map(|(free, _)| free),
        total_stalls: occupancy.map(|(_, total)| total),
        is_charger: step.is_charger,
        is_waypoint: waypoint_info.is_some(),
        is_initial_charger: false,
        is_ignored_charger: charger_id.map_or(false, |id| ctx.ignored_chargers.contains(&id)),
    }
}

/// `start` plus `seconds`, clamped to the representable range
fn offset_by(start: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    let bound = if seconds < 0.0 { DateTime::<Utc>::MIN_UTC } else { DateTime::<Utc>::MAX_UTC };
    Duration::try_milliseconds((seconds * 1000.0).round() as i64)
        .and_then(|delta| start.checked_add_signed(delta))
        .unwrap_or(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Position;
    use crate::plan::{Charger, Outlet, PathStep};
    use crate::telemetry::DestinationInfo;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn step(lat: f64, distance: f64, duration: f64) -> Step {
        Step {
            lat,
            lon: 13.0,
            arrival_distance: distance,
            departure_distance: distance,
            arrival_duration: duration,
            departure_duration: duration,
            ..Default::default()
        }
    }

    fn charger_step(lat: f64, distance: f64, duration: f64, charge: f64) -> Step {
        Step {
            is_charger: true,
            arrival_soc: 15.0,
            departure_soc: 80.0,
            charge_duration: charge,
            departure_duration: duration + charge,
            charger: Some(Charger {
                id: 501,
                name: "Autohof Nord [Ionity]".to_string(),
                network_id: Some(7),
                outlets: vec![Outlet {
                    outlet_type: "ccs".to_string(),
                    stalls: 6,
                    available: Some(4),
                }],
            }),
            ..step(lat, distance, duration)
        }
    }

    /// start → charger (100 km, 1 h, 30 min charge) → destination (200 km)
    fn route() -> Route {
        let mut start = step(52.0, 0.0, 0.0);
        start.departure_soc = 90.0;
        start.path = vec![
            PathStep { lat: 52.0, lon: 13.0, remaining_distance: 100_000.0, remaining_time: 3600.0, soc: 90.0 },
            PathStep { lat: 52.45, lon: 13.0, remaining_distance: 50_000.0, remaining_time: 1800.0, soc: 52.0 },
        ];
        let mut charger = charger_step(52.9, 100_000.0, 3600.0, 1800.0);
        charger.path = vec![
            PathStep { lat: 52.9, lon: 13.0, remaining_distance: 100_000.0, remaining_time: 3600.0, soc: 80.0 },
            PathStep { lat: 53.0, lon: 13.0, remaining_distance: 90_000.0, remaining_time: 3240.0, soc: 76.0 },
            PathStep { lat: 53.3, lon: 13.0, remaining_distance: 60_000.0, remaining_time: 2160.0, soc: 65.0 },
        ];
        let mut end = step(53.8, 200_000.0, 9000.0);
        end.arrival_soc = 45.0;
        end.name = Some("Rostock".to_string());
        Route { steps: vec![start, charger, end], ..Default::default() }
    }

    fn ctx<'a>(ignored: &'a BTreeSet<u64>, prefs: &'a NetworkPreferences, waypoints: &'a [WaypointIndexInfo]) -> DisplayContext<'a> {
        DisplayContext {
            ignored_chargers: ignored,
            network_preferences: prefs,
            waypoints,
            current_soc: Some(50.0),
            outlet_type: Some("ccs"),
            now: now(),
        }
    }

    #[test]
    fn test_fine_match_on_first_leg() {
        let ignored = BTreeSet::new();
        let prefs = NetworkPreferences::new();
        let route = route();
        let m = PositionRouteData { step_index: Some(0), path_step_index: Some(1), distance: 12.0 };

        let view = display_route(&route, Some(m), &ctx(&ignored, &prefs, &[]));

        assert_eq!(view.waypoints.len(), 2);
        assert_eq!(view.deviation_from_route, Some(12.0));
        let charger = &view.waypoints[0];
        assert_eq!(charger.step_index, 1);
        assert_eq!(charger.trip_distance, 50_000.0);
        assert_eq!(charger.trip_duration, 1800.0);
        assert_eq!(charger.eta, now() + Duration::seconds(1800));
        assert_eq!(charger.etd, Some(now() + Duration::seconds(3600)));
        // planned 15 % + (50 % actual - 52 % predicted)
        assert_eq!(charger.arrival_soc, Some(13.0));
        assert_eq!(charger.title, "Autohof Nord");
        assert_eq!(charger.operator.as_deref(), Some("Ionity"));
        assert_eq!(charger.availability().as_deref(), Some("4/6"));

        let end = &view.waypoints[1];
        assert_eq!(end.arrival_soc, None);
        assert_eq!(end.trip_distance, 150_000.0);
        assert_eq!(end.step_distance, 100_000.0);
        assert_eq!(view.trip_distance, 150_000.0);
        assert_eq!(view.arrival_duration, 7200.0);
        assert_eq!(view.charge_count, 1);
        assert_eq!(view.charge_duration, 1800.0);
    }

    #[test]
    fn test_departing_charger_is_initial() {
        let ignored = BTreeSet::new();
        let prefs = NetworkPreferences::new();
        let route = route();
        let m = PositionRouteData { step_index: Some(1), path_step_index: Some(1), distance: 3.0 };

        let view = display_route(&route, Some(m), &ctx(&ignored, &prefs, &[]));

        assert_eq!(view.waypoints.len(), 2);
        let first = &view.waypoints[0];
        assert!(first.is_initial_charger);
        assert_eq!(first.trip_distance, 0.0);
        assert_eq!(view.waypoints[1].trip_distance, 90_000.0);
        assert_eq!(view.waypoints[1].arrival_soc, Some(45.0 + (50.0 - 76.0)));
    }

    #[test]
    fn test_charger_left_behind_is_skipped() {
        let ignored = BTreeSet::new();
        let prefs = NetworkPreferences::new();
        let route = route();
        let m = PositionRouteData { step_index: Some(1), path_step_index: Some(2), distance: 3.0 };

        let view = display_route(&route, Some(m), &ctx(&ignored, &prefs, &[]));

        assert_eq!(view.waypoints.len(), 1);
        assert_eq!(view.waypoints[0].step_index, 2);
        assert_eq!(view.charge_count, 0);
    }

    #[test]
    fn test_segment_match_uses_departure_totals() {
        let ignored = BTreeSet::new();
        let prefs = NetworkPreferences::new();
        let route = route();
        let m = PositionRouteData { step_index: Some(1), path_step_index: None, distance: 40.0 };

        let view = display_route(&route, Some(m), &ctx(&ignored, &prefs, &[]));

        assert_eq!(view.waypoints.len(), 1);
        let end = &view.waypoints[0];
        assert_eq!(end.trip_distance, 100_000.0);
        assert_eq!(end.trip_duration, 9000.0 - 5400.0);
        assert_eq!(end.arrival_soc, None);
    }

    #[test]
    fn test_unmatched_route_starts_after_departure() {
        let ignored = BTreeSet::from([501]);
        let prefs = NetworkPreferences::from([(7, NetworkPreference::Avoid)]);
        let route = route();

        let view = display_route(&route, None, &ctx(&ignored, &prefs, &[]));

        assert!(!view.is_matched());
        assert_eq!(view.waypoints.len(), 2);
        let charger = &view.waypoints[0];
        assert!(charger.is_ignored_charger);
        assert_eq!(charger.network_preference, NetworkPreference::Avoid);
        assert_eq!(charger.trip_distance, 100_000.0);
    }

    #[test]
    fn test_waypoint_title_overrides_step_name() {
        let ignored = BTreeSet::new();
        let prefs = NetworkPreferences::new();
        let route = route();
        let waypoints = vec![WaypointIndexInfo {
            index: 2,
            destination: DestinationInfo {
                position: Position::new(53.8, 13.0),
                title: Some("Home".to_string()),
            },
        }];

        let view = display_route(&route, None, &ctx(&ignored, &prefs, &waypoints));

        assert!(view.contains_waypoint);
        let end = view.waypoints.last().unwrap();
        assert!(end.is_waypoint);
        assert_eq!(end.title, "Home");
        assert!(!view.waypoints[0].is_waypoint);
    }

    #[test]
    fn test_out_of_range_durations_clamp_eta() {
        let ignored = BTreeSet::new();
        let prefs = NetworkPreferences::new();
        let mut route = route();
        route.steps[1].arrival_duration = 1e300;
        route.steps[1].charge_duration = -1e300;

        let view = display_route(&route, None, &ctx(&ignored, &prefs, &[]));

        let charger = &view.waypoints[0];
        assert_eq!(charger.eta, DateTime::<Utc>::MAX_UTC);
        assert_eq!(charger.etd, Some(DateTime::<Utc>::MIN_UTC));
    }

    #[test]
    fn test_empty_route() {
        let ignored = BTreeSet::new();
        let prefs = NetworkPreferences::new();
        let view = display_route(&Route::default(), None, &ctx(&ignored, &prefs, &[]));
        assert!(view.waypoints.is_empty());
        assert_eq!(view.trip_distance, 0.0);
        assert!(!view.contains_waypoint);
    }
}
