//! Position Matching
//!
//! Locates the vehicle on a route. A fine match compares the position against
//! every path sample of every step; routes without path samples fall back to
//! point-to-segment distances between consecutive steps.
//!
//! Every minimum search uses a strict `<` in iteration order, so the first
//! candidate wins on ties.

use serde::{Deserialize, Serialize};

use crate::geo::{Position, PositionRuler};
use crate::plan::{Plan, Route};
use crate::telemetry::DestinationInfo;

/// Squared distance (m²) under which a destination counts as a route step
pub const WAYPOINT_MATCH_MAX_SQUARE_DISTANCE: f64 = 2500.0;

/// Where a position lies on one route
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionRouteData {
    /// Step whose leg the position is on
    pub step_index: Option<usize>,
    /// Closest path sample within that step, for fine matches only
    pub path_step_index: Option<usize>,
    /// Distance from the position to the match, in ruler units
    pub distance: f64,
}

impl PositionRouteData {
    /// Whether this came from a path-sample match
    pub fn is_fine(&self) -> bool {
        self.path_step_index.is_some()
    }
}

/// A car destination identified as one of the route's steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointIndexInfo {
    /// Step index in the route
    pub index: usize,
    /// The destination that matched
    pub destination: DestinationInfo,
}

/// Match `position` against a single route.
///
/// Returns `None` for a route without steps.
pub fn match_route(ruler: &PositionRuler, position: Position, route: &Route) -> Option<PositionRouteData> {
    match_path(ruler, position, route).or_else(|| match_segments(ruler, position, route))
}

/// Closest path sample over the whole route
fn match_path(ruler: &PositionRuler, position: Position, route: &Route) -> Option<PositionRouteData> {
    let mut best: Option<(usize, usize, f64)> = None;

    for (step_index, step) in route.steps.iter().enumerate() {
        for (path_index, sample) in step.path.iter().enumerate() {
            let sq = ruler.square_distance(position, sample.position());
            if best.map_or(true, |(_, _, min)| sq < min) {
                best = Some((step_index, path_index, sq));
            }
        }
    }

    best.map(|(step_index, path_index, sq)| PositionRouteData {
        step_index: Some(step_index),
        path_step_index: Some(path_index),
        distance: sq.sqrt(),
    })
}

/// Closest leg between consecutive steps, attributed to the earlier step
fn match_segments(ruler: &PositionRuler, position: Position, route: &Route) -> Option<PositionRouteData> {
    match route.steps.as_slice() {
        [] => None,
        [only] => Some(PositionRouteData {
            step_index: Some(0),
            path_step_index: None,
            distance: ruler.distance(position, only.position()),
        }),
        steps => {
            let mut best: Option<(usize, f64)> = None;
            for (index, pair) in steps.windows(2).enumerate() {
                let d = ruler.point_to_segment_distance(position, pair[0].position(), pair[1].position());
                if best.map_or(true, |(_, min)| d < min) {
                    best = Some((index, d));
                }
            }
            best.map(|(index, distance)| PositionRouteData {
                step_index: Some(index),
                path_step_index: None,
                distance,
            })
        }
    }
}

/// Match `position` against every route of `plan`.
///
/// Returns one entry per route plus the index of the route with the globally
/// smallest distance (first route wins on ties).
pub fn match_routes(
    ruler: &PositionRuler,
    position: Position,
    plan: &Plan,
) -> (Vec<Option<PositionRouteData>>, Option<usize>) {
    let matches: Vec<_> = plan
        .routes
        .iter()
        .map(|route| match_route(ruler, position, route))
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for (index, m) in matches.iter().enumerate() {
        if let Some(m) = m {
            if best.map_or(true, |(_, min)| m.distance < min) {
                best = Some((index, m.distance));
            }
        }
    }

    (matches, best.map(|(index, _)| index))
}

/// Map destinations onto route steps.
///
/// Only step coordinates are considered. A destination whose nearest step is
/// not strictly within [`WAYPOINT_MATCH_MAX_SQUARE_DISTANCE`] is dropped.
pub fn match_waypoints<'a>(
    ruler: &PositionRuler,
    route: &Route,
    destinations: impl IntoIterator<Item = &'a DestinationInfo>,
) -> Vec<WaypointIndexInfo> {
    destinations
        .into_iter()
        .filter(|d| d.position.is_valid())
        .filter_map(|destination| {
            let mut best: Option<(usize, f64)> = None;
            for (index, step) in route.steps.iter().enumerate() {
                let sq = ruler.square_distance(destination.position, step.position());
                if best.map_or(true, |(_, min)| sq < min) {
                    best = Some((index, sq));
                }
            }

            match best {
                Some((index, sq)) if sq < WAYPOINT_MATCH_MAX_SQUARE_DISTANCE => Some(WaypointIndexInfo {
                    index,
                    destination: destination.clone(),
                }),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PathStep, Step};

    fn step_at(p: Position) -> Step {
        Step {
            lat: p.latitude,
            lon: p.longitude,
            ..Default::default()
        }
    }

    fn sample_at(p: Position) -> PathStep {
        PathStep {
            lat: p.latitude,
            lon: p.longitude,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_route_has_no_match() {
        let origin = Position::new(52.0, 13.0);
        let ruler = PositionRuler::at(origin);
        assert_eq!(match_route(&ruler, origin, &Route::default()), None);
    }

    #[test]
    fn test_single_step_route_matches_by_point() {
        let origin = Position::new(52.0, 13.0);
        let ruler = PositionRuler::at(origin);
        let route = Route {
            steps: vec![step_at(ruler.offset(origin, 0.0, 120.0))],
            ..Default::default()
        };
        let m = match_route(&ruler, origin, &route).unwrap();
        assert_eq!(m.step_index, Some(0));
        assert!(!m.is_fine());
        assert!((m.distance - 120.0).abs() < 1e-6);
    }

    #[test]
    fn test_segment_match_attributes_earlier_step() {
        let origin = Position::new(52.0, 13.0);
        let ruler = PositionRuler::at(origin);
        let route = Route {
            steps: vec![
                step_at(origin),
                step_at(ruler.offset(origin, 1000.0, 0.0)),
                step_at(ruler.offset(origin, 2000.0, 0.0)),
            ],
            ..Default::default()
        };

        let p = ruler.offset(origin, 1500.0, 50.0);
        let m = match_route(&ruler, p, &route).unwrap();
        assert_eq!(m.step_index, Some(1));
        assert_eq!(m.path_step_index, None);
        assert!((m.distance - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_segment_tie_keeps_first() {
        let origin = Position::new(52.0, 13.0);
        let ruler = PositionRuler::at(origin);
        // Out and back: both legs clamp to the origin step
        let route = Route {
            steps: vec![
                step_at(origin),
                step_at(ruler.offset(origin, 1000.0, 0.0)),
                step_at(origin),
            ],
            ..Default::default()
        };

        let p = ruler.offset(origin, -500.0, 0.0);
        let m = match_route(&ruler, p, &route).unwrap();
        assert_eq!(m.step_index, Some(0));
        assert!((m.distance - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_path_match_picks_closest_sample() {
        let origin = Position::new(52.0, 13.0);
        let ruler = PositionRuler::at(origin);
        let mut first = step_at(origin);
        first.path = (0..5)
            .map(|i| sample_at(ruler.offset(origin, i as f64 * 200.0, 0.0)))
            .collect();
        let mut second = step_at(ruler.offset(origin, 1000.0, 0.0));
        second.path = (0..5)
            .map(|i| sample_at(ruler.offset(origin, 1000.0 + i as f64 * 200.0, 0.0)))
            .collect();
        let route = Route {
            steps: vec![first, second, step_at(ruler.offset(origin, 2000.0, 0.0))],
            ..Default::default()
        };

        let p = ruler.offset(origin, 1390.0, 30.0);
        let m = match_route(&ruler, p, &route).unwrap();
        assert_eq!(m.step_index, Some(1));
        assert_eq!(m.path_step_index, Some(2));
        assert!((m.distance - (10.0f64 * 10.0 + 30.0 * 30.0).sqrt()).abs() < 1e-3);
    }

    #[test]
    fn test_path_match_ignores_segments_when_samples_exist() {
        let origin = Position::new(52.0, 13.0);
        let ruler = PositionRuler::at(origin);
        let mut first = step_at(origin);
        first.path = vec![sample_at(ruler.offset(origin, 0.0, 500.0))];
        let route = Route {
            steps: vec![first, step_at(ruler.offset(origin, 1000.0, 0.0))],
            ..Default::default()
        };

        // On the leg itself, but only the lone sample is considered
        let p = ruler.offset(origin, 500.0, 0.0);
        let m = match_route(&ruler, p, &route).unwrap();
        assert!(m.is_fine());
        assert!((m.distance - (500.0f64 * 500.0 * 2.0).sqrt()).abs() < 1e-3);
    }

    #[test]
    fn test_match_routes_picks_global_minimum_first_on_tie() {
        let origin = Position::new(52.0, 13.0);
        let ruler = PositionRuler::at(origin);
        let near = Route {
            steps: vec![step_at(ruler.offset(origin, 0.0, 10.0))],
            ..Default::default()
        };
        let far = Route {
            steps: vec![step_at(ruler.offset(origin, 0.0, 90.0))],
            ..Default::default()
        };

        let plan = Plan {
            plan_id: "p".into(),
            routes: vec![far.clone(), near.clone(), near.clone()],
        };
        let (matches, best) = match_routes(&ruler, origin, &plan);
        assert_eq!(matches.len(), 3);
        assert_eq!(best, Some(1));

        let empty = Plan {
            plan_id: "p".into(),
            routes: vec![Route::default()],
        };
        assert_eq!(match_routes(&ruler, origin, &empty).1, None);
    }
}
