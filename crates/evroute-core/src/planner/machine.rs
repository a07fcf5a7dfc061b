//! Planning state machine
//!
//! Owns the latest telemetry, the current plan and the match results. It is a
//! plain value driven by method calls; the side effects it wants performed
//! (plan requests, publishing to the display) come back as
//! [`PlanningEffect`]s for the planning context to execute.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{PlanError, PlanMode, PlanRequest};
use crate::config::{CarProfile, PipelineConfig};
use crate::geo::PositionRuler;
use crate::matching::{match_routes, match_waypoints, PositionRouteData, WaypointIndexInfo};
use crate::plan::Plan;
use crate::telemetry::CarData;

/// Planning lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlanningPhase {
    /// No valid position and destination
    #[default]
    Idle,
    /// A plan request is in flight
    Planning,
    /// A plan is available and being matched
    Planned,
}

/// Everything the display side needs about the current routing state
#[derive(Debug, Clone)]
pub struct RoutingSnapshot {
    /// Lifecycle phase
    pub phase: PlanningPhase,
    /// Telemetry the matches were computed from
    pub car: CarData,
    /// Current plan
    pub plan: Option<Arc<Plan>>,
    /// Next-charger lookahead plan
    pub next_charger_plan: Option<Arc<Plan>>,
    /// Match per route of `plan`
    pub route_matches: Vec<Option<PositionRouteData>>,
    /// Route currently followed
    pub route_index: Option<usize>,
    /// Car destinations found on the followed route
    pub waypoints: Vec<WaypointIndexInfo>,
    /// Last planning error
    pub error: Option<String>,
    /// Meters driven since the plan was requested
    pub distance_since_plan: Option<f64>,
}

impl RoutingSnapshot {
    /// Match of the followed route
    pub fn route_match(&self) -> Option<PositionRouteData> {
        self.route_index
            .and_then(|i| self.route_matches.get(i).copied())
            .flatten()
    }

    /// Whether the display would see anything different, ignoring telemetry
    /// fields that do not influence it
    fn same_routing(&self, other: &RoutingSnapshot) -> bool {
        self.phase == other.phase
            && same_plan(&self.plan, &other.plan)
            && same_plan(&self.next_charger_plan, &other.next_charger_plan)
            && self.route_matches == other.route_matches
            && self.route_index == other.route_index
            && self.waypoints == other.waypoints
            && self.error == other.error
            && self.distance_since_plan == other.distance_since_plan
            && self.car.state_of_charge == other.car.state_of_charge
    }
}

fn same_plan(a: &Option<Arc<Plan>>, b: &Option<Arc<Plan>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Work requested by the state machine
#[derive(Debug, Clone)]
pub enum PlanningEffect {
    /// Issue an asynchronous plan request
    RequestPlan(PlanRequest),
    /// Hand a new routing state to the display updater
    Publish(RoutingSnapshot),
}

/// Decides when to (re)plan and tracks the vehicle on the current plan
#[derive(Debug)]
pub struct PlanningStateMachine {
    car_profile: CarProfile,
    find_alternatives: bool,
    next_charger_lookahead: bool,

    phase: PlanningPhase,
    last_car: Option<CarData>,
    plan: Option<Arc<Plan>>,
    next_charger_plan: Option<Arc<Plan>>,
    route_matches: Vec<Option<PositionRouteData>>,
    route_index: Option<usize>,
    waypoints: Vec<WaypointIndexInfo>,
    odometer_at_trigger: Option<f64>,
    error: Option<String>,
    last_published: Option<RoutingSnapshot>,
}

impl PlanningStateMachine {
    /// Create an idle state machine
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            car_profile: config.car.clone(),
            find_alternatives: config.find_alternatives,
            next_charger_lookahead: config.next_charger_lookahead,
            phase: PlanningPhase::Idle,
            last_car: None,
            plan: None,
            next_charger_plan: None,
            route_matches: Vec::new(),
            route_index: None,
            waypoints: Vec::new(),
            odometer_at_trigger: None,
            error: None,
            last_published: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> PlanningPhase {
        self.phase
    }

    /// Current plan
    pub fn plan(&self) -> Option<&Arc<Plan>> {
        self.plan.as_ref()
    }

    /// Route being followed
    pub fn route_index(&self) -> Option<usize> {
        self.route_index
    }

    /// Last planning error
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process a new telemetry snapshot
    pub fn on_car_data(&mut self, car: CarData) -> Vec<PlanningEffect> {
        let previous = self.last_car.replace(car.clone());

        if !car.is_plannable() {
            if self.phase != PlanningPhase::Idle {
                tracing::info!("Position or destination lost, planning idle");
            }
            self.reset();
            return self.publish_if_changed().into_iter().collect();
        }

        let mut effects = Vec::new();
        let destinations_changed = previous.as_ref().map_or(true, |p| car.destinations_changed(p));

        if self.phase == PlanningPhase::Idle || destinations_changed {
            tracing::info!(
                latitude = car.position.latitude,
                longitude = car.position.longitude,
                soc = car.state_of_charge,
                "Destination changed, requesting plan"
            );
            self.phase = PlanningPhase::Planning;
            self.odometer_at_trigger = Some(car.odometer);
            effects.extend(self.requests_for(&car));
        }

        self.rematch();
        effects.extend(self.publish_if_changed());
        effects
    }

    /// Process the outcome of a plan request
    pub fn on_plan_result(&mut self, mode: PlanMode, result: Result<Plan, PlanError>) -> Vec<PlanningEffect> {
        if self.phase == PlanningPhase::Idle {
            tracing::debug!(?mode, "Dropping plan response received while idle");
            return Vec::new();
        }

        let result = result.and_then(|plan| {
            if plan.routes.is_empty() {
                Err(PlanError::NoRoutes)
            } else {
                Ok(plan)
            }
        });

        match (mode, result) {
            (PlanMode::Route, Ok(plan)) => {
                tracing::info!(plan_id = %plan.plan_id, routes = plan.routes.len(), "Plan received");
                self.plan = Some(Arc::new(plan));
                self.route_index = Some(0);
                self.error = None;
                self.phase = PlanningPhase::Planned;
                self.rematch();
            }
            (PlanMode::NextCharger, Ok(plan)) => {
                tracing::debug!(plan_id = %plan.plan_id, routes = plan.routes.len(), "Next-charger plan received");
                self.next_charger_plan = Some(Arc::new(plan));
            }
            (PlanMode::Route, Err(e)) => {
                tracing::warn!("Planning failed: {e}");
                self.error = Some(e.to_string());
            }
            (PlanMode::NextCharger, Err(e)) => {
                tracing::debug!("Next-charger lookahead failed: {e}");
                self.next_charger_plan = None;
            }
        }

        self.publish_if_changed().into_iter().collect()
    }

    /// Follow a specific route of the current plan
    pub fn select_route(&mut self, index: usize) -> Vec<PlanningEffect> {
        let Some(plan) = &self.plan else {
            tracing::debug!(index, "Route selected without a plan, ignoring");
            return Vec::new();
        };
        if index >= plan.routes.len() {
            tracing::debug!(index, routes = plan.routes.len(), "Route index out of range, ignoring");
            return Vec::new();
        }

        self.route_index = Some(index);
        self.rematch();
        self.publish_if_changed().into_iter().collect()
    }

    /// Current routing state
    pub fn snapshot(&self) -> RoutingSnapshot {
        let car = self.last_car.clone().unwrap_or_default();
        let distance_since_plan = match (&self.plan, self.odometer_at_trigger) {
            (Some(_), Some(start)) => Some(car.odometer - start),
            _ => None,
        };

        RoutingSnapshot {
            phase: self.phase,
            car,
            plan: self.plan.clone(),
            next_charger_plan: self.next_charger_plan.clone(),
            route_matches: self.route_matches.clone(),
            route_index: self.route_index,
            waypoints: self.waypoints.clone(),
            error: self.error.clone(),
            distance_since_plan,
        }
    }

    fn requests_for(&self, car: &CarData) -> Vec<PlanningEffect> {
        let mut modes = vec![PlanMode::Route];
        if self.next_charger_lookahead {
            modes.push(PlanMode::NextCharger);
        }

        modes
            .into_iter()
            .filter_map(|mode| PlanRequest::for_car(car, &self.car_profile, self.find_alternatives, mode))
            .map(PlanningEffect::RequestPlan)
            .collect()
    }

    fn reset(&mut self) {
        self.phase = PlanningPhase::Idle;
        self.plan = None;
        self.next_charger_plan = None;
        self.route_matches.clear();
        self.route_index = None;
        self.waypoints.clear();
        self.odometer_at_trigger = None;
        self.error = None;
    }

    /// Recompute matches against the current plan. A selected in-range route
    /// is kept; otherwise the route closest to the vehicle is chosen.
    fn rematch(&mut self) {
        let (Some(plan), Some(car)) = (&self.plan, &self.last_car) else {
            return;
        };
        if !car.position.is_valid() {
            return;
        }

        let ruler = PositionRuler::at(car.position);
        let (matches, closest) = match_routes(&ruler, car.position, plan);

        self.route_index = match self.route_index {
            Some(i) if i < plan.routes.len() => Some(i),
            _ => closest,
        };
        self.waypoints = self
            .route_index
            .and_then(|i| plan.route(i))
            .map(|route| match_waypoints(&ruler, route, car.destinations()))
            .unwrap_or_default();
        self.route_matches = matches;

        if let Some(m) = self.route_index.and_then(|i| self.route_matches[i]) {
            tracing::trace!(
                step = ?m.step_index,
                path_step = ?m.path_step_index,
                distance = m.distance,
                "Position matched"
            );
        }
    }

    fn publish_if_changed(&mut self) -> Option<PlanningEffect> {
        let snapshot = self.snapshot();
        if let Some(last) = &self.last_published {
            if last.same_routing(&snapshot) {
                return None;
            }
        }
        self.last_published = Some(snapshot.clone());
        Some(PlanningEffect::Publish(snapshot))
    }
}
