//! Demo Mode - simulated drive and offline planner
//!
//! [`DemoDrive`] replays a vehicle driving along a polyline, producing the
//! telemetry events a real car would send. [`StraightLinePlanner`] answers
//! plan requests without a network by connecting the destinations with
//! straight legs, so the whole pipeline can run on a desk.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geo::{Position, PositionRuler};
use crate::plan::{Charger, Outlet, PathStep, Plan, Route, RouteTotals, Step};
use crate::planner::{PlanError, PlanMode, PlanRequest, RoutePlanner};
use crate::telemetry::{DestinationInfo, DrivingMode, TelemetryEvent};

/// Simulated vehicle driving a fixed polyline
pub struct DemoDrive {
    route: Vec<Position>,
    destination_title: Option<String>,
    /// Cumulative polyline length at each vertex, meters
    vertex_distances: Vec<f64>,
    speed_kmh: f64,
    /// SoC drained per kilometer, percent
    consumption: f64,
    /// GPS noise amplitude, meters
    jitter: f64,
    traveled: f64,
    odometer: f64,
    soc: f64,
    announced: bool,
    rng: StdRng,
}

impl DemoDrive {
    /// Drive along `route`; the last point is the final destination
    pub fn new(route: Vec<Position>) -> Self {
        Self::with_rng(route, StdRng::from_entropy())
    }

    /// Deterministic drive for tests
    pub fn with_seed(route: Vec<Position>, seed: u64) -> Self {
        Self::with_rng(route, StdRng::seed_from_u64(seed))
    }

    fn with_rng(route: Vec<Position>, rng: StdRng) -> Self {
        let mut vertex_distances = Vec::with_capacity(route.len());
        let mut total = 0.0;
        for (i, p) in route.iter().enumerate() {
            if i > 0 {
                total += PositionRuler::at(*p).distance(route[i - 1], *p);
            }
            vertex_distances.push(total);
        }

        Self {
            route,
            destination_title: None,
            vertex_distances,
            speed_kmh: 100.0,
            consumption: 0.18,
            jitter: 5.0,
            traveled: 0.0,
            odometer: 12_000_000.0,
            soc: 80.0,
            announced: false,
            rng,
        }
    }

    /// Constant driving speed
    pub fn with_speed(mut self, kmh: f64) -> Self {
        self.speed_kmh = kmh.max(0.0);
        self
    }

    /// Initial state of charge
    pub fn with_state_of_charge(mut self, soc: f64) -> Self {
        self.soc = soc.clamp(0.0, 100.0);
        self
    }

    /// GPS noise amplitude in meters; zero disables it
    pub fn with_jitter(mut self, meters: f64) -> Self {
        self.jitter = meters.max(0.0);
        self
    }

    /// Name reported for the final destination
    pub fn with_destination_title(mut self, title: impl Into<String>) -> Self {
        self.destination_title = Some(title.into());
        self
    }

    /// Polyline length in meters
    pub fn length(&self) -> f64 {
        self.vertex_distances.last().copied().unwrap_or(0.0)
    }

    /// Meters driven so far
    pub fn traveled(&self) -> f64 {
        self.traveled
    }

    /// Whether the destination has been reached
    pub fn is_finished(&self) -> bool {
        self.traveled >= self.length()
    }

    /// Current state of charge
    pub fn state_of_charge(&self) -> f64 {
        self.soc
    }

    /// Exact position along the polyline, without GPS noise
    pub fn position(&self) -> Position {
        let Some(last) = self.route.last() else {
            return Position::invalid();
        };
        let segment = self.vertex_distances.partition_point(|&d| d <= self.traveled);
        if segment == 0 || segment >= self.route.len() {
            return if segment == 0 { self.route[0] } else { *last };
        }

        let (a, b) = (self.route[segment - 1], self.route[segment]);
        let (start, end) = (self.vertex_distances[segment - 1], self.vertex_distances[segment]);
        let t = if end > start { (self.traveled - start) / (end - start) } else { 0.0 };
        Position::new(
            a.latitude + (b.latitude - a.latitude) * t,
            a.longitude + (b.longitude - a.longitude) * t,
        )
    }

    /// Advance the simulation and return the telemetry it produced.
    ///
    /// The first call also announces the destination, driving mode and
    /// temperatures.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<TelemetryEvent> {
        let mut events = Vec::new();

        if !self.announced {
            self.announced = true;
            if let Some(&destination) = self.route.last() {
                events.push(TelemetryEvent::FinalDestination(DestinationInfo {
                    position: destination,
                    title: self.destination_title.clone(),
                }));
            }
            events.push(TelemetryEvent::DrivingMode(DrivingMode::Eco));
            events.push(TelemetryEvent::OutsideTemperature(self.rng.gen_range(8.0..22.0)));
            events.push(TelemetryEvent::BatteryTemperature(25.0));
        }

        let speed = if self.is_finished() { 0.0 } else { self.speed_kmh };
        let step = (speed / 3.6 * elapsed.as_secs_f64()).min(self.length() - self.traveled).max(0.0);
        self.traveled += step;
        self.odometer += step;
        self.soc = (self.soc - step / 1000.0 * self.consumption).max(0.0);

        let mut position = self.position();
        if self.jitter > 0.0 && position.is_valid() {
            let dx = self.rng.gen_range(-self.jitter..=self.jitter);
            let dy = self.rng.gen_range(-self.jitter..=self.jitter);
            position = PositionRuler::at(position).offset(position, dx, dy);
        }

        let torque = if speed > 0.0 { 40.0 + self.rng.gen_range(-15.0..15.0) } else { 0.0 };
        events.extend([
            TelemetryEvent::Position(position),
            TelemetryEvent::Odometer(self.odometer),
            TelemetryEvent::StateOfCharge(self.soc),
            TelemetryEvent::Speed(speed),
            TelemetryEvent::Torque(torque),
        ]);
        events
    }
}

impl std::fmt::Debug for DemoDrive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoDrive")
            .field("points", &self.route.len())
            .field("traveled", &self.traveled)
            .field("soc", &self.soc)
            .finish_non_exhaustive()
    }
}

/// Offline planner connecting destinations with straight legs.
///
/// Adds a charge stop halfway along any leg that would otherwise arrive
/// below the reserve SoC.
#[derive(Debug)]
pub struct StraightLinePlanner {
    speed_kmh: f64,
    consumption: f64,
    reserve_soc: f64,
    charge_to_soc: f64,
    /// Percent per minute
    charge_rate: f64,
    sample_spacing: f64,
    latency: Duration,
    next_id: AtomicU64,
}

impl Default for StraightLinePlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl StraightLinePlanner {
    /// Path sample spacing in meters
    pub const SAMPLE_SPACING: f64 = 200.0;

    /// Create a planner with typical highway values
    pub fn new() -> Self {
        Self {
            speed_kmh: 100.0,
            consumption: 0.18,
            reserve_soc: 10.0,
            charge_to_soc: 80.0,
            charge_rate: 2.0,
            sample_spacing: Self::SAMPLE_SPACING,
            latency: Duration::ZERO,
            next_id: AtomicU64::new(1),
        }
    }

    /// Simulated response time
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Build the plan synchronously
    pub fn build_plan(&self, request: &PlanRequest) -> Result<Plan, PlanError> {
        if request.destinations.len() < 2 {
            return Err(PlanError::NothingToPlan);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut steps: Vec<Step> = Vec::new();
        let mut distance = 0.0;
        let mut duration = 0.0;
        let mut soc = request.initial_soc;

        let first = &request.destinations[0];
        steps.push(Step {
            lat: first.position.latitude,
            lon: first.position.longitude,
            name: first.title.clone(),
            arrival_soc: soc,
            departure_soc: soc,
            ..Default::default()
        });

        for pair in request.destinations.windows(2) {
            let (from, to) = (pair[0].position, pair[1].position);
            let leg = PositionRuler::at(from).distance(from, to);
            let leg_soc = leg / 1000.0 * self.consumption;

            if soc - leg_soc < self.reserve_soc {
                let mid = Position::new(
                    (from.latitude + to.latitude) / 2.0,
                    (from.longitude + to.longitude) / 2.0,
                );
                self.push_leg(&mut steps, mid, &mut distance, &mut duration, &mut soc);
                let target = self.charge_to_soc.max(soc);
                let charge_duration = (target - soc) / self.charge_rate * 60.0;
                let stop_count = steps.len();
                if let Some(stop) = steps.last_mut() {
                    stop.is_charger = true;
                    stop.charge_duration = charge_duration;
                    stop.departure_soc = target;
                    stop.departure_duration = duration + charge_duration;
                    stop.charger_type = Some("ccs".to_string());
                    stop.charger = Some(Charger {
                        id: 1000 + stop_count as u64,
                        name: format!("Demo Charger {} [Demo Network]", stop_count - 1),
                        network_id: Some(1),
                        outlets: vec![Outlet {
                            outlet_type: "ccs".to_string(),
                            stalls: 4,
                            available: Some(2),
                        }],
                    });
                }
                duration += charge_duration;
                soc = target;
            }

            self.push_leg(&mut steps, to, &mut distance, &mut duration, &mut soc);
            if let Some(step) = steps.last_mut() {
                step.name = pair[1].title.clone();
            }
        }

        let total_charge_duration = steps.iter().map(|s| s.charge_duration).sum();
        let route = Route {
            steps,
            totals: RouteTotals {
                total_distance: distance,
                total_duration: duration,
                total_charge_duration,
            },
        };

        tracing::debug!(plan_id = id, distance_m = distance, mode = ?request.mode, "Demo plan built");

        Ok(Plan {
            plan_id: format!("demo-{id}"),
            routes: vec![route],
        })
    }

    /// Append a step at `to`, filling the previous step's path samples
    fn push_leg(&self, steps: &mut Vec<Step>, to: Position, distance: &mut f64, duration: &mut f64, soc: &mut f64) {
        let Some(previous) = steps.last_mut() else {
            return;
        };
        let from = previous.position();
        let leg = PositionRuler::at(from).distance(from, to);
        let speed = self.speed_kmh / 3.6;
        let samples = (leg / self.sample_spacing).ceil().max(1.0) as usize;

        previous.path = (0..samples)
            .map(|i| {
                let t = i as f64 / samples as f64;
                let remaining = leg * (1.0 - t);
                PathStep {
                    lat: from.latitude + (to.latitude - from.latitude) * t,
                    lon: from.longitude + (to.longitude - from.longitude) * t,
                    remaining_distance: remaining,
                    remaining_time: remaining / speed,
                    soc: *soc - leg * t / 1000.0 * self.consumption,
                }
            })
            .collect();

        *distance += leg;
        *duration += leg / speed;
        *soc -= leg / 1000.0 * self.consumption;

        steps.push(Step {
            lat: to.latitude,
            lon: to.longitude,
            arrival_soc: *soc,
            departure_soc: *soc,
            arrival_distance: *distance,
            departure_distance: *distance,
            arrival_duration: *duration,
            departure_duration: *duration,
            ..Default::default()
        });
    }
}

impl RoutePlanner for StraightLinePlanner {
    async fn plan(&self, request: PlanRequest) -> Result<Plan, PlanError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if request.mode == PlanMode::NextCharger {
            return self.build_plan(&request).and_then(|plan| {
                if plan.routes.iter().any(|r| r.steps.iter().any(|s| s.is_charger)) {
                    Ok(plan)
                } else {
                    Err(PlanError::NoRoutes)
                }
            });
        }
        self.build_plan(&request)
    }
}
