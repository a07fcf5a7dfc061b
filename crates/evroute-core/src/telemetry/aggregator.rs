//! Telemetry aggregator
//!
//! Keeps the latest value of every telemetry field and hands a full
//! [`CarData`] snapshot to the planning context once per period.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{CarData, TelemetryEvent};
use crate::planner::PlanningMessage;

/// Latest value of every telemetry field
#[derive(Debug, Clone, Default)]
pub struct TelemetryAggregator {
    latest: CarData,
    events_since_snapshot: usize,
}

impl TelemetryAggregator {
    /// Create an aggregator with every field unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one field change
    pub fn apply(&mut self, event: TelemetryEvent) {
        let car = &mut self.latest;
        match event {
            TelemetryEvent::Position(p) => car.position = p,
            TelemetryEvent::NextDestination(d) => car.next_destination = d,
            TelemetryEvent::FinalDestination(d) => car.final_destination = d,
            TelemetryEvent::Odometer(v) => car.odometer = v,
            TelemetryEvent::StateOfCharge(v) => car.state_of_charge = v,
            TelemetryEvent::DrivingMode(m) => car.driving_mode = m,
            TelemetryEvent::Speed(v) => car.speed = v,
            TelemetryEvent::Torque(v) => car.torque = v,
            TelemetryEvent::OutsideTemperature(v) => car.temperatures.outside = Some(v),
            TelemetryEvent::BatteryTemperature(v) => car.temperatures.battery = Some(v),
            TelemetryEvent::CabinTemperature(v) => car.temperatures.cabin = Some(v),
        }
        self.events_since_snapshot += 1;
    }

    /// Immutable copy of all fields
    pub fn snapshot(&mut self) -> CarData {
        self.events_since_snapshot = 0;
        self.latest.clone()
    }

    /// Number of events applied since the last snapshot
    pub fn pending_events(&self) -> usize {
        self.events_since_snapshot
    }
}

/// Telemetry context loop.
///
/// Applies incoming events and, every `period`, posts a snapshot to the
/// planning context before re-arming its own timer. The loop ends when
/// `cancel` fires, the event source closes, or the planning context is gone,
/// so it never keeps pushing at a dead destination.
pub async fn run_telemetry_context(
    mut events: mpsc::UnboundedReceiver<TelemetryEvent>,
    planning: mpsc::UnboundedSender<PlanningMessage>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut aggregator = TelemetryAggregator::new();
    let mut next_push = Instant::now() + period;

    tracing::debug!(period_ms = period.as_millis() as u64, "Telemetry context started");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!("Telemetry context cancelled");
                break;
            }

            _ = tokio::time::sleep_until(next_push) => {
                let pending = aggregator.pending_events();
                let snapshot = aggregator.snapshot();
                tracing::trace!(pending, "Pushing telemetry snapshot");

                if planning.send(PlanningMessage::CarData(Box::new(snapshot))).is_err() {
                    tracing::warn!("Planning context gone, stopping telemetry push");
                    break;
                }
                next_push = Instant::now() + period;
            }

            event = events.recv() => match event {
                Some(event) => aggregator.apply(event),
                None => {
                    tracing::debug!("Telemetry source closed");
                    break;
                }
            },
        }
    }
}
