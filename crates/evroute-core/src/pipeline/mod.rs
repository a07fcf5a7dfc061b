//! Update Pipeline
//!
//! Wires the three contexts together:
//!
//! ```text
//! TelemetryEvent ─▶ telemetry ──1 Hz──▶ planning ──on change──▶ display ──debounced──▶ UI
//!                                          ▲   │ spawned plan requests
//!                                          └───┘
//! ```
//!
//! Each context is one tokio task consuming its own unbounded queue.
//! [`Pipeline::shutdown`] stops them in order: telemetry, planning, display.

mod debounce;
mod display_updater;
mod error;

pub use debounce::RedrawDebouncer;
pub use display_updater::{run_display_context, DisplayUpdater, NavigationRequest};
pub use error::PipelineError;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::display::DisplayModel;
use crate::planner::{run_planning_context, PlanningStateMachine, RoutePlanner, RoutingSnapshot};
use crate::preferences::{NetworkPreference, Preferences};
use crate::telemetry::{run_telemetry_context, TelemetryEvent};

/// Messages processed by the display context
#[derive(Debug, Clone)]
pub enum DisplayMessage {
    /// New routing state from the planning context
    Routing(Box<RoutingSnapshot>),
    /// The user picked another route
    SelectRoute(usize),
    /// The user highlighted a stop
    SelectWaypoint(usize),
    /// Send the highlighted stop to the car's navigation
    NavigateToWaypoint,
    /// Ignore a charger
    AddIgnoredCharger(u64),
    /// Stop ignoring a charger
    RemoveIgnoredCharger(u64),
    /// Change a network preference
    SetNetworkPreference {
        /// Network id
        network_id: u64,
        /// New preference; `DontCare` clears it
        preference: NetworkPreference,
    },
}

/// Receiving ends handed to the UI
#[derive(Debug)]
pub struct PipelineOutputs {
    /// Display models, one per redraw
    pub redraws: mpsc::UnboundedReceiver<DisplayModel>,
    /// Navigation requests for the car
    pub navigation: mpsc::UnboundedReceiver<NavigationRequest>,
}

struct ContextHandle {
    name: &'static str,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ContextHandle {
    async fn stop(self) -> Result<(), PipelineError> {
        self.cancel.cancel();
        self.task.await.map_err(|e| PipelineError::TaskFailed {
            context: self.name,
            message: e.to_string(),
        })?;
        tracing::debug!(context = self.name, "Context stopped");
        Ok(())
    }
}

/// Running pipeline
pub struct Pipeline {
    telemetry_tx: mpsc::UnboundedSender<TelemetryEvent>,
    display_tx: mpsc::UnboundedSender<DisplayMessage>,
    telemetry: ContextHandle,
    planning: ContextHandle,
    display: ContextHandle,
}

impl Pipeline {
    /// Spawn the three contexts on the current tokio runtime
    pub fn start<P: RoutePlanner>(
        config: PipelineConfig,
        planner: Arc<P>,
        preferences: Preferences,
    ) -> (Self, PipelineOutputs) {
        let (telemetry_tx, telemetry_rx) = mpsc::unbounded_channel();
        let (planning_tx, planning_rx) = mpsc::unbounded_channel();
        let (display_tx, display_rx) = mpsc::unbounded_channel();
        let (redraw_tx, redraws) = mpsc::unbounded_channel();
        let (navigation_tx, navigation) = mpsc::unbounded_channel();

        let telemetry_cancel = CancellationToken::new();
        let planning_cancel = CancellationToken::new();
        let display_cancel = CancellationToken::new();

        let display_task = tokio::spawn(run_display_context(
            DisplayUpdater::new(preferences, &config),
            display_rx,
            redraw_tx,
            navigation_tx,
            planning_tx.clone(),
            display_cancel.clone(),
        ));

        let planning_task = tokio::spawn(run_planning_context(
            PlanningStateMachine::new(&config),
            planner,
            planning_rx,
            planning_tx.downgrade(),
            display_tx.clone(),
            planning_cancel.clone(),
        ));

        let telemetry_task = tokio::spawn(run_telemetry_context(
            telemetry_rx,
            planning_tx,
            config.telemetry_period,
            telemetry_cancel.clone(),
        ));

        tracing::info!(
            car = %config.car.model,
            period_ms = config.telemetry_period.as_millis() as u64,
            "Pipeline started"
        );

        let pipeline = Self {
            telemetry_tx,
            display_tx,
            telemetry: ContextHandle {
                name: "telemetry",
                cancel: telemetry_cancel,
                task: telemetry_task,
            },
            planning: ContextHandle {
                name: "planning",
                cancel: planning_cancel,
                task: planning_task,
            },
            display: ContextHandle {
                name: "display",
                cancel: display_cancel,
                task: display_task,
            },
        };

        (pipeline, PipelineOutputs { redraws, navigation })
    }

    /// Sender for telemetry events
    pub fn telemetry(&self) -> mpsc::UnboundedSender<TelemetryEvent> {
        self.telemetry_tx.clone()
    }

    /// Feed one telemetry event
    pub fn send_telemetry(&self, event: TelemetryEvent) -> Result<(), PipelineError> {
        self.telemetry_tx
            .send(event)
            .map_err(|_| PipelineError::ContextStopped("telemetry"))
    }

    /// Follow another route
    pub fn select_route(&self, index: usize) -> Result<(), PipelineError> {
        self.send_display(DisplayMessage::SelectRoute(index))
    }

    /// Highlight a stop of the followed route
    pub fn select_waypoint(&self, index: usize) -> Result<(), PipelineError> {
        self.send_display(DisplayMessage::SelectWaypoint(index))
    }

    /// Navigate to the highlighted stop
    pub fn navigate_to_waypoint(&self) -> Result<(), PipelineError> {
        self.send_display(DisplayMessage::NavigateToWaypoint)
    }

    /// Ignore a charger
    pub fn add_ignored_charger(&self, id: u64) -> Result<(), PipelineError> {
        self.send_display(DisplayMessage::AddIgnoredCharger(id))
    }

    /// Stop ignoring a charger
    pub fn remove_ignored_charger(&self, id: u64) -> Result<(), PipelineError> {
        self.send_display(DisplayMessage::RemoveIgnoredCharger(id))
    }

    /// Change a network preference
    pub fn set_network_preference(&self, network_id: u64, preference: NetworkPreference) -> Result<(), PipelineError> {
        self.send_display(DisplayMessage::SetNetworkPreference { network_id, preference })
    }

    fn send_display(&self, message: DisplayMessage) -> Result<(), PipelineError> {
        self.display_tx
            .send(message)
            .map_err(|_| PipelineError::ContextStopped("display"))
    }

    /// Stop all contexts: telemetry first, then planning, then display
    pub async fn shutdown(self) -> Result<(), PipelineError> {
        tracing::info!("Pipeline shutting down");
        self.telemetry.stop().await?;
        self.planning.stop().await?;
        self.display.stop().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("telemetry_finished", &self.telemetry.task.is_finished())
            .field("planning_finished", &self.planning.task.is_finished())
            .field("display_finished", &self.display.task.is_finished())
            .finish_non_exhaustive()
    }
}
