//! Route Planning
//!
//! Decides when the vehicle needs a (new) plan, talks to the planning API
//! through [`RoutePlanner`], and keeps the vehicle matched against the
//! current plan.

mod context;
mod error;
mod machine;
mod request;

pub use context::run_planning_context;
pub use error::PlanError;
pub use machine::{PlanningEffect, PlanningPhase, PlanningStateMachine, RoutingSnapshot};
pub use request::{PlanDestination, PlanMode, PlanRequest, RoutePlanner};

use crate::plan::Plan;
use crate::telemetry::CarData;

/// Messages processed by the planning context
#[derive(Debug)]
pub enum PlanningMessage {
    /// Periodic telemetry snapshot
    CarData(Box<CarData>),
    /// A plan request finished
    PlanCompleted {
        /// Mode of the finished request
        mode: PlanMode,
        /// Planner outcome
        result: Result<Plan, PlanError>,
    },
    /// The user picked another route
    SelectRoute(usize),
}
