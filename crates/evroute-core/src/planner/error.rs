//! Planning errors

use thiserror::Error;

/// Errors reported by a [`RoutePlanner`](super::RoutePlanner)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Planning API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Invalid plan response: {0}")]
    InvalidResponse(String),

    #[error("No route found")]
    NoRoutes,

    #[error("Nothing to plan: missing position or destination")]
    NothingToPlan,
}

impl From<serde_json::Error> for PlanError {
    fn from(e: serde_json::Error) -> Self {
        PlanError::InvalidResponse(e.to_string())
    }
}
