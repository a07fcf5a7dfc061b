//! Pipeline configuration
//!
//! Plain values with defaults; where they come from is up to the host
//! application.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interval between telemetry snapshots pushed to the planning context
pub const DEFAULT_TELEMETRY_PERIOD: Duration = Duration::from_secs(1);

/// Minimum delay between redraws after a user interaction
pub const DEFAULT_REDRAW_DEBOUNCE: Duration = Duration::from_secs(2);

/// The vehicle being routed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarProfile {
    /// Car model code understood by the planning API
    pub model: String,
    /// Outlet type used for charger availability, e.g. `"ccs"`
    pub outlet_type: Option<String>,
}

impl Default for CarProfile {
    fn default() -> Self {
        Self {
            model: "generic:ev".to_string(),
            outlet_type: Some("ccs".to_string()),
        }
    }
}

/// Runtime settings for the three pipeline contexts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Telemetry snapshot period
    pub telemetry_period: Duration,
    /// Redraw debounce window
    pub redraw_debounce: Duration,
    /// Ask the planner for alternative routes
    pub find_alternatives: bool,
    /// Also request a next-charger lookahead plan
    pub next_charger_lookahead: bool,
    /// Vehicle profile
    pub car: CarProfile,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            telemetry_period: DEFAULT_TELEMETRY_PERIOD,
            redraw_debounce: DEFAULT_REDRAW_DEBOUNCE,
            find_alternatives: true,
            next_charger_lookahead: false,
            car: CarProfile::default(),
        }
    }
}
