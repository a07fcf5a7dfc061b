//! # evroute Core Library
//!
//! Live EV route tracking: matches a moving vehicle against a multi-stop
//! charging plan and keeps a display model up to date.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Flat-Earth distance approximations for city-to-country scales
//! - Matching of a GPS position against route steps and path samples
//! - A planning state machine that (re)plans when destinations change
//! - Display-ready route lists with ETAs, SoC and charger occupancy
//! - A three-context update pipeline with debounced redraws
//! - Persisted charger and network preferences
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use evroute_core::prelude::*;
//!
//! let (pipeline, mut outputs) = Pipeline::start(
//!     PipelineConfig::default(),
//!     Arc::new(StraightLinePlanner::new()),
//!     Preferences::in_memory(),
//! );
//!
//! pipeline.send_telemetry(TelemetryEvent::Position(Position::new(52.52, 13.40)))?;
//! let model = outputs.redraws.recv().await;
//! pipeline.shutdown().await?;
//! ```

pub mod config;
pub mod demo;
pub mod display;
pub mod geo;
pub mod matching;
pub mod pipeline;
pub mod plan;
pub mod planner;
pub mod preferences;
pub mod telemetry;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{CarProfile, PipelineConfig};
    pub use crate::demo::{DemoDrive, StraightLinePlanner};
    pub use crate::display::{DisplayModel, DisplayRoute, DisplayWaypoint, NextChargerOption};
    pub use crate::geo::{DistanceUnit, Position, PositionRuler};
    pub use crate::matching::{match_route, match_routes, match_waypoints, PositionRouteData, WaypointIndexInfo};
    pub use crate::pipeline::{NavigationRequest, Pipeline, PipelineError, PipelineOutputs};
    pub use crate::plan::{Charger, Plan, Route, Step};
    pub use crate::planner::{PlanError, PlanMode, PlanRequest, PlanningPhase, RoutePlanner, RoutingSnapshot};
    pub use crate::preferences::{
        MemorySettings, NetworkPreference, PreferenceError, Preferences, PropertiesSettings, SettingsStore,
    };
    pub use crate::telemetry::{CarData, DestinationInfo, TelemetryEvent};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
