//! Display updater
//!
//! Owns the last routing snapshot, the user's preferences and selection, and
//! produces debounced [`DisplayModel`] redraws for the UI context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{DisplayMessage, RedrawDebouncer};
use crate::config::PipelineConfig;
use crate::display::DisplayModel;
use crate::geo::Position;
use crate::planner::{PlanningMessage, RoutingSnapshot};
use crate::preferences::{NetworkPreference, PreferenceError, Preferences};

/// Ask the car's navigation to drive to a stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRequest {
    /// Target coordinates
    pub position: Position,
    /// Target name
    pub title: String,
}

/// Display-side state
#[derive(Debug)]
pub struct DisplayUpdater {
    preferences: Preferences,
    outlet_type: Option<String>,
    snapshot: Option<RoutingSnapshot>,
    selected_waypoint: Option<usize>,
    last_model: Option<DisplayModel>,
    debouncer: RedrawDebouncer,
}

impl DisplayUpdater {
    /// Create an updater with no routing state yet
    pub fn new(preferences: Preferences, config: &PipelineConfig) -> Self {
        Self {
            preferences,
            outlet_type: config.car.outlet_type.clone(),
            snapshot: None,
            selected_waypoint: None,
            last_model: None,
            debouncer: RedrawDebouncer::new(config.redraw_debounce),
        }
    }

    /// Current preferences
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Last model handed to the UI
    pub fn last_model(&self) -> Option<&DisplayModel> {
        self.last_model.as_ref()
    }

    /// Replace the routing state
    pub fn set_routing(&mut self, snapshot: RoutingSnapshot) {
        if self
            .snapshot
            .as_ref()
            .map_or(true, |old| old.route_index != snapshot.route_index)
        {
            self.selected_waypoint = None;
        }
        self.snapshot = Some(snapshot);
    }

    /// Highlight a stop of the followed route
    pub fn select_waypoint(&mut self, index: usize) {
        self.selected_waypoint = Some(index);
    }

    /// Ignore a charger
    pub fn add_ignored_charger(&mut self, id: u64) -> Result<(), PreferenceError> {
        self.preferences.add_ignored_charger(id)
    }

    /// Stop ignoring a charger
    pub fn remove_ignored_charger(&mut self, id: u64) -> Result<(), PreferenceError> {
        self.preferences.remove_ignored_charger(id)
    }

    /// Change a network preference
    pub fn set_network_preference(&mut self, network_id: u64, preference: NetworkPreference) -> Result<(), PreferenceError> {
        self.preferences.set_network_preference(network_id, preference)
    }

    /// Build the model for the current state
    pub fn build(&self, now: DateTime<Utc>) -> Option<DisplayModel> {
        self.snapshot.as_ref().map(|snapshot| {
            DisplayModel::build(
                snapshot,
                &self.preferences,
                self.outlet_type.as_deref(),
                self.selected_waypoint,
                now,
            )
        })
    }

    /// Build the model and return it if it differs from the last one sent
    pub fn render(&mut self, now: DateTime<Utc>) -> Option<DisplayModel> {
        let model = self.build(now)?;
        if self.last_model.as_ref() == Some(&model) {
            return None;
        }
        self.last_model = Some(model.clone());
        Some(model)
    }

    /// Navigation target for the highlighted stop
    pub fn navigation_target(&self, now: DateTime<Utc>) -> Option<NavigationRequest> {
        let model = self.build(now)?;
        let waypoint = model.selected_waypoint()?;
        Some(NavigationRequest {
            position: waypoint.position,
            title: waypoint.title.clone(),
        })
    }
}

/// Run the display context until cancelled or its queue closes.
///
/// Pending timers are discarded on exit.
pub async fn run_display_context(
    mut updater: DisplayUpdater,
    mut inbox: mpsc::UnboundedReceiver<DisplayMessage>,
    redraw: mpsc::UnboundedSender<DisplayModel>,
    navigation: mpsc::UnboundedSender<NavigationRequest>,
    planning: mpsc::UnboundedSender<PlanningMessage>,
    cancel: CancellationToken,
) {
    tracing::debug!(window_ms = updater.debouncer.window().as_millis() as u64, "Display context started");

    loop {
        let deadline = updater.debouncer.deadline();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!("Display context cancelled");
                break;
            }

            message = inbox.recv() => match message {
                Some(message) => handle_message(&mut updater, message, &redraw, &navigation, &planning),
                None => {
                    tracing::debug!("Display queue closed");
                    break;
                }
            },

            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                redraw_now(&mut updater, &redraw);
            }
        }
    }

    updater.debouncer.cancel();
}

fn handle_message(
    updater: &mut DisplayUpdater,
    message: DisplayMessage,
    redraw: &mpsc::UnboundedSender<DisplayModel>,
    navigation: &mpsc::UnboundedSender<NavigationRequest>,
    planning: &mpsc::UnboundedSender<PlanningMessage>,
) {
    let now = Instant::now();

    match message {
        DisplayMessage::Routing(snapshot) => {
            updater.set_routing(*snapshot);
            if updater.debouncer.on_update(now) {
                redraw_now(updater, redraw);
            }
        }
        DisplayMessage::SelectRoute(index) => {
            if planning.send(PlanningMessage::SelectRoute(index)).is_err() {
                tracing::warn!(index, "Planning context gone, route selection dropped");
            }
            updater.debouncer.on_selection(now);
        }
        DisplayMessage::SelectWaypoint(index) => {
            updater.select_waypoint(index);
            updater.debouncer.on_selection(now);
        }
        DisplayMessage::NavigateToWaypoint => match updater.navigation_target(Utc::now()) {
            Some(target) => {
                tracing::info!(title = %target.title, "Navigating to waypoint");
                if navigation.send(target).is_err() {
                    tracing::warn!("Navigation receiver gone");
                }
            }
            None => tracing::debug!("No waypoint selected, ignoring navigation request"),
        },
        DisplayMessage::AddIgnoredCharger(id) => {
            let result = updater.add_ignored_charger(id);
            preferences_changed(updater, result, redraw, now);
        }
        DisplayMessage::RemoveIgnoredCharger(id) => {
            let result = updater.remove_ignored_charger(id);
            preferences_changed(updater, result, redraw, now);
        }
        DisplayMessage::SetNetworkPreference { network_id, preference } => {
            let result = updater.set_network_preference(network_id, preference);
            preferences_changed(updater, result, redraw, now);
        }
    }
}

fn preferences_changed(
    updater: &mut DisplayUpdater,
    result: Result<(), PreferenceError>,
    redraw: &mpsc::UnboundedSender<DisplayModel>,
    now: Instant,
) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "Failed to persist preferences");
    }
    if updater.debouncer.on_update(now) {
        redraw_now(updater, redraw);
    }
}

fn redraw_now(updater: &mut DisplayUpdater, redraw: &mpsc::UnboundedSender<DisplayModel>) {
    if let Some(model) = updater.render(Utc::now()) {
        tracing::trace!(routes = model.routes.len(), phase = ?model.phase, "Redraw");
        if redraw.send(model).is_err() {
            tracing::debug!("UI receiver gone, redraw dropped");
        }
    }
    updater.debouncer.redrawn(Instant::now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Charger, Plan, Route, Step};
    use crate::planner::PlanningPhase;
    use crate::telemetry::CarData;
    use std::sync::Arc;
    use std::time::Duration;

    fn snapshot() -> RoutingSnapshot {
        let charger = Step {
            lat: 52.5,
            lon: 13.0,
            is_charger: true,
            arrival_distance: 50_000.0,
            departure_distance: 50_000.0,
            charger: Some(Charger {
                id: 9,
                name: "Lakeside [Fastned]".to_string(),
                network_id: Some(3),
                outlets: Vec::new(),
            }),
            ..Default::default()
        };
        let end = Step {
            lat: 53.0,
            lon: 13.0,
            name: Some("Harbor".to_string()),
            arrival_distance: 100_000.0,
            ..Default::default()
        };
        let plan = Plan {
            plan_id: "p".to_string(),
            routes: vec![Route {
                steps: vec![Step { lat: 52.0, lon: 13.0, ..Default::default() }, charger, end],
                ..Default::default()
            }],
        };

        RoutingSnapshot {
            phase: PlanningPhase::Planned,
            car: CarData::default(),
            plan: Some(Arc::new(plan)),
            next_charger_plan: None,
            route_matches: vec![None],
            route_index: Some(0),
            waypoints: Vec::new(),
            error: None,
            distance_since_plan: Some(0.0),
        }
    }

    struct Harness {
        inbox: mpsc::UnboundedSender<DisplayMessage>,
        redraws: mpsc::UnboundedReceiver<DisplayModel>,
        navigation: mpsc::UnboundedReceiver<NavigationRequest>,
        planning: mpsc::UnboundedReceiver<PlanningMessage>,
        cancel: CancellationToken,
        task: tokio::task::JoinHandle<()>,
    }

    fn start() -> Harness {
        let config = PipelineConfig::default();
        let updater = DisplayUpdater::new(Preferences::in_memory(), &config);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (redraw_tx, redraws) = mpsc::unbounded_channel();
        let (nav_tx, navigation) = mpsc::unbounded_channel();
        let (planning_tx, planning) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_display_context(updater, inbox_rx, redraw_tx, nav_tx, planning_tx, cancel.clone()));
        Harness { inbox: inbox_tx, redraws, navigation, planning, cancel, task }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<DisplayModel>) -> Vec<DisplayModel> {
        let mut out = Vec::new();
        while let Ok(model) = rx.try_recv() {
            out.push(model);
        }
        out
    }

    #[test]
    fn test_render_skips_unchanged_model() {
        let mut updater = DisplayUpdater::new(Preferences::in_memory(), &PipelineConfig::default());
        let now = Utc::now();
        assert!(updater.render(now).is_none());

        updater.set_routing(snapshot());
        let model = updater.render(now).unwrap();
        assert_eq!(model.routes.len(), 1);
        assert_eq!(model.waypoints().len(), 2);
        assert!(updater.render(now).is_none());

        updater.add_ignored_charger(9).unwrap();
        let model = updater.render(now).unwrap();
        assert!(model.waypoints()[0].is_ignored_charger);
    }

    #[test]
    fn test_navigation_target() {
        let mut updater = DisplayUpdater::new(Preferences::in_memory(), &PipelineConfig::default());
        updater.set_routing(snapshot());
        assert_eq!(updater.navigation_target(Utc::now()), None);

        updater.select_waypoint(1);
        let target = updater.navigation_target(Utc::now()).unwrap();
        assert_eq!(target.title, "Harbor");
        assert_eq!(target.position, Position::new(53.0, 13.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_snapshot_redraws_immediately() {
        let mut h = start();
        h.inbox.send(DisplayMessage::Routing(Box::new(snapshot()))).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let redraws = drain(&mut h.redraws);
        assert_eq!(redraws.len(), 1);
        assert_eq!(redraws[0].phase, PlanningPhase::Planned);

        h.cancel.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_selections_within_window_redraw_once() {
        let mut h = start();
        h.inbox.send(DisplayMessage::Routing(Box::new(snapshot()))).unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(drain(&mut h.redraws).len(), 1);

        let first = Instant::now();
        h.inbox.send(DisplayMessage::SelectWaypoint(0)).unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;
        h.inbox.send(DisplayMessage::SelectWaypoint(1)).unwrap();

        tokio::time::sleep_until(first + Duration::from_millis(2500)).await;
        assert!(drain(&mut h.redraws).is_empty());

        tokio::time::sleep_until(first + Duration::from_secs(5)).await;
        let redraws = drain(&mut h.redraws);
        assert_eq!(redraws.len(), 1);
        assert_eq!(redraws[0].selected_waypoint, Some(1));

        h.cancel.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_route_forwards_to_planning() {
        let mut h = start();
        h.inbox.send(DisplayMessage::SelectRoute(2)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        match h.planning.try_recv() {
            Ok(PlanningMessage::SelectRoute(2)) => {}
            other => panic!("unexpected {other:?}"),
        }

        h.cancel.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_emits_request() {
        let mut h = start();
        h.inbox.send(DisplayMessage::Routing(Box::new(snapshot()))).unwrap();
        h.inbox.send(DisplayMessage::SelectWaypoint(0)).unwrap();
        h.inbox.send(DisplayMessage::NavigateToWaypoint).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let target = h.navigation.try_recv().unwrap();
        assert_eq!(target.title, "Lakeside");

        drop(h.inbox);
        h.task.await.unwrap();
    }
}
