//! Planning context loop
//!
//! Single consumer of the planning queue. Telemetry snapshots, plan
//! completions and route selections are all serialized through it, so the
//! state machine itself needs no synchronization.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{PlanningEffect, PlanningMessage, PlanningStateMachine, RoutePlanner};
use crate::pipeline::DisplayMessage;

/// Run the planning context until cancelled or its queue closes.
///
/// `inbox_tx` is a weak handle to this context's own queue; spawned plan
/// requests post their completion through it, and silently drop the result
/// if the context has gone away in the meantime.
pub async fn run_planning_context<P: RoutePlanner>(
    mut machine: PlanningStateMachine,
    planner: Arc<P>,
    mut inbox: mpsc::UnboundedReceiver<PlanningMessage>,
    inbox_tx: mpsc::WeakUnboundedSender<PlanningMessage>,
    display: mpsc::UnboundedSender<DisplayMessage>,
    cancel: CancellationToken,
) {
    tracing::debug!("Planning context started");

    loop {
        let message = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::debug!("Planning context cancelled");
                break;
            }

            message = inbox.recv() => match message {
                Some(message) => message,
                None => {
                    tracing::debug!("Planning queue closed");
                    break;
                }
            },
        };

        let effects = match message {
            PlanningMessage::CarData(car) => machine.on_car_data(*car),
            PlanningMessage::PlanCompleted { mode, result } => machine.on_plan_result(mode, result),
            PlanningMessage::SelectRoute(index) => machine.select_route(index),
        };

        for effect in effects {
            match effect {
                PlanningEffect::RequestPlan(request) => {
                    let planner = Arc::clone(&planner);
                    let reply = inbox_tx.clone();
                    let mode = request.mode;

                    tokio::spawn(async move {
                        let result = planner.plan(request).await;
                        match reply.upgrade() {
                            Some(tx) => {
                                let _ = tx.send(PlanningMessage::PlanCompleted { mode, result });
                            }
                            None => tracing::debug!(?mode, "Planning context gone, dropping plan response"),
                        }
                    });
                }
                PlanningEffect::Publish(snapshot) => {
                    if display.send(DisplayMessage::Routing(Box::new(snapshot))).is_err() {
                        tracing::warn!("Display context gone, routing update dropped");
                    }
                }
            }
        }
    }
}
