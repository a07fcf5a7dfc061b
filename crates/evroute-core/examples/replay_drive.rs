//! Replay a simulated drive through the full pipeline
//!
//! Drives from Berlin towards Hamburg with a low battery, planned offline,
//! and prints every redraw the UI would receive.
//!
//! Usage:
//!   cargo run --example replay_drive -- [SECONDS] [SPEEDUP]
//!
//! Set `RUST_LOG=evroute_core=debug` for pipeline logging.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use evroute_core::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("evroute_core=info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let seconds: u64 = args.get(1).map(|s| s.parse::<u64>()).transpose().context("SECONDS must be a number")?.unwrap_or(20);
    let speedup: f64 = args.get(2).map(|s| s.parse::<f64>()).transpose().context("SPEEDUP must be a number")?.unwrap_or(60.0);

    let config = PipelineConfig {
        telemetry_period: Duration::from_millis(500),
        redraw_debounce: Duration::from_secs(1),
        ..Default::default()
    };
    let planner = Arc::new(StraightLinePlanner::new().with_latency(Duration::from_millis(300)));
    let (pipeline, mut outputs) = Pipeline::start(config, planner, Preferences::in_memory());

    let mut drive = DemoDrive::new(vec![
        Position::new(52.5200, 13.4050),
        Position::new(52.7500, 12.5000),
        Position::new(53.1000, 11.2000),
        Position::new(53.5511, 9.9937),
    ])
    .with_state_of_charge(35.0)
    .with_destination_title("Hamburg");

    println!("Route length: {:.1} km", drive.length() / 1000.0);

    let tick = Duration::from_millis(250);
    let mut ticker = tokio::time::interval(tick);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);

    while tokio::time::Instant::now() < deadline && !drive.is_finished() {
        tokio::select! {
            _ = ticker.tick() => {
                for event in drive.advance(tick.mul_f64(speedup)) {
                    pipeline.send_telemetry(event)?;
                }
            }
            Some(model) = outputs.redraws.recv() => print_model(&model),
        }
    }

    pipeline.shutdown().await?;
    println!("Done after {:.1} km, SoC {:.1}%", drive.traveled() / 1000.0, drive.state_of_charge());
    Ok(())
}

fn print_model(model: &DisplayModel) {
    println!("\n[{:?}] {} route(s)", model.phase, model.routes.len());
    if let Some(error) = &model.error {
        println!("  error: {error}");
    }

    for stop in model.waypoints() {
        let kind = if stop.is_charger { "charge" } else { "stop" };
        let soc = stop
            .arrival_soc
            .map_or_else(|| format!("{:.0}% planned", stop.planned_arrival_soc), |s| format!("{s:.0}%"));
        println!(
            "  {kind:<6} {:<32} {:>7.1} km  eta {}  soc {}{}",
            stop.title,
            stop.trip_distance / 1000.0,
            stop.eta.format("%H:%M"),
            soc,
            stop.availability().map(|a| format!("  free {a}")).unwrap_or_default(),
        );
    }
}
