use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use scrollwork_core::{FrameReport, SchedulerConfig};

use crate::scenario::{Scenario, Stage};

/// Drive `stage` from a real-time interval until `limit` elapses or
/// shutdown is signalled; returns the number of frames run
pub(crate) async fn drive(
    stage: &mut Stage,
    fps: f64,
    limit: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
    mut on_report: impl FnMut(&FrameReport),
) -> Result<u64> {
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut frames = 0;

    loop {
        tokio::select! {
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    info!("Watch received shutdown signal");
                    break;
                }
            }
            _ = interval.tick() => {
                let elapsed = started.elapsed();
                if limit.is_some_and(|limit| elapsed >= limit) {
                    debug!(frames, "Watch time limit reached");
                    break;
                }

                stage.apply_inputs(frames)?;
                if let Some(report) = stage.step(elapsed.as_secs_f64() * 1000.0) {
                    on_report(&report);
                }
                frames += 1;
            }
        }
    }

    Ok(frames)
}

pub async fn run(
    path: &Path,
    config: SchedulerConfig,
    fps: Option<f64>,
    seconds: Option<f64>,
) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let fps = fps.unwrap_or(scenario.fps);
    if !(fps.is_finite() && fps > 0.0) {
        bail!("fps must be positive, got {}", fps);
    }
    let limit = match seconds {
        Some(s) if !(s.is_finite() && s > 0.0) => bail!("seconds must be positive, got {}", s),
        Some(s) => Some(Duration::from_secs_f64(s)),
        None => None,
    };

    let mut stage = Stage::build(&scenario, config)?;

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        let _ = shutdown_tx.send(true);
    });

    let title = scenario.name.as_deref().unwrap_or("(unnamed scenario)");
    match limit {
        Some(limit) => println!(
            "Watching {} at {} fps for {:.1}s...",
            title,
            fps,
            limit.as_secs_f64()
        ),
        None => println!("Watching {} at {} fps. Press Ctrl+C to stop.", title, fps),
    }

    let frames = drive(&mut stage, fps, limit, shutdown_rx, super::print_events).await?;

    super::print_snapshot(&stage.snapshot());
    stage.unmount();
    println!("\nStopped after {} frames.", frames);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
content_extent = 4000
viewport = { width = 1000, height = 1000 }

[[elements]]
id = "hero"
bounds = { x = 0, y = 500, width = 1000, height = 400 }

[[triggers]]
element = "hero"

[[inputs]]
frame = 0
action = "scroll_to"
position = 1200
immediate = true
"#;

    #[tokio::test]
    async fn test_drive_stops_at_limit() {
        let scenario = Scenario::from_toml(SCENARIO).unwrap();
        let mut stage = Stage::build(&scenario, SchedulerConfig::default()).unwrap();
        let (_tx, rx) = watch::channel(false);

        let mut events = Vec::new();
        let frames = drive(
            &mut stage,
            200.0,
            Some(Duration::from_millis(100)),
            rx,
            |report| events.extend(report.events.iter().map(|e| e.kind)),
        )
        .await
        .unwrap();

        assert!(frames > 0);
        assert_eq!(stage.snapshot().scroll.virtual_position, 1200.0);
        assert!(!events.is_empty());
    }

    #[tokio::test]
    async fn test_drive_stops_on_shutdown() {
        let scenario = Scenario::from_toml(SCENARIO).unwrap();
        let mut stage = Stage::build(&scenario, SchedulerConfig::default()).unwrap();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let frames = drive(&mut stage, 60.0, None, rx, |_| {}).await.unwrap();
        assert!(frames <= 1);
    }
}
