use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::info;

use scrollwork_core::{FrameReport, SchedulerConfig};

use crate::scenario::{Scenario, Snapshot, Stage};

#[derive(Serialize)]
struct SimulationOutput {
    scenario: Option<String>,
    frames: u64,
    fps: f64,
    /// Only frames in which a trigger fired
    events: Vec<FrameReport>,
    #[serde(rename = "final")]
    final_state: Snapshot,
}

/// Drive `stage` on a simulated clock, collecting frames that fired events
pub(crate) fn drive(stage: &mut Stage, frames: u64, fps: f64) -> Result<Vec<FrameReport>> {
    let interval_ms = 1000.0 / fps;
    let mut reports = Vec::new();

    for index in 0..frames {
        stage.apply_inputs(index)?;
        if let Some(report) = stage.step(index as f64 * interval_ms) {
            if !report.events.is_empty() {
                reports.push(report);
            }
        }
    }

    Ok(reports)
}

pub fn run(
    path: &Path,
    config: SchedulerConfig,
    frames: Option<u64>,
    fps: Option<f64>,
    json: bool,
) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let frames = frames.unwrap_or(scenario.frames);
    let fps = fps.unwrap_or(scenario.fps);
    if !(fps.is_finite() && fps > 0.0) {
        bail!("fps must be positive, got {}", fps);
    }

    let mut stage = Stage::build(&scenario, config)?;
    let (triggers, timelines, pins, counters) = stage.scheduler().counts();
    info!(
        scenario = %path.display(),
        frames,
        fps,
        triggers,
        timelines,
        pins,
        counters,
        "Simulating scenario"
    );
    let reports = drive(&mut stage, frames, fps)?;
    let snapshot = stage.snapshot();
    stage.unmount();

    if json {
        let output = SimulationOutput {
            scenario: scenario.name.clone(),
            frames,
            fps,
            events: reports,
            final_state: snapshot,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let title = scenario.name.as_deref().unwrap_or("(unnamed scenario)");
    println!("{} - {} frames at {} fps\n", title, frames, fps);

    if reports.is_empty() {
        println!("No trigger events.");
    } else {
        let count: usize = reports.iter().map(|r| r.events.len()).sum();
        println!("Trigger events ({}):", count);
        for report in &reports {
            super::print_events(report);
        }
    }
    super::print_snapshot(&snapshot);

    Ok(())
}
