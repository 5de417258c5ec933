//! Experiment loading, validation, and introspection.

use std::path::Path;

use cf_config::Experiment;

use crate::error::AppResult;
use crate::mode::RunMode;
use crate::planner::{merge_injections, plan_injection_segments, plan_nox_segments, plan_plain};

/// Summary of an experiment for display.
#[derive(Debug, Clone)]
pub struct ExperimentSummary {
    pub name: String,
    pub mode: RunMode,
    pub t_start: f64,
    pub t_end: f64,
    pub step_size: f64,
    pub steps: usize,
    pub segments: usize,
    pub injection_events: usize,
    pub nox_points: usize,
}

/// Load an experiment from a YAML or JSON file; validated on load.
pub fn load_experiment(path: &Path) -> AppResult<Experiment> {
    Ok(cf_config::load_experiment(path)?)
}

pub fn validate_experiment(experiment: &Experiment) -> AppResult<()> {
    RunMode::select(experiment)?;
    cf_config::validate_experiment(experiment)?;
    Ok(())
}

/// Mode and segment layout the experiment would run with.
pub fn summarize(experiment: &Experiment) -> AppResult<ExperimentSummary> {
    let mode = RunMode::select(experiment)?;
    let grid = experiment.clock.grid()?;
    let events = merge_injections(&experiment.injections, &grid);
    let segments = match mode {
        RunMode::Plain => plan_plain(&grid),
        RunMode::Injection => plan_injection_segments(&events, &grid),
        RunMode::NoxConstraint => plan_nox_segments(&grid),
    };

    Ok(ExperimentSummary {
        name: experiment.name.clone(),
        mode,
        t_start: grid.t_start(),
        t_end: grid.t_end(),
        step_size: grid.step_size(),
        steps: grid.step_count(),
        segments: segments.len(),
        injection_events: events.len(),
        nox_points: experiment.nox_constraint.len(),
    })
}

/// Species named in the experiment's mechanism file.
pub fn mechanism_species(experiment: &Experiment) -> AppResult<Vec<String>> {
    Ok(cf_config::species_from_mechanism(
        &experiment.model.mechanism_path,
    )?)
}
