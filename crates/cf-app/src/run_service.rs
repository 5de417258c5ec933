//! Run orchestration: plan segments, run them in order, carry state across
//! boundaries and stitch the outputs.

use std::path::Path;
use std::time::Instant;

use cf_config::{Experiment, ModelConfig, ModelParameters, validate_experiment};
use cf_core::TimeGrid;
use cf_core::time::same_time;
use cf_results::{
    Concentrations, MissingOutputs, OutputTables, ResultManifest, append_segment, select_outputs,
};
use cf_sim::{SegmentJob, SegmentRunner};

use crate::carry::{Perturbation, bootstrap_nox, compute_next_initial_state};
use crate::error::{AppError, AppResult};
use crate::mode::RunMode;
use crate::planner::{
    InjectionEvent, Segment, densify_nox, merge_injections, plan_injection_segments,
    plan_nox_segments, plan_plain,
};
use crate::progress::{RunProgressEvent, RunStage, SegmentProgress};

/// Options for running experiments.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Folded into the run id so results from different tool versions differ.
    pub tool_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub experiment: &'a Experiment,
    pub options: RunOptions,
}

/// Concise timing and execution summary for a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub plan_time_s: f64,
    pub segment_time_s: f64,
    pub stitch_time_s: f64,
    pub total_time_s: f64,
    pub segments_run: usize,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub mode: RunMode,
    pub manifest: ResultManifest,
    pub tables: OutputTables,
    pub missing: MissingOutputs,
    pub warnings: Vec<String>,
    pub timing: RunTimingSummary,
}

/// What changes at each segment boundary.
enum Boundaries {
    None,
    Injections(Vec<InjectionEvent>),
    /// NOx target at every grid time, indexed like the segments.
    NoxTargets(Vec<f64>),
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    mode: Option<RunMode>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    segment: Option<SegmentProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            mode,
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            segment,
        });
    }
}

fn plan(
    mode: RunMode,
    experiment: &Experiment,
    grid: &TimeGrid,
) -> AppResult<(Vec<Segment>, Boundaries)> {
    Ok(match mode {
        RunMode::Plain => (plan_plain(grid), Boundaries::None),
        RunMode::Injection => {
            let events = merge_injections(&experiment.injections, grid);
            (
                plan_injection_segments(&events, grid),
                Boundaries::Injections(events),
            )
        }
        RunMode::NoxConstraint => {
            let targets = densify_nox(&experiment.nox_constraint, grid)?;
            (plan_nox_segments(grid), Boundaries::NoxTargets(targets))
        }
    })
}

fn nox_target(targets: &[f64], segment: &Segment) -> AppResult<f64> {
    targets
        .get(segment.index)
        .copied()
        .ok_or_else(|| AppError::Planning {
            what: format!("no NOx target for segment {}", segment.index),
        })
}

/// Initial concentrations for `segment`.
fn initial_state(
    experiment: &Experiment,
    segment: &Segment,
    boundaries: &Boundaries,
    previous: Option<&OutputTables>,
    step_size: f64,
) -> AppResult<Concentrations> {
    let Some(previous) = previous else {
        let initial = &experiment.inputs.initial_concentrations;
        return match boundaries {
            Boundaries::NoxTargets(targets) => {
                bootstrap_nox(initial, nox_target(targets, segment)?, segment.start)
            }
            _ => Ok(initial.clone()),
        };
    };

    let species = &previous.species;
    let row = species
        .nearest_row(segment.start)
        .ok_or_else(|| AppError::DegenerateState {
            time: segment.start,
            what: "previous segment produced no species rows".to_string(),
        })?;
    if (row.time - segment.start).abs() > step_size / 2.0 {
        tracing::warn!(
            boundary = segment.start,
            nearest = row.time,
            "carrying over state from a row away from the boundary"
        );
    }
    let carried = species.row_state(row);

    let perturbations = match boundaries {
        Boundaries::None => Vec::new(),
        Boundaries::Injections(events) => events
            .iter()
            .filter(|e| same_time(e.time, segment.start))
            .flat_map(|e| Perturbation::from_targets(&e.targets))
            .collect(),
        Boundaries::NoxTargets(targets) => vec![Perturbation::Nox {
            target: nox_target(targets, segment)?,
        }],
    };
    compute_next_initial_state(&carried, &perturbations, segment.start)
}

/// Run an experiment to completion.
pub fn run_experiment(
    request: &RunRequest,
    runner: &mut dyn SegmentRunner,
) -> AppResult<RunResponse> {
    run_experiment_with_progress(request, runner, None)
}

/// Run an experiment and stream progress events.
pub fn run_experiment_with_progress(
    request: &RunRequest,
    runner: &mut dyn SegmentRunner,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();
    let experiment = request.experiment;

    emit_progress(
        &mut progress_cb,
        None,
        RunStage::Validating,
        started,
        Some("Validating experiment".to_string()),
        None,
    );
    let mode = RunMode::select(experiment)?;
    validate_experiment(experiment)?;
    let grid = experiment.clock.grid()?;

    let mut warnings = Vec::new();
    if let Some(warning) = mode.warning() {
        tracing::warn!("{warning}");
        warnings.push(warning.to_string());
    }

    emit_progress(
        &mut progress_cb,
        Some(mode),
        RunStage::Planning,
        started,
        Some(format!("Planning {mode} run")),
        None,
    );
    let plan_start = Instant::now();
    let (segments, boundaries) = plan(mode, experiment, &grid)?;

    // Split runs carry every species across boundaries, so they output all of them.
    let (output_species, output_rates) = if mode.is_segmented() {
        let all = runner.mechanism_species()?;
        (all.clone(), all)
    } else {
        (
            experiment.outputs.species.clone(),
            experiment.outputs.rates.clone(),
        )
    };
    timing.plan_time_s = plan_start.elapsed().as_secs_f64();
    tracing::info!(%mode, segments = segments.len(), "planned run");

    let mut combined = OutputTables::default();
    let mut previous: Option<OutputTables> = None;
    for segment in &segments {
        let initial = initial_state(
            experiment,
            segment,
            &boundaries,
            previous.as_ref(),
            grid.step_size(),
        )?;

        let job = SegmentJob {
            index: segment.index,
            start: segment.start,
            config: ModelConfig {
                inputs: &experiment.inputs,
                initial_concentrations: &initial,
                output_species: &output_species,
                output_rates: &output_rates,
            },
            parameters: ModelParameters {
                n_steps: segment.n_steps,
                step_size: grid.step_size(),
                t_start: segment.start,
                date: experiment.clock.date,
                latitude: experiment.clock.latitude,
                longitude: experiment.clock.longitude,
            },
        };

        tracing::info!(
            segment = segment.index + 1,
            of = segment.count,
            start = segment.start,
            end = segment.end,
            n_steps = segment.n_steps,
            "running segment"
        );
        emit_progress(
            &mut progress_cb,
            Some(mode),
            RunStage::RunningSegment,
            started,
            None,
            Some(SegmentProgress {
                index: segment.index,
                count: segment.count,
                start: segment.start,
                end: segment.end,
                fraction_complete: segment.index as f64 / segment.count as f64,
            }),
        );

        let segment_start = Instant::now();
        let output = runner
            .run_segment(&job)
            .map_err(|source| AppError::Segment {
                index: segment.index,
                start_time: segment.start,
                source,
            })?;
        timing.segment_time_s += segment_start.elapsed().as_secs_f64();

        let stitch_start = Instant::now();
        let window = segment.window(grid.step_size());
        append_segment(&mut combined, &output, &window).map_err(|source| AppError::Stitch {
            index: segment.index,
            start_time: segment.start,
            source,
        })?;
        timing.stitch_time_s += stitch_start.elapsed().as_secs_f64();
        timing.segments_run += 1;
        previous = Some(output);
    }

    emit_progress(
        &mut progress_cb,
        Some(mode),
        RunStage::SelectingOutputs,
        started,
        None,
        None,
    );
    let (tables, missing) = select_outputs(
        combined,
        &experiment.outputs.species,
        &experiment.outputs.rates,
    );
    if !missing.is_empty() {
        if experiment.outputs.strict {
            return Err(AppError::MissingOutputs {
                species: missing.species,
                rates: missing.rates,
            });
        }
        let message = format!(
            "requested outputs never produced: species {:?}, rates {:?}",
            missing.species, missing.rates
        );
        tracing::warn!("{message}");
        warnings.push(message);
    }

    let run_id = cf_results::compute_run_id(experiment, &request.options.tool_version);
    let manifest = ResultManifest {
        run_id: run_id.clone(),
        experiment_name: experiment.name.clone(),
        timestamp: chrono::Utc::now(),
        tool_version: request.options.tool_version.clone(),
        mode: mode.name().to_string(),
        segments: timing.segments_run,
        t_start: grid.t_start(),
        t_end: grid.t_end(),
        step_size: grid.step_size(),
        missing: missing.clone(),
        warnings: warnings.clone(),
    };

    timing.total_time_s = started.elapsed().as_secs_f64();
    emit_progress(
        &mut progress_cb,
        Some(mode),
        RunStage::Completed,
        started,
        Some(format!("Completed {} segment(s)", timing.segments_run)),
        None,
    );
    tracing::info!(
        run_id = %run_id,
        rows = tables.species.len(),
        total_s = timing.total_time_s,
        "run complete"
    );

    Ok(RunResponse {
        run_id,
        mode,
        manifest,
        tables,
        missing,
        warnings,
        timing,
    })
}

/// Write a finished run to `dir`.
pub fn write_response(dir: &Path, response: &RunResponse) -> AppResult<()> {
    cf_results::write_result(dir, &response.manifest, &response.tables)?;
    Ok(())
}

/// Load a result directory written by [`write_response`].
pub fn load_response(dir: &Path) -> AppResult<(ResultManifest, OutputTables)> {
    Ok(cf_results::load_result(dir)?)
}
