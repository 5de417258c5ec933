//! End-to-end orchestration against a scripted stand-in for the simulator.

use std::collections::BTreeMap;

use cf_app::{
    AppError, RunMode, RunOptions, RunProgressEvent, RunRequest, RunStage, load_response,
    run_experiment, run_experiment_with_progress, write_response,
};
use cf_config::{ClockDef, Experiment, InjectionDef, ModelDef, TimePoint};
use cf_results::{Concentrations, OutputTables, RateRow, RateTable, TimeTable};
use cf_sim::{SegmentJob, SegmentRunner, SimError, SimResult, Step};

#[derive(Debug, Clone)]
struct RecordedJob {
    start: f64,
    n_steps: usize,
    initial: Concentrations,
    output_species: Vec<String>,
}

/// Holds every species at its initial value for the whole segment.
#[derive(Default)]
struct FakeRunner {
    species: Vec<String>,
    jobs: Vec<RecordedJob>,
    zero_nox_after: Option<f64>,
    fail_at: Option<usize>,
    extra_column_at: Option<usize>,
}

impl FakeRunner {
    fn new(species: &[&str]) -> Self {
        Self {
            species: species.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl SegmentRunner for FakeRunner {
    fn mechanism_species(&mut self) -> SimResult<Vec<String>> {
        Ok(self.species.clone())
    }

    fn run_segment(&mut self, job: &SegmentJob<'_>) -> SimResult<OutputTables> {
        self.jobs.push(RecordedJob {
            start: job.start,
            n_steps: job.parameters.n_steps,
            initial: job.config.initial_concentrations.clone(),
            output_species: job.config.output_species.to_vec(),
        });
        if self.fail_at == Some(job.index) {
            return Err(SimError::Timeout {
                step: Step::Run,
                limit_s: 1.0,
            });
        }

        let zero_after = self.zero_nox_after;
        let p = &job.parameters;
        let mut columns = job.config.output_species.to_vec();
        if self.extra_column_at == Some(job.index) {
            columns.push("EXTRA".to_string());
        }
        let mut species = TimeTable::new(columns);
        let mut environment = TimeTable::new(vec!["TEMP".to_string()]);
        let mut rates = RateTable::new(["time", "speciesName", "rate"].map(String::from).to_vec());
        for k in 0..=p.n_steps {
            let t = p.t_start + k as f64 * p.step_size;
            let values: Vec<f64> = species
                .columns
                .iter()
                .map(|name| {
                    let v = job.config.initial_concentrations.get(name).copied().unwrap_or(0.0);
                    match zero_after {
                        Some(limit) if t > limit && (name == "NO" || name == "NO2") => 0.0,
                        _ => v,
                    }
                })
                .collect();
            species.push_row(t, values).unwrap();
            environment.push_row(t, vec![298.15]).unwrap();
            if k > 0 {
                for name in job.config.output_rates {
                    rates.rows.push(RateRow {
                        time: t,
                        species: name.clone(),
                        cells: vec![t.to_string(), name.clone(), "1.0".to_string()],
                    });
                }
            }
        }
        Ok(OutputTables {
            species,
            loss_rates: rates.clone(),
            production_rates: rates,
            environment,
        })
    }
}

fn experiment(t_end: f64, step: f64, initial: &[(&str, f64)]) -> Experiment {
    let mut exp = Experiment {
        version: cf_config::LATEST_VERSION,
        name: "chamber".to_string(),
        model: ModelDef::new("atchem2", "chamber.fac"),
        clock: ClockDef {
            date: chrono::NaiveDate::from_ymd_opt(2023, 6, 21).unwrap(),
            latitude: 51.5,
            longitude: -0.1,
            t_start: 0.0,
            t_end,
            step_size: step,
        },
        inputs: Default::default(),
        outputs: Default::default(),
        injections: vec![],
        nox_constraint: vec![],
    };
    exp.inputs.initial_concentrations = initial.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    exp
}

fn request(experiment: &Experiment) -> RunRequest<'_> {
    RunRequest {
        experiment,
        options: RunOptions::default(),
    }
}

#[test]
fn single_injection_resets_species_and_stitches_three_rows() {
    let mut exp = experiment(20.0, 10.0, &[("X", 1.0)]);
    exp.injections.push(InjectionDef {
        time: 10.0,
        species: BTreeMap::from([("X".to_string(), 5.0)]),
    });
    let mut runner = FakeRunner::new(&["X", "Y"]);

    let response = run_experiment(&request(&exp), &mut runner).unwrap();

    assert_eq!(response.mode, RunMode::Injection);
    assert_eq!(runner.jobs.len(), 2);
    assert_eq!(runner.jobs[0].n_steps, 2);
    assert_eq!(runner.jobs[1].start, 10.0);
    assert_eq!(runner.jobs[1].initial["X"], 5.0);
    assert_eq!(runner.jobs[1].initial["Y"], 0.0);
    assert_eq!(runner.jobs[0].output_species, vec!["X", "Y"]);

    let x = response.tables.species.column("X").unwrap();
    assert_eq!(x, vec![(0.0, 1.0), (10.0, 1.0), (20.0, 5.0)]);
    assert_eq!(response.tables.environment.times(), vec![0.0, 10.0, 20.0]);
    let rate_times: Vec<f64> = response.tables.loss_rates.rows.iter().map(|r| r.time).collect();
    assert_eq!(rate_times, vec![10.0, 10.0, 20.0, 20.0]);
    assert_eq!(response.manifest.segments, 2);
    assert!(response.warnings.is_empty());
}

#[test]
fn nox_constraint_tracks_densified_target() {
    let mut exp = experiment(100.0, 10.0, &[("NO", 1.0), ("NO2", 3.0), ("O3", 50.0)]);
    exp.nox_constraint = vec![TimePoint::new(0.0, 100.0), TimePoint::new(100.0, 140.0)];
    let mut runner = FakeRunner::new(&["NO", "NO2", "O3"]);

    let response = run_experiment(&request(&exp), &mut runner).unwrap();

    assert_eq!(response.mode, RunMode::NoxConstraint);
    assert_eq!(runner.jobs.len(), 10);
    assert!(runner.jobs.iter().all(|j| j.n_steps == 1));

    let at_50 = &runner.jobs[5].initial;
    assert_eq!(runner.jobs[5].start, 50.0);
    assert!((at_50["NO"] + at_50["NO2"] - 120.0).abs() < 1e-9);
    assert!((at_50["NO2"] / at_50["NO"] - 3.0).abs() < 1e-9);
    assert_eq!(at_50["O3"], 50.0);

    assert_eq!(response.tables.species.len(), 11);
    assert!(response.warnings.iter().any(|w| w.contains("experimental")));
}

#[test]
fn nox_bootstrap_splits_evenly() {
    let mut exp = experiment(20.0, 10.0, &[("O3", 50.0)]);
    exp.nox_constraint = vec![TimePoint::new(0.0, 100.0)];
    let mut runner = FakeRunner::new(&["NO", "NO2", "O3"]);

    run_experiment(&request(&exp), &mut runner).unwrap();
    assert_eq!(runner.jobs[0].initial["NO"], 50.0);
    assert_eq!(runner.jobs[0].initial["NO2"], 50.0);
}

#[test]
fn injections_with_nox_constraint_run_nothing() {
    let mut exp = experiment(20.0, 10.0, &[("NO", 1.0)]);
    exp.injections.push(InjectionDef {
        time: 10.0,
        species: BTreeMap::from([("NO".to_string(), 5.0)]),
    });
    exp.nox_constraint = vec![TimePoint::new(0.0, 100.0)];
    let mut runner = FakeRunner::new(&["NO", "NO2"]);

    let err = run_experiment(&request(&exp), &mut runner).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert!(runner.jobs.is_empty());
}

#[test]
fn zero_nox_mid_run_is_degenerate() {
    let mut exp = experiment(30.0, 10.0, &[("NO", 1.0), ("NO2", 1.0)]);
    exp.nox_constraint = vec![TimePoint::new(0.0, 100.0)];
    let mut runner = FakeRunner::new(&["NO", "NO2"]);
    runner.zero_nox_after = Some(10.0);

    let err = run_experiment(&request(&exp), &mut runner).unwrap_err();
    match err {
        AppError::DegenerateState { time, .. } => assert_eq!(time, 20.0),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(runner.jobs.len(), 2);
}

#[test]
fn zero_supplied_nox_fails_before_first_segment() {
    let mut exp = experiment(30.0, 10.0, &[("NO", 0.0), ("NO2", 0.0)]);
    exp.nox_constraint = vec![TimePoint::new(0.0, 100.0)];
    let mut runner = FakeRunner::new(&["NO", "NO2"]);

    let err = run_experiment(&request(&exp), &mut runner).unwrap_err();
    assert!(matches!(err, AppError::DegenerateState { .. }));
    assert!(runner.jobs.is_empty());
}

#[test]
fn segment_failure_names_segment_and_time() {
    let mut exp = experiment(30.0, 10.0, &[("X", 1.0)]);
    exp.injections.push(InjectionDef {
        time: 20.0,
        species: BTreeMap::from([("X".to_string(), 2.0)]),
    });
    let mut runner = FakeRunner::new(&["X"]);
    runner.fail_at = Some(1);

    let err = run_experiment(&request(&exp), &mut runner).unwrap_err();
    match err {
        AppError::Segment {
            index, start_time, ..
        } => {
            assert_eq!(index, 1);
            assert_eq!(start_time, 20.0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn stitch_failure_names_segment_and_time() {
    let mut exp = experiment(30.0, 10.0, &[("X", 1.0)]);
    exp.injections.push(InjectionDef {
        time: 20.0,
        species: BTreeMap::from([("X".to_string(), 2.0)]),
    });
    let mut runner = FakeRunner::new(&["X"]);
    runner.extra_column_at = Some(1);

    let err = run_experiment(&request(&exp), &mut runner).unwrap_err();
    match err {
        AppError::Stitch {
            index,
            start_time,
            source,
        } => {
            assert_eq!(index, 1);
            assert_eq!(start_time, 20.0);
            assert!(matches!(source, cf_results::ResultsError::Shape { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn plain_run_uses_requested_outputs() {
    let mut exp = experiment(25.0, 10.0, &[("X", 1.0)]);
    exp.outputs.species = vec!["X".to_string()];
    let mut runner = FakeRunner::new(&["X", "Y"]);

    let response = run_experiment(&request(&exp), &mut runner).unwrap();
    assert_eq!(response.mode, RunMode::Plain);
    assert_eq!(runner.jobs.len(), 1);
    assert_eq!(runner.jobs[0].n_steps, 2);
    assert_eq!(runner.jobs[0].output_species, vec!["X"]);
    assert_eq!(response.tables.species.times(), vec![0.0, 10.0, 20.0]);
}

#[test]
fn missing_outputs_warn_or_fail() {
    let mut exp = experiment(20.0, 10.0, &[("X", 1.0)]);
    exp.injections.push(InjectionDef {
        time: 10.0,
        species: BTreeMap::from([("X".to_string(), 5.0)]),
    });
    exp.outputs.species = vec!["X".to_string(), "HONO".to_string()];

    let response = run_experiment(&request(&exp), &mut FakeRunner::new(&["X"])).unwrap();
    assert_eq!(response.missing.species, vec!["HONO"]);
    assert_eq!(response.tables.species.columns, vec!["X"]);
    assert!(response.warnings.iter().any(|w| w.contains("HONO")));

    exp.outputs.strict = true;
    let err = run_experiment(&request(&exp), &mut FakeRunner::new(&["X"])).unwrap_err();
    assert!(matches!(err, AppError::MissingOutputs { .. }));
}

#[test]
fn progress_reports_each_segment() {
    let mut exp = experiment(30.0, 10.0, &[("X", 1.0)]);
    exp.injections = vec![
        InjectionDef {
            time: 10.0,
            species: BTreeMap::from([("X".to_string(), 2.0)]),
        },
        InjectionDef {
            time: 20.0,
            species: BTreeMap::from([("X".to_string(), 3.0)]),
        },
    ];
    let mut runner = FakeRunner::new(&["X"]);
    let mut events: Vec<RunProgressEvent> = Vec::new();

    let response =
        run_experiment_with_progress(&request(&exp), &mut runner, Some(&mut |e| events.push(e)))
            .unwrap();

    let segment_events: Vec<_> = events
        .iter()
        .filter(|e| e.stage == RunStage::RunningSegment)
        .filter_map(|e| e.segment)
        .collect();
    assert_eq!(segment_events.len(), 3);
    assert_eq!(segment_events[2].start, 20.0);
    assert!(matches!(events.last().map(|e| &e.stage), Some(RunStage::Completed)));
    assert_eq!(response.timing.segments_run, 3);
}

#[test]
fn written_result_loads_back() {
    let mut exp = experiment(20.0, 10.0, &[("X", 1.0)]);
    exp.injections.push(InjectionDef {
        time: 10.0,
        species: BTreeMap::from([("X".to_string(), 5.0)]),
    });
    let response = run_experiment(&request(&exp), &mut FakeRunner::new(&["X"])).unwrap();

    let dir = tempfile::tempdir().unwrap();
    write_response(dir.path(), &response).unwrap();
    let (manifest, tables) = load_response(dir.path()).unwrap();
    assert_eq!(manifest.mode, "injection");
    assert_eq!(manifest.run_id, response.run_id);
    assert_eq!(tables.species, response.tables.species);
    assert_eq!(tables.loss_rates.len(), response.tables.loss_rates.len());
}
