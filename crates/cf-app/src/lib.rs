//! Shared application service layer for chamberflow.
//!
//! Plans segmented AtChem2 runs for chamber experiments, carries concentrations
//! across segment boundaries, stitches the outputs and answers queries on the
//! combined result. The CLI is a thin layer over this crate.

pub mod carry;
pub mod error;
pub mod experiment_service;
pub mod mode;
pub mod planner;
pub mod progress;
pub mod query;
pub mod run_service;

// Re-export key types for convenience
pub use carry::{Perturbation, bootstrap_nox, compute_next_initial_state};
pub use error::{AppError, AppResult};
pub use experiment_service::{
    ExperimentSummary, load_experiment, mechanism_species, summarize,
    validate_experiment,
};
pub use mode::RunMode;
pub use planner::{
    InjectionEvent, Segment, densify_nox, injection_boundaries, merge_injections,
    plan_injection_segments, plan_nox_segments, plan_plain,
};
pub use progress::{RunProgressEvent, RunStage, SegmentProgress};
pub use query::{ResultSummary, get_result_summary};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, RunTimingSummary, load_response, run_experiment,
    run_experiment_with_progress, write_response,
};
