//! Error types for building and running the simulator.

use std::path::PathBuf;
use thiserror::Error;

/// External step a child process was launched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Build,
    Run,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Step::Build => "build",
            Step::Run => "run",
        })
    }
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] cf_config::ConfigError),

    #[error("Output error: {0}")]
    Results(#[from] cf_results::ResultsError),

    #[error("AtChem2 template not found: {}", path.display())]
    MissingTemplate { path: PathBuf },

    #[error("Failed to launch {step} ({}): {source}", program.display())]
    Spawn {
        step: Step,
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("{step} step exited with {status}\n{log_tail}")]
    Failed {
        step: Step,
        status: String,
        log_tail: String,
    },

    #[error("{step} step exceeded {limit_s} s and was killed")]
    Timeout { step: Step, limit_s: f64 },
}

pub type SimResult<T> = Result<T, SimError>;
