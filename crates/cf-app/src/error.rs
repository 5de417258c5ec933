//! Error types for the cf-app service layer.

use cf_config::{ConfigError, ValidationError};

/// Application error type that wraps errors from the backend crates and gives
/// the CLI one error to report.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Degenerate state at t={time}: {what}")]
    DegenerateState { time: f64, what: String },

    #[error("Planning error: {what}")]
    Planning { what: String },

    #[error("Segment {index} (t={start_time}) failed: {source}")]
    Segment {
        index: usize,
        start_time: f64,
        #[source]
        source: cf_sim::SimError,
    },

    #[error("Stitching segment {index} (t={start_time}) failed: {source}")]
    Stitch {
        index: usize,
        start_time: f64,
        #[source]
        source: cf_results::ResultsError,
    },

    #[error("Simulation error: {0}")]
    Simulation(#[from] cf_sim::SimError),

    #[error("Results error: {0}")]
    Results(#[from] cf_results::ResultsError),

    #[error("Requested outputs missing: species {species:?}, rates {rates:?}")]
    MissingOutputs {
        species: Vec<String>,
        rates: Vec<String>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Config(ConfigError::Validation(err))
    }
}

impl From<cf_core::CoreError> for AppError {
    fn from(err: cf_core::CoreError) -> Self {
        AppError::Config(ConfigError::Validation(ValidationError::Window(err)))
    }
}
