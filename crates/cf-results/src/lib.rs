//! cf-results: simulator output tables, stitching across segments and result export.

pub mod export;
pub mod hash;
pub mod read;
pub mod stitch;
pub mod types;

pub use export::{ResultManifest, load_result, write_result};
pub use hash::compute_run_id;
pub use read::read_output_tables;
pub use stitch::{MissingOutputs, StitchWindow, append_segment, select_outputs};
pub use types::*;

use std::path::PathBuf;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{}:{line}: {what}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        what: String,
    },

    #[error("Expected output file not produced: {}", path.display())]
    MissingOutput { path: PathBuf },

    #[error("Table shape mismatch: {what}")]
    Shape { what: String },

    #[error("{what} rows out of order: t={next} follows t={previous}")]
    Ordering {
        what: String,
        previous: f64,
        next: f64,
    },

    #[error("Result not found: {}", path.display())]
    ResultNotFound { path: PathBuf },
}
