//! Content-based hashing for run IDs.

use cf_config::Experiment;
use sha2::{Digest, Sha256};

/// Stable identifier for one experiment definition run by one tool version.
pub fn compute_run_id(experiment: &Experiment, tool_version: &str) -> String {
    let mut hasher = Sha256::new();

    let experiment_json = serde_json::to_string(experiment).unwrap_or_default();
    hasher.update(experiment_json.as_bytes());
    hasher.update(tool_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
