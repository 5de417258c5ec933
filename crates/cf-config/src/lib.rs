//! cf-config: experiment file format, validation and simulator configuration output.

pub mod emit;
pub mod environment;
pub mod mechanism;
pub mod schema;
pub mod validate;

pub use emit::{
    ModelConfig, ModelParameters, ModelPaths, write_model_config, write_model_parameters,
};
pub use mechanism::species_from_mechanism;
pub use schema::*;
pub use validate::{ValidationError, check_exclusive_modes, validate_experiment};

use std::path::{Path, PathBuf};

pub const LATEST_VERSION: u32 = 1;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Mechanism error in {path}: {what}")]
    Mechanism { path: PathBuf, what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn finish_load(path: &Path, mut experiment: Experiment) -> ConfigResult<Experiment> {
    if let Some(dir) = path.parent() {
        experiment.resolve_paths(dir);
    }
    validate_experiment(&experiment)?;
    Ok(experiment)
}

pub fn load_yaml(path: &Path) -> ConfigResult<Experiment> {
    let content = std::fs::read_to_string(path)?;
    let experiment: Experiment = serde_yaml::from_str(&content)?;
    finish_load(path, experiment)
}

pub fn save_yaml(path: &Path, experiment: &Experiment) -> ConfigResult<()> {
    validate_experiment(experiment)?;
    let content = serde_yaml::to_string(experiment)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ConfigResult<Experiment> {
    let content = std::fs::read_to_string(path)?;
    let experiment: Experiment = serde_json::from_str(&content)?;
    finish_load(path, experiment)
}

pub fn save_json(path: &Path, experiment: &Experiment) -> ConfigResult<()> {
    validate_experiment(experiment)?;
    let content = serde_json::to_string_pretty(experiment)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load_experiment(path: &Path) -> ConfigResult<Experiment> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}
