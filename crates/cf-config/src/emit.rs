//! Config emitter: writes one run directory's simulator configuration.
//!
//! Every file is a flat text list. Values are written with [`format_real`] so that
//! very small or very large numbers stay within the simulator's line-length limits.

use crate::environment::{PHOTOLYSIS_ENV_VARIABLE, resolve_environment};
use crate::schema::{InputsDef, TimePoint};
use crate::ConfigResult;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Well-known locations inside a simulator directory.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    root: PathBuf,
}

impl ModelPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_dir(&self) -> PathBuf {
        self.root.join("model")
    }

    pub fn configuration_dir(&self) -> PathBuf {
        self.model_dir().join("configuration")
    }

    pub fn constraints_dir(&self, kind: &str) -> PathBuf {
        self.model_dir().join("constraints").join(kind)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.model_dir().join("output")
    }

    fn config_file(&self, name: &str) -> PathBuf {
        self.configuration_dir().join(name)
    }
}

/// Borrowed view of everything the configuration files of one run need.
#[derive(Debug, Clone, Copy)]
pub struct ModelConfig<'a> {
    pub inputs: &'a InputsDef,
    /// Initial state for this run; replaces `inputs.initial_concentrations`.
    pub initial_concentrations: &'a BTreeMap<String, f64>,
    pub output_species: &'a [String],
    pub output_rates: &'a [String],
}

impl<'a> ModelConfig<'a> {
    pub fn new(
        inputs: &'a InputsDef,
        output_species: &'a [String],
        output_rates: &'a [String],
    ) -> Self {
        Self {
            inputs,
            initial_concentrations: &inputs.initial_concentrations,
            output_species,
            output_rates,
        }
    }
}

/// Contents of `model.parameters`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    pub n_steps: usize,
    pub step_size: f64,
    pub t_start: f64,
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
}

pub fn format_real(v: f64) -> String {
    let a = v.abs();
    if a == 0.0 || (1e-3..1e7).contains(&a) {
        format!("{v}")
    } else {
        format!("{v:e}")
    }
}

fn write_lines<I, S>(path: &Path, lines: I) -> ConfigResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn write_keyed_values(path: &Path, values: &BTreeMap<String, f64>) -> ConfigResult<()> {
    write_lines(
        path,
        values
            .iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(k, v)| format!("{k} {}", format_real(*v))),
    )
}

fn write_time_series(path: &Path, points: &[TimePoint]) -> ConfigResult<()> {
    write_lines(
        path,
        points
            .iter()
            .filter(|p| p.value.is_finite())
            .map(|p| format!("{} {}", format_real(p.time), format_real(p.value))),
    )
}

fn write_constraint_set(
    list_path: &Path,
    table_dir: &Path,
    tables: &BTreeMap<String, Vec<TimePoint>>,
) -> ConfigResult<()> {
    write_lines(list_path, tables.keys())?;
    for (name, points) in tables {
        write_time_series(&table_dir.join(name), points)?;
    }
    Ok(())
}

/// Write every configuration file for one run.
pub fn write_model_config(paths: &ModelPaths, config: &ModelConfig<'_>) -> ConfigResult<()> {
    let inputs = config.inputs;
    tracing::debug!(root = %paths.root().display(), "writing model configuration");

    write_keyed_values(
        &paths.config_file("initialConcentrations.config"),
        config.initial_concentrations,
    )?;

    write_constraint_set(
        &paths.config_file("speciesConstrained.config"),
        &paths.constraints_dir("species"),
        &inputs.species_constraints,
    )?;
    write_constraint_set(
        &paths.config_file("photolysisConstrained.config"),
        &paths.constraints_dir("photolysis"),
        &inputs.photolysis_constraints,
    )?;

    write_keyed_values(
        &paths.config_file("speciesConstant.config"),
        &inputs.species_constants,
    )?;

    // "<reaction number> <value> <J name>", e.g. "4 1e-5 J4"
    write_lines(
        &paths.config_file("photolysisConstant.config"),
        inputs.photolysis_constants.iter().map(|(name, v)| {
            format!("{} {} {}", name.trim_matches('J'), format_real(*v), name)
        }),
    )?;

    let environment =
        resolve_environment(&inputs.environment, &inputs.environment_constraints)?;
    write_lines(
        &paths.config_file("environmentVariables.config"),
        environment
            .iter()
            .enumerate()
            .map(|(i, (name, value))| format!("{} {} {}", i + 1, name, value)),
    )?;
    for (name, points) in &inputs.environment_constraints {
        let dir = if name == PHOTOLYSIS_ENV_VARIABLE {
            paths.constraints_dir("photolysis")
        } else {
            paths.constraints_dir("environment")
        };
        write_time_series(&dir.join(name), points)?;
    }

    write_lines(
        &paths.config_file("outputSpecies.config"),
        config.output_species,
    )?;
    write_lines(&paths.config_file("outputRates.config"), config.output_rates)?;

    Ok(())
}

/// Write `model.parameters`.
pub fn write_model_parameters(paths: &ModelPaths, params: &ModelParameters) -> ConfigResult<()> {
    let step = format_real(params.step_size);
    let mut content = String::new();
    let mut line = |value: String, label: &str| {
        let _ = writeln!(content, "{value}\t\t\t{label}");
    };
    line(params.n_steps.to_string(), "number of steps");
    line(step.clone(), "step size (seconds)");
    line("2".into(), "species interpolation method (pw constant = 1, pw linear = 2)");
    line("2".into(), "conditions interpolation method (pw constant = 1, pw linear = 2)");
    line(step.clone(), "rates output step size (seconds)");
    line(format_real(params.t_start), "model start time (seconds)");
    line("0".into(), "jacobian output step size (seconds)");
    line(params.latitude.to_string(), "latitude (degrees)");
    line(params.longitude.to_string(), "longitude (degrees)");
    line(format!("{:02}", params.date.day()), "day");
    line(format!("{:02}", params.date.month()), "month");
    line(format!("{:04}", params.date.year()), "year");
    line(step, "reaction rates output step size (seconds)");

    let path = paths.config_file("model.parameters");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
