//! Experiment validation logic.

use crate::environment::resolve_environment;
use crate::schema::{Experiment, TimePoint};
use cf_core::TimeGrid;
use cf_core::time::same_time;
use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Conflicting options: {what}")]
    Conflict { what: String },

    #[error("Invalid time window: {0}")]
    Window(#[from] cf_core::CoreError),

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Injections and a NOx constraint cannot be combined in one run.
pub fn check_exclusive_modes(experiment: &Experiment) -> Result<(), ValidationError> {
    if !experiment.injections.is_empty() && !experiment.nox_constraint.is_empty() {
        return Err(ValidationError::Conflict {
            what: "species injections and a NOx constraint cannot be used together; \
                   supply either `injections` or `nox_constraint`"
                .to_string(),
        });
    }
    Ok(())
}

pub fn validate_experiment(experiment: &Experiment) -> Result<(), ValidationError> {
    if experiment.version > crate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: experiment.version,
        });
    }

    check_exclusive_modes(experiment)?;

    let grid = experiment.clock.grid()?;
    let clock = &experiment.clock;
    if !(-90.0..=90.0).contains(&clock.latitude) {
        return Err(invalid("clock.latitude", clock.latitude, "must be within [-90, 90]"));
    }
    if !(-180.0..=180.0).contains(&clock.longitude) {
        return Err(invalid("clock.longitude", clock.longitude, "must be within [-180, 180]"));
    }

    let timeout = experiment.model.timeout_s;
    if !(timeout.is_finite() && timeout > 0.0) {
        return Err(invalid("model.timeout_s", timeout, "must be positive"));
    }

    let inputs = &experiment.inputs;
    check_amounts("inputs.initial_concentrations", &inputs.initial_concentrations)?;
    check_amounts("inputs.species_constants", &inputs.species_constants)?;
    check_amounts("inputs.photolysis_constants", &inputs.photolysis_constants)?;
    check_tables("inputs.species_constraints", &inputs.species_constraints)?;
    check_tables("inputs.photolysis_constraints", &inputs.photolysis_constraints)?;
    check_tables("inputs.environment_constraints", &inputs.environment_constraints)?;
    resolve_environment(&inputs.environment, &inputs.environment_constraints)?;

    for (i, injection) in experiment.injections.iter().enumerate() {
        let field = format!("injections[{i}]");
        if !injection.time.is_finite() {
            return Err(invalid(format!("{field}.time"), injection.time, "must be finite"));
        }
        if grid.contains_interior(injection.time) && !grid.is_on_grid(injection.time) {
            return Err(invalid(
                format!("{field}.time"),
                injection.time,
                "must fall on a model timestep (t_start + k * step_size)",
            ));
        }
        if injection.species.is_empty() {
            return Err(invalid(format!("{field}.species"), "{}", "must name at least one species"));
        }
        check_amounts(&format!("{field}.species"), &injection.species)?;
    }

    if !experiment.nox_constraint.is_empty() {
        check_series("nox_constraint", &experiment.nox_constraint)?;
        check_series_covers_start("nox_constraint", &experiment.nox_constraint, &grid)?;
    }

    Ok(())
}

fn check_amounts(field: &str, values: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
    for (name, value) in values {
        if !(value.is_finite() && *value >= 0.0) {
            return Err(invalid(
                format!("{field}.{name}"),
                value,
                "must be finite and non-negative",
            ));
        }
    }
    Ok(())
}

fn check_tables(
    field: &str,
    tables: &BTreeMap<String, Vec<TimePoint>>,
) -> Result<(), ValidationError> {
    for (name, points) in tables {
        if points.is_empty() {
            return Err(invalid(format!("{field}.{name}"), "[]", "must not be empty"));
        }
        for p in points {
            if !(p.time.is_finite() && p.value.is_finite()) {
                return Err(invalid(
                    format!("{field}.{name}"),
                    format!("({}, {})", p.time, p.value),
                    "must be finite",
                ));
            }
        }
    }
    Ok(())
}

fn check_series(field: &str, points: &[TimePoint]) -> Result<(), ValidationError> {
    for (i, p) in points.iter().enumerate() {
        if !(p.time.is_finite() && p.value.is_finite() && p.value >= 0.0) {
            return Err(invalid(
                format!("{field}[{i}]"),
                format!("({}, {})", p.time, p.value),
                "must be finite with a non-negative value",
            ));
        }
        if i > 0 && p.time <= points[i - 1].time {
            return Err(invalid(
                format!("{field}[{i}].time"),
                p.time,
                "times must be strictly increasing",
            ));
        }
    }
    Ok(())
}

fn check_series_covers_start(
    field: &str,
    points: &[TimePoint],
    grid: &TimeGrid,
) -> Result<(), ValidationError> {
    match points.first() {
        Some(first)
            if first.time <= grid.t_start() || same_time(first.time, grid.t_start()) =>
        {
            Ok(())
        }
        Some(first) => Err(invalid(
            format!("{field}[0].time"),
            first.time,
            "series must start at or before t_start",
        )),
        None => Ok(()),
    }
}
