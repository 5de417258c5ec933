//! Run mode selection.

use cf_config::{Experiment, check_exclusive_modes};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// How the model-time window is split into simulator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// One simulator run over the whole window.
    Plain,
    /// One run per injection interval, with concentrations reset at each event.
    Injection,
    /// One run per model step, re-partitioning NO and NO2 to a target total.
    NoxConstraint,
}

pub const NOX_MODE_WARNING: &str = "NOx constraint mode is experimental and slow: \
     it rebuilds and reruns the model once per timestep";

impl RunMode {
    /// Pick the mode an experiment asks for.
    ///
    /// Injections and a NOx constraint together are a configuration error.
    pub fn select(experiment: &Experiment) -> AppResult<Self> {
        check_exclusive_modes(experiment)?;
        let mode = if !experiment.nox_constraint.is_empty() {
            RunMode::NoxConstraint
        } else if !experiment.injections.is_empty() {
            RunMode::Injection
        } else {
            RunMode::Plain
        };
        Ok(mode)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunMode::Plain => "plain",
            RunMode::Injection => "injection",
            RunMode::NoxConstraint => "nox-constraint",
        }
    }

    /// Whether runs are split and need the full species list to carry state.
    pub fn is_segmented(&self) -> bool {
        !matches!(self, RunMode::Plain)
    }

    pub fn warning(&self) -> Option<&'static str> {
        match self {
            RunMode::NoxConstraint => Some(NOX_MODE_WARNING),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
