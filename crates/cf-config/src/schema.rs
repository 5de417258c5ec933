//! Experiment schema definitions.

use cf_core::{CoreResult, TimeGrid};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Species name used in injection events for the combined NO + NO2 quantity.
pub const NOX_SPECIES: &str = "NOx";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Experiment {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    pub model: ModelDef,
    pub clock: ClockDef,
    #[serde(default)]
    pub inputs: InputsDef,
    #[serde(default)]
    pub outputs: OutputsDef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub injections: Vec<InjectionDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nox_constraint: Vec<TimePoint>,
}

fn default_version() -> u32 {
    crate::LATEST_VERSION
}

impl Experiment {
    /// Rebase relative model paths onto `base_dir` (usually the experiment file's directory).
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        if self.model.atchem2_path.is_relative() {
            self.model.atchem2_path = base_dir.join(&self.model.atchem2_path);
        }
        if self.model.mechanism_path.is_relative() {
            self.model.mechanism_path = base_dir.join(&self.model.mechanism_path);
        }
    }
}

/// Location of the simulator template and the mechanism it is built against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDef {
    /// Template AtChem2 directory; copied for every segment, never modified.
    pub atchem2_path: PathBuf,
    /// FACSIMILE mechanism file.
    pub mechanism_path: PathBuf,
    /// Build script, relative to the copied model directory.
    #[serde(default = "default_build_script")]
    pub build_script: PathBuf,
    /// Executable produced by the build, relative to the copied model directory.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Wall-clock limit for each build and each run, in seconds.
    #[serde(default = "default_timeout_s")]
    pub timeout_s: f64,
}

impl ModelDef {
    /// Model definition with the default build script, executable and timeout.
    pub fn new(atchem2_path: impl Into<PathBuf>, mechanism_path: impl Into<PathBuf>) -> Self {
        Self {
            atchem2_path: atchem2_path.into(),
            mechanism_path: mechanism_path.into(),
            build_script: default_build_script(),
            executable: default_executable(),
            timeout_s: default_timeout_s(),
        }
    }
}

fn default_build_script() -> PathBuf {
    PathBuf::from("build/build_atchem2.sh")
}

fn default_executable() -> PathBuf {
    PathBuf::from("atchem2")
}

fn default_timeout_s() -> f64 {
    600.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClockDef {
    /// Calendar date of model time zero.
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub t_start: f64,
    pub t_end: f64,
    pub step_size: f64,
}

impl ClockDef {
    pub fn grid(&self) -> CoreResult<TimeGrid> {
        TimeGrid::new(self.t_start, self.t_end, self.step_size)
    }
}

/// A `(time, value)` sample of a constraint or target series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimePoint {
    pub time: f64,
    pub value: f64,
}

impl TimePoint {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Everything written into the simulator's configuration for every segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InputsDef {
    #[serde(default)]
    pub initial_concentrations: BTreeMap<String, f64>,
    #[serde(default)]
    pub species_constraints: BTreeMap<String, Vec<TimePoint>>,
    #[serde(default)]
    pub species_constants: BTreeMap<String, f64>,
    #[serde(default)]
    pub photolysis_constants: BTreeMap<String, f64>,
    #[serde(default)]
    pub photolysis_constraints: BTreeMap<String, Vec<TimePoint>>,
    /// Overrides for the standard environment variables, plus any custom ones.
    #[serde(default)]
    pub environment: BTreeMap<String, EnvValue>,
    #[serde(default)]
    pub environment_constraints: BTreeMap<String, Vec<TimePoint>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OutputsDef {
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub rates: Vec<String>,
    /// Fail the run instead of warning when a requested output never appears.
    #[serde(default)]
    pub strict: bool,
}

/// Instantaneous change of one or more species at a model time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectionDef {
    pub time: f64,
    /// Target concentration per species. `NOx` re-partitions NO and NO2.
    pub species: BTreeMap<String, f64>,
}

/// Value of an environment variable line: a number or a keyword such as
/// `NOTUSED`, `OPEN`, `CONSTRAINED`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EnvValue {
    Number(f64),
    Text(String),
}

impl EnvValue {
    pub const CONSTRAINED: &'static str = "CONSTRAINED";

    pub fn text(value: &str) -> Self {
        EnvValue::Text(value.to_string())
    }

    pub fn constrained() -> Self {
        Self::text(Self::CONSTRAINED)
    }

    pub fn is_constrained(&self) -> bool {
        matches!(self, EnvValue::Text(t) if t.eq_ignore_ascii_case(Self::CONSTRAINED))
    }
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Number(v) => f.write_str(&crate::emit::format_real(*v)),
            EnvValue::Text(t) => f.write_str(t),
        }
    }
}
