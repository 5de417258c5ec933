//! Writing a combined result to disk and reading it back.
//!
//! Layout of a result directory:
//! ```text
//! <dir>/manifest.json
//! <dir>/speciesConcentrations.output
//! <dir>/lossRates.output
//! <dir>/productionRates.output
//! <dir>/environmentVariables.output
//! ```
//! Tables use the simulator's own whitespace format, so one reader serves both.

use crate::read::{
    ENVIRONMENT_FILE, LOSS_RATES_FILE, PRODUCTION_RATES_FILE, SPECIES_FILE, read_output_tables,
};
use crate::stitch::MissingOutputs;
use crate::types::{OutputTables, RateTable, TimeTable};
use crate::{ResultsError, ResultsResult};
use cf_config::emit::format_real;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultManifest {
    pub run_id: String,
    pub experiment_name: String,
    pub timestamp: DateTime<Utc>,
    pub tool_version: String,
    /// `plain`, `injection` or `nox-constraint`.
    pub mode: String,
    pub segments: usize,
    pub t_start: f64,
    pub t_end: f64,
    pub step_size: f64,
    #[serde(default)]
    pub missing: MissingOutputs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn render_time_table(table: &TimeTable) -> String {
    let mut out = String::from("t");
    for column in &table.columns {
        out.push(' ');
        out.push_str(column);
    }
    out.push('\n');
    for row in &table.rows {
        out.push_str(&format_real(row.time));
        for v in &row.values {
            out.push(' ');
            out.push_str(&format_real(*v));
        }
        out.push('\n');
    }
    out
}

fn render_rate_table(table: &RateTable) -> String {
    let mut out = if table.columns.is_empty() {
        format!("{} {}", RateTable::TIME_COLUMN, RateTable::SPECIES_COLUMN)
    } else {
        table.columns.join(" ")
    };
    out.push('\n');
    for row in &table.rows {
        out.push_str(&row.cells.join(" "));
        out.push('\n');
    }
    out
}

/// Write `tables` and `manifest` into `dir`, creating it if needed.
pub fn write_result(
    dir: &Path,
    manifest: &ResultManifest,
    tables: &OutputTables,
) -> ResultsResult<()> {
    fs::create_dir_all(dir)?;

    fs::write(dir.join(SPECIES_FILE), render_time_table(&tables.species))?;
    fs::write(dir.join(LOSS_RATES_FILE), render_rate_table(&tables.loss_rates))?;
    fs::write(
        dir.join(PRODUCTION_RATES_FILE),
        render_rate_table(&tables.production_rates),
    )?;
    fs::write(
        dir.join(ENVIRONMENT_FILE),
        render_time_table(&tables.environment),
    )?;

    let manifest_json = serde_json::to_string_pretty(manifest)?;
    fs::write(dir.join(MANIFEST_FILE), manifest_json)?;
    Ok(())
}

pub fn load_manifest(dir: &Path) -> ResultsResult<ResultManifest> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(ResultsError::ResultNotFound {
            path: dir.to_path_buf(),
        });
    }
    let content = fs::read_to_string(manifest_path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn load_result(dir: &Path) -> ResultsResult<(ResultManifest, OutputTables)> {
    let manifest = load_manifest(dir)?;
    let tables = read_output_tables(dir)?;
    Ok((manifest, tables))
}
