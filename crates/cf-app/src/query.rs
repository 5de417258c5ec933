//! Query helpers for extracting data from combined results.

use cf_results::{OutputTables, TimeTable};

use crate::error::{AppError, AppResult};

/// Summary of a result's time range and contents.
#[derive(Debug, Clone)]
pub struct ResultSummary {
    pub time_range: (f64, f64),
    pub row_count: usize,
    pub species_count: usize,
    pub environment_count: usize,
    pub loss_rate_rows: usize,
    pub production_rate_rows: usize,
}

pub fn get_result_summary(tables: &OutputTables) -> AppResult<ResultSummary> {
    let rows = &tables.species.rows;
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Err(AppError::InvalidInput("No rows in result".to_string()));
    };

    Ok(ResultSummary {
        time_range: (first.time, last.time),
        row_count: rows.len(),
        species_count: tables.species.columns.len(),
        environment_count: tables.environment.columns.len(),
        loss_rate_rows: tables.loss_rates.len(),
        production_rate_rows: tables.production_rates.len(),
    })
}

pub fn list_species(tables: &OutputTables) -> Vec<String> {
    tables.species.columns.clone()
}

pub fn list_environment_variables(tables: &OutputTables) -> Vec<String> {
    tables.environment.columns.clone()
}

fn series(table: &TimeTable, name: &str, kind: &str) -> AppResult<Vec<(f64, f64)>> {
    table
        .column(name)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown {kind}: {name}")))
}

/// Time series of one species concentration.
pub fn extract_species_series(tables: &OutputTables, species: &str) -> AppResult<Vec<(f64, f64)>> {
    series(&tables.species, species, "species")
}

/// Time series of one environment variable.
pub fn extract_environment_series(
    tables: &OutputTables,
    variable: &str,
) -> AppResult<Vec<(f64, f64)>> {
    series(&tables.environment, variable, "environment variable")
}

/// Total loss or production rate of `species` at each output time.
pub fn total_rate_series(
    tables: &OutputTables,
    species: &str,
    production: bool,
) -> AppResult<Vec<(f64, f64)>> {
    let table = if production {
        &tables.production_rates
    } else {
        &tables.loss_rates
    };
    let rate_idx = table
        .columns
        .iter()
        .position(|c| c == "rate")
        .ok_or_else(|| AppError::InvalidInput("Rate table has no 'rate' column".to_string()))?;

    let mut out: Vec<(f64, f64)> = Vec::new();
    for row in table.rows.iter().filter(|r| r.species == species) {
        let rate = row
            .cells
            .get(rate_idx)
            .and_then(|c| cf_results::read::parse_real(c))
            .ok_or_else(|| {
                AppError::InvalidInput(format!("Unreadable rate at t={} for {species}", row.time))
            })?;
        match out.last_mut() {
            Some((t, total)) if cf_core::time::same_time(*t, row.time) => *total += rate,
            _ => out.push((row.time, rate)),
        }
    }
    if out.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "No rate rows for species: {species}"
        )));
    }
    Ok(out)
}
