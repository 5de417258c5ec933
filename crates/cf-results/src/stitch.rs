//! Result stitching across consecutive segments.
//!
//! Each segment owns the window `(start, end]` of model time, the first segment
//! `[start, end]`. A boundary sample therefore comes from the segment that ends
//! there, not from the carried-over first sample of the next segment, and the
//! extra step each injection segment runs past its end is never kept.

use crate::types::{OutputTables, RateTable, TimeRow, TimeTable};
use crate::{ResultsError, ResultsResult};
use serde::{Deserialize, Serialize};

/// Range of model time a segment contributes to the combined result.
///
/// Simulator output times are printed with limited precision, so a sample within
/// half a step of a bound counts as sitting on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StitchWindow {
    pub start: f64,
    pub end: f64,
    /// Only the first segment keeps its starting sample.
    pub include_start: bool,
    pub tolerance: f64,
}

impl StitchWindow {
    pub fn new(start: f64, end: f64, step_size: f64, include_start: bool) -> Self {
        Self {
            start,
            end,
            include_start,
            tolerance: 0.5 * step_size.abs(),
        }
    }

    fn same(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.tolerance
    }

    pub fn contains(&self, t: f64) -> bool {
        let after_start = if self.same(t, self.start) {
            self.include_start
        } else {
            t > self.start
        };
        let before_end = t < self.end || self.same(t, self.end);
        after_start && before_end
    }
}

/// Rows of `table` inside `window`, in table order.
pub fn trim_time_rows<'a>(table: &'a TimeTable, window: &StitchWindow) -> Vec<&'a TimeRow> {
    table.rows.iter().filter(|r| window.contains(r.time)).collect()
}

/// Rate rows inside `window`, in table order.
pub fn trim_rate_rows<'a>(
    table: &'a RateTable,
    window: &StitchWindow,
) -> impl Iterator<Item = &'a crate::types::RateRow> {
    table.rows.iter().filter(move |r| window.contains(r.time))
}

fn append_time_table(
    combined: &mut TimeTable,
    table: &TimeTable,
    window: &StitchWindow,
    what: &'static str,
) -> ResultsResult<()> {
    if combined.columns.is_empty() && combined.rows.is_empty() {
        combined.columns = table.columns.clone();
    }

    // Column order may differ between runs; map by name.
    let mapping = combined
        .columns
        .iter()
        .map(|name| {
            table.column_index(name).ok_or_else(|| ResultsError::Shape {
                what: format!("{what} column '{name}' missing from segment output"),
            })
        })
        .collect::<ResultsResult<Vec<usize>>>()?;
    if table.columns.len() != combined.columns.len() {
        return Err(ResultsError::Shape {
            what: format!(
                "{what} segment has {} columns, combined table has {}",
                table.columns.len(),
                combined.columns.len()
            ),
        });
    }

    for row in trim_time_rows(table, window) {
        if let Some(last) = combined.rows.last()
            && (row.time < last.time || window.same(row.time, last.time))
        {
            return Err(ResultsError::Ordering {
                what: what.to_string(),
                previous: last.time,
                next: row.time,
            });
        }
        let values = mapping.iter().map(|&i| row.values[i]).collect();
        combined.push_row(row.time, values)?;
    }
    Ok(())
}

fn append_rate_table(combined: &mut RateTable, table: &RateTable, window: &StitchWindow) {
    if combined.columns.is_empty() {
        combined.columns = table.columns.clone();
    }
    combined
        .rows
        .extend(trim_rate_rows(table, window).cloned());
}

/// Append one segment's trimmed output to the combined tables.
pub fn append_segment(
    combined: &mut OutputTables,
    output: &OutputTables,
    window: &StitchWindow,
) -> ResultsResult<()> {
    append_time_table(&mut combined.species, &output.species, window, "species")?;
    append_time_table(
        &mut combined.environment,
        &output.environment,
        window,
        "environment",
    )?;
    append_rate_table(&mut combined.loss_rates, &output.loss_rates, window);
    append_rate_table(
        &mut combined.production_rates,
        &output.production_rates,
        window,
    );
    Ok(())
}

/// Requested outputs that never appeared in any segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingOutputs {
    pub species: Vec<String>,
    pub rates: Vec<String>,
}

impl MissingOutputs {
    pub fn is_empty(&self) -> bool {
        self.species.is_empty() && self.rates.is_empty()
    }
}

/// Keep only the requested species columns, in the requested order.
///
/// An empty request keeps the table as it is.
pub fn project_species(table: &TimeTable, requested: &[String]) -> (TimeTable, Vec<String>) {
    if requested.is_empty() {
        return (table.clone(), Vec::new());
    }
    let mut missing = Vec::new();
    let mut picks = Vec::new();
    for name in requested {
        match table.column_index(name) {
            Some(i) => picks.push((name.clone(), i)),
            None => missing.push(name.clone()),
        }
    }
    let projected = TimeTable {
        columns: picks.iter().map(|(n, _)| n.clone()).collect(),
        rows: table
            .rows
            .iter()
            .map(|r| TimeRow {
                time: r.time,
                values: picks.iter().map(|(_, i)| r.values[*i]).collect(),
            })
            .collect(),
    };
    (projected, missing)
}

/// Keep only rate rows for the requested species. An empty request keeps every row.
pub fn filter_rates(table: &RateTable, requested: &[String]) -> (RateTable, Vec<String>) {
    if requested.is_empty() {
        return (table.clone(), Vec::new());
    }
    let filtered = RateTable {
        columns: table.columns.clone(),
        rows: table
            .rows
            .iter()
            .filter(|r| requested.contains(&r.species))
            .cloned()
            .collect(),
    };
    let missing = requested
        .iter()
        .filter(|name| !table.rows.iter().any(|r| &r.species == *name))
        .cloned()
        .collect();
    (filtered, missing)
}

/// Reduce stitched tables to the caller's output selection.
///
/// A requested rate species counts as present if it appears in either rate table.
pub fn select_outputs(
    tables: OutputTables,
    species: &[String],
    rates: &[String],
) -> (OutputTables, MissingOutputs) {
    let (species_table, missing_species) = project_species(&tables.species, species);
    let (loss_rates, missing_loss) = filter_rates(&tables.loss_rates, rates);
    let (production_rates, missing_production) = filter_rates(&tables.production_rates, rates);
    let missing_rates = missing_loss
        .into_iter()
        .filter(|name| missing_production.contains(name))
        .collect();

    (
        OutputTables {
            species: species_table,
            loss_rates,
            production_rates,
            environment: tables.environment,
        },
        MissingOutputs {
            species: missing_species,
            rates: missing_rates,
        },
    )
}
