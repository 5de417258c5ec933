//! Result table types.

use crate::{ResultsError, ResultsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Species name -> concentration at one model time.
pub type Concentrations = BTreeMap<String, f64>;

/// Time-indexed table: one row per output time, one column per species or
/// environment variable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeTable {
    pub columns: Vec<String>,
    pub rows: Vec<TimeRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRow {
    pub time: f64,
    pub values: Vec<f64>,
}

impl TimeTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, time: f64, values: Vec<f64>) -> ResultsResult<()> {
        if values.len() != self.columns.len() {
            return Err(ResultsError::Shape {
                what: format!(
                    "row at t={time} has {} values for {} columns",
                    values.len(),
                    self.columns.len()
                ),
            });
        }
        self.rows.push(TimeRow { time, values });
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn times(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.time).collect()
    }

    pub fn column(&self, name: &str) -> Option<Vec<(f64, f64)>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| (r.time, r.values[idx])).collect())
    }

    /// Column-name keyed view of one row.
    pub fn row_state(&self, row: &TimeRow) -> Concentrations {
        self.columns
            .iter()
            .cloned()
            .zip(row.values.iter().copied())
            .collect()
    }

    /// Row whose time is closest to `time`. Ties go to the row that comes first.
    pub fn nearest_row(&self, time: f64) -> Option<&TimeRow> {
        let mut best: Option<(&TimeRow, f64)> = None;
        for row in &self.rows {
            let distance = (row.time - time).abs();
            match best {
                Some((_, d)) if distance >= d => {}
                _ => best = Some((row, distance)),
            }
        }
        best.map(|(row, _)| row)
    }

    /// State at the row nearest to `time`.
    pub fn state_near(&self, time: f64) -> Option<Concentrations> {
        self.nearest_row(time).map(|row| self.row_state(row))
    }
}

/// Per-reaction rate table (`lossRates.output` / `productionRates.output`).
///
/// Cells are kept verbatim; only `time` and `speciesName` are interpreted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RateTable {
    pub columns: Vec<String>,
    pub rows: Vec<RateRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRow {
    pub time: f64,
    pub species: String,
    pub cells: Vec<String>,
}

impl RateTable {
    pub const TIME_COLUMN: &'static str = "time";
    pub const SPECIES_COLUMN: &'static str = "speciesName";

    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct species names, in order of first appearance.
    pub fn species(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.species.as_str()) {
                out.push(&row.species);
            }
        }
        out
    }
}

/// The four tables produced by one simulator run, or stitched across many.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputTables {
    pub species: TimeTable,
    pub loss_rates: RateTable,
    pub production_rates: RateTable,
    pub environment: TimeTable,
}
