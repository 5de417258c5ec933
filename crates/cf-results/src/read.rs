//! Readers for the simulator's whitespace-delimited output tables.

use crate::types::{OutputTables, RateRow, RateTable, TimeTable};
use crate::{ResultsError, ResultsResult};
use std::path::{Path, PathBuf};

pub const SPECIES_FILE: &str = "speciesConcentrations.output";
pub const LOSS_RATES_FILE: &str = "lossRates.output";
pub const PRODUCTION_RATES_FILE: &str = "productionRates.output";
pub const ENVIRONMENT_FILE: &str = "environmentVariables.output";

/// Parse a real the way Fortran writes it: accepts `1.0E+03`, `1.0D+03` and the
/// exponent-letter-less `1.0-100` that appears once exponents reach three digits.
pub fn parse_real(token: &str) -> Option<f64> {
    if let Ok(v) = token.parse::<f64>() {
        return Some(v);
    }
    let normalized = token.replace(['D', 'd'], "E");
    if let Ok(v) = normalized.parse::<f64>() {
        return Some(v);
    }
    let bytes = normalized.as_bytes();
    let split = (1..bytes.len()).rev().find(|&i| {
        matches!(bytes[i], b'+' | b'-') && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.')
    })?;
    format!("{}E{}", &normalized[..split], &normalized[split..])
        .parse::<f64>()
        .ok()
}

fn parse_error(source: &Path, line: usize, what: impl Into<String>) -> ResultsError {
    ResultsError::Parse {
        path: source.to_path_buf(),
        line,
        what: what.into(),
    }
}

fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
}

/// Parse a time-indexed table; the first column is the time index.
pub fn parse_time_table(text: &str, source: &Path) -> ResultsResult<TimeTable> {
    let mut lines = content_lines(text);
    let (_, header) = lines
        .next()
        .ok_or_else(|| parse_error(source, 1, "missing header row"))?;
    let columns: Vec<String> = header.split_whitespace().skip(1).map(String::from).collect();

    let mut table = TimeTable::new(columns);
    for (line_no, line) in lines {
        let mut cells = line.split_whitespace();
        let time_cell = cells.next().unwrap_or_default();
        let time = parse_real(time_cell)
            .ok_or_else(|| parse_error(source, line_no, format!("bad time value '{time_cell}'")))?;
        let values = cells
            .map(|c| {
                parse_real(c)
                    .ok_or_else(|| parse_error(source, line_no, format!("bad value '{c}'")))
            })
            .collect::<ResultsResult<Vec<f64>>>()?;
        table
            .push_row(time, values)
            .map_err(|e| parse_error(source, line_no, e.to_string()))?;
    }
    Ok(table)
}

/// Parse a rate table. Surplus trailing cells are folded into the last column.
pub fn parse_rate_table(text: &str, source: &Path) -> ResultsResult<RateTable> {
    let mut lines = content_lines(text);
    let (_, header) = lines
        .next()
        .ok_or_else(|| parse_error(source, 1, "missing header row"))?;
    let columns: Vec<String> = header.split_whitespace().map(String::from).collect();
    let find = |name: &str| {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| parse_error(source, 1, format!("missing '{name}' column")))
    };
    let time_idx = find(RateTable::TIME_COLUMN)?;
    let species_idx = find(RateTable::SPECIES_COLUMN)?;

    let mut table = RateTable::new(columns);
    for (line_no, line) in lines {
        let mut cells: Vec<String> = line.split_whitespace().map(String::from).collect();
        let width = table.columns.len();
        if cells.len() < width {
            return Err(parse_error(
                source,
                line_no,
                format!("expected {width} cells, found {}", cells.len()),
            ));
        }
        if cells.len() > width {
            let tail = cells.split_off(width - 1).join(" ");
            cells.push(tail);
        }
        let time = parse_real(&cells[time_idx]).ok_or_else(|| {
            parse_error(source, line_no, format!("bad time value '{}'", cells[time_idx]))
        })?;
        table.rows.push(RateRow {
            time,
            species: cells[species_idx].clone(),
            cells,
        });
    }
    Ok(table)
}

fn read_file(path: &Path) -> ResultsResult<String> {
    if !path.exists() {
        return Err(ResultsError::MissingOutput {
            path: path.to_path_buf(),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

pub fn read_time_table(path: &Path) -> ResultsResult<TimeTable> {
    parse_time_table(&read_file(path)?, path)
}

pub fn read_rate_table(path: &Path) -> ResultsResult<RateTable> {
    parse_rate_table(&read_file(path)?, path)
}

/// Load all four output tables from a simulator output directory.
pub fn read_output_tables(output_dir: &Path) -> ResultsResult<OutputTables> {
    let file = |name: &str| -> PathBuf { output_dir.join(name) };
    Ok(OutputTables {
        species: read_time_table(&file(SPECIES_FILE))?,
        loss_rates: read_rate_table(&file(LOSS_RATES_FILE))?,
        production_rates: read_rate_table(&file(PRODUCTION_RATES_FILE))?,
        environment: read_time_table(&file(ENVIRONMENT_FILE))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_real_variants() {
        assert_eq!(parse_real("1.5"), Some(1.5));
        assert_eq!(parse_real("0.100000E+04"), Some(1000.0));
        assert_eq!(parse_real("1.0D-03"), Some(1e-3));
        assert_eq!(parse_real("0.123456-100"), Some(0.123456e-100));
        assert_eq!(parse_real("-0.5+101"), Some(-0.5e101));
        assert_eq!(parse_real("abc"), None);
        assert_eq!(parse_real("-"), None);
    }

    #[test]
    fn parses_species_table() {
        let text = "   t   O3   NO\n 0.0E+00 1.0E+11 2.0E+10\n 6.0E+01 9.0E+10 1.0-100\n";
        let table = parse_time_table(text, Path::new("species")).unwrap();
        assert_eq!(table.columns, vec!["O3", "NO"]);
        assert_eq!(table.times(), vec![0.0, 60.0]);
        assert_eq!(table.rows[1].values[1], 1.0e-100);
    }

    #[test]
    fn rejects_ragged_rows() {
        let text = "t A B\n0 1 2\n10 1\n";
        let err = parse_time_table(text, Path::new("species")).unwrap_err();
        assert!(matches!(err, ResultsError::Parse { line: 3, .. }));
    }

    #[test]
    fn parses_rate_table_and_keeps_cells() {
        let text = "time speciesNumber speciesName reactionNumber rate reaction\n\
                    0.6E+02 1 O3 3 0.1E+05 O3=O1D\n\
                    0.6E+02 2 NO 4 0.2E+05 NO+O3=NO2 extra\n";
        let table = parse_rate_table(text, Path::new("loss")).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].time, 60.0);
        assert_eq!(table.rows[1].species, "NO");
        assert_eq!(table.rows[1].cells[5], "NO+O3=NO2 extra");
        assert_eq!(table.species(), vec!["O3", "NO"]);
    }

    #[test]
    fn rate_table_requires_species_column() {
        let err = parse_rate_table("time rate\n0 1\n", Path::new("loss")).unwrap_err();
        assert!(err.to_string().contains("speciesName"));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_output_tables(dir.path()).unwrap_err();
        assert!(matches!(err, ResultsError::MissingOutput { .. }));
    }
}
