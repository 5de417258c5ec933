//! Species extraction from FACSIMILE (`.fac`) mechanism files.
//!
//! Only reaction statements are inspected:
//!
//! ```text
//! % 5.6D-34*N2*(TEMP/300)@-2.6*O2 : O = O3 ;
//! ```
//!
//! The equation sits between the first `:` and the terminating `;`. Rate
//! coefficient definitions, `RO2` sums and `*` comment statements are skipped.

use crate::{ConfigError, ConfigResult};
use std::collections::HashSet;
use std::path::Path;

/// Every species named in the mechanism's reactions, in order of first appearance.
pub fn species_from_mechanism(path: &Path) -> ConfigResult<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Mechanism {
        path: path.to_path_buf(),
        what: e.to_string(),
    })?;
    let species = parse_species(&text);
    if species.is_empty() {
        return Err(ConfigError::Mechanism {
            path: path.to_path_buf(),
            what: "no reaction statements found".to_string(),
        });
    }
    tracing::debug!(path = %path.display(), count = species.len(), "read mechanism species");
    Ok(species)
}

/// Parse species names out of mechanism text.
pub fn parse_species(text: &str) -> Vec<String> {
    let text = strip_brace_comments(text);
    let mut seen = HashSet::new();
    let mut species = Vec::new();

    for statement in text.split(';') {
        let statement = statement.trim();
        let Some(body) = statement.strip_prefix('%') else {
            continue;
        };
        let Some((_, equation)) = body.split_once(':') else {
            continue;
        };
        let (lhs, rhs) = equation.split_once('=').unwrap_or((equation, ""));
        for term in lhs.split('+').chain(rhs.split('+')) {
            if let Some(name) = species_name(term)
                && seen.insert(name.to_string())
            {
                species.push(name.to_string());
            }
        }
    }

    species
}

/// Strip a leading stoichiometric coefficient (`2 NO2` -> `NO2`).
fn species_name(term: &str) -> Option<&str> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    match term.split_once(char::is_whitespace) {
        Some((coefficient, rest)) if coefficient.parse::<f64>().is_ok() => {
            let rest = rest.trim();
            (!rest.is_empty()).then_some(rest)
        }
        _ => Some(term),
    }
}

fn strip_brace_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}
