//! Concentration carry-over between consecutive segments.

use cf_config::NOX_SPECIES;
use cf_results::Concentrations;
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

pub const NO: &str = "NO";
pub const NO2: &str = "NO2";

/// A change applied to the carried-over state at a segment boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Perturbation {
    /// Set one species to `target`.
    Species { name: String, target: f64 },
    /// Move NO + NO2 to `target`, keeping their ratio.
    Nox { target: f64 },
}

impl Perturbation {
    /// Perturbations for an injection event's targets. Direct species come first
    /// so that a composite NOx target sees any NO or NO2 set in the same event.
    pub fn from_targets(targets: &BTreeMap<String, f64>) -> Vec<Perturbation> {
        let mut out: Vec<Perturbation> = targets
            .iter()
            .filter(|(name, _)| name.as_str() != NOX_SPECIES)
            .map(|(name, target)| Perturbation::Species {
                name: name.clone(),
                target: *target,
            })
            .collect();
        if let Some(target) = targets.get(NOX_SPECIES) {
            out.push(Perturbation::Nox { target: *target });
        }
        out
    }
}

/// Initial state of the next segment: the previous segment's state at the
/// boundary with `perturbations` applied.
pub fn compute_next_initial_state(
    previous: &Concentrations,
    perturbations: &[Perturbation],
    time: f64,
) -> AppResult<Concentrations> {
    let mut state = previous.clone();
    for p in perturbations {
        if let Perturbation::Species { name, target } = p {
            state.insert(name.clone(), *target);
        }
    }
    for p in perturbations {
        if let Perturbation::Nox { target } = p {
            apply_nox(&mut state, *target, time)?;
        }
    }
    ensure_state_finite(&state, time)?;
    Ok(state)
}

/// Initial state of the first NOx-constrained segment.
///
/// With neither NO nor NO2 supplied the target is split evenly; otherwise the
/// supplied values are scaled like any other boundary. Supplied NO and NO2 are
/// therefore not kept as given: the first segment already starts on the target.
pub fn bootstrap_nox(
    initial: &Concentrations,
    target: f64,
    time: f64,
) -> AppResult<Concentrations> {
    let mut state = initial.clone();
    if !state.contains_key(NO) && !state.contains_key(NO2) {
        state.insert(NO.to_string(), target / 2.0);
        state.insert(NO2.to_string(), target / 2.0);
    } else {
        apply_nox(&mut state, target, time)?;
    }
    ensure_state_finite(&state, time)?;
    Ok(state)
}

/// Re-partition NO and NO2 so they sum to `target` in their current ratio.
fn apply_nox(state: &mut Concentrations, target: f64, time: f64) -> AppResult<()> {
    let no = state.get(NO).copied().unwrap_or(0.0);
    let no2 = state.get(NO2).copied().unwrap_or(0.0);
    let total = no + no2;
    if !(total > 0.0) {
        return Err(AppError::DegenerateState {
            time,
            what: format!("NO + NO2 is {total}; the NO/NO2 ratio is undefined"),
        });
    }

    // no + (target - total) * no / total, without the cancellation
    let scale = target / total;
    state.insert(NO.to_string(), no * scale);
    state.insert(NO2.to_string(), no2 * scale);
    Ok(())
}

fn ensure_state_finite(state: &Concentrations, time: f64) -> AppResult<()> {
    match state.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, value)) => Err(AppError::DegenerateState {
            time,
            what: format!("{name} became {value}"),
        }),
        None => Ok(()),
    }
}
