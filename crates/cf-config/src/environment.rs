//! Resolution of the environment-variable table.
//!
//! The simulator expects the ten standard variables in a fixed order, followed by
//! any custom variables. Unset standard variables take their default unless a
//! constraint table exists for them, in which case they become `CONSTRAINED`.

use crate::schema::{EnvValue, TimePoint};
use crate::validate::ValidationError;
use std::collections::BTreeMap;

pub const DEFAULT_ENVIRONMENT: [(&str, &str); 10] = [
    ("TEMP", "298.15"),
    ("PRESS", "1013.25"),
    ("RH", "NOTUSED"),
    ("H2O", "3.91e+17"),
    ("DEC", "0.41"),
    ("BLHEIGHT", "NOTUSED"),
    ("DILUTE", "NOTUSED"),
    ("JFAC", "NOTUSED"),
    ("ROOF", "OPEN"),
    ("ASA", "NOTUSED"),
];

/// Environment variable whose constraint table lives with the photolysis constraints.
pub const PHOTOLYSIS_ENV_VARIABLE: &str = "JFAC";

fn is_standard(name: &str) -> bool {
    DEFAULT_ENVIRONMENT.iter().any(|(k, _)| *k == name)
}

/// Produce the ordered `(name, value)` list written to `environmentVariables.config`.
pub fn resolve_environment(
    values: &BTreeMap<String, EnvValue>,
    constraints: &BTreeMap<String, Vec<TimePoint>>,
) -> Result<Vec<(String, EnvValue)>, ValidationError> {
    let mut resolved: Vec<(String, EnvValue)> = DEFAULT_ENVIRONMENT
        .iter()
        .map(|(name, default)| {
            let value = match values.get(*name) {
                Some(v) => v.clone(),
                None if constraints.contains_key(*name) => EnvValue::constrained(),
                None => EnvValue::text(default),
            };
            (name.to_string(), value)
        })
        .collect();

    for (name, value) in values {
        if !is_standard(name) {
            resolved.push((name.clone(), value.clone()));
        }
    }
    for name in constraints.keys() {
        if !resolved.iter().any(|(k, _)| k == name) {
            resolved.push((name.clone(), EnvValue::constrained()));
        }
    }

    for (name, value) in &resolved {
        let has_table = constraints.contains_key(name);
        if has_table && !value.is_constrained() {
            return Err(ValidationError::InvalidValue {
                field: format!("environment.{name}"),
                value: value.to_string(),
                reason: "a constraint table is provided, so the value must be CONSTRAINED"
                    .to_string(),
            });
        }
        if !has_table && value.is_constrained() {
            return Err(ValidationError::MissingReference {
                id: name.clone(),
                context: "environment_constraints".to_string(),
            });
        }
    }

    Ok(resolved)
}
