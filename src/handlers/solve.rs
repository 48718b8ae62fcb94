//! Generic solve dispatch — shared scaffolding for every formula handler.
//!
//! Handlers all follow the same pattern: split repaired parameters into
//! unit-validated knowns and target names, solve the closed form, then
//! re-express results in human-scaled units. Batch expansion turns
//! parallel arrays into independent per-index parameter sets.

use crate::repair::RepairedValue;
use crate::types::{Error, Result};
use crate::units::{optimize_display, require_all_units, Dimension, Quantity, UnitValue, TARGET};
use serde_json::Value;
use std::collections::BTreeMap;

/// Unit-validated knowns plus the declared targets of one solve request.
#[derive(Debug)]
pub struct SolveInput {
    pub knowns: BTreeMap<String, UnitValue>,
    pub targets: Vec<String>,
}

/// Collapse a repaired parameter map into scalar strings.
///
/// Handlers without batch support call this first; a list value is a
/// usage fault for them.
pub fn scalar_params(
    parameters: &BTreeMap<String, RepairedValue>,
) -> Result<BTreeMap<String, String>> {
    let mut scalars = BTreeMap::new();
    for (name, value) in parameters {
        match value {
            RepairedValue::Scalar(s) => {
                scalars.insert(name.clone(), s.clone());
            }
            RepairedValue::List(_) => {
                return Err(Error::computation(format!(
                    "parameter '{}' is a list but this tool does not support batch mode",
                    name
                )));
            }
        }
    }
    Ok(scalars)
}

/// Expand batch parameters into per-index scalar maps.
///
/// Every value must be a list, and all lists must have equal length;
/// mixing scalars and lists in one call is invalid.
pub fn expand_batch(
    parameters: &BTreeMap<String, RepairedValue>,
) -> Result<Vec<BTreeMap<String, String>>> {
    let mut expected_len: Option<usize> = None;
    for (name, value) in parameters {
        let RepairedValue::List(items) = value else {
            return Err(Error::computation(format!(
                "batch call mixes scalar and list values (parameter '{}' is scalar)",
                name
            )));
        };
        match expected_len {
            None => expected_len = Some(items.len()),
            Some(len) if len != items.len() => {
                return Err(Error::computation(format!(
                    "batch lists must have equal length: '{}' has {} entries, expected {}",
                    name,
                    items.len(),
                    len
                )));
            }
            Some(_) => {}
        }
    }

    let len = expected_len.unwrap_or(0);
    let mut sets = Vec::with_capacity(len);
    for index in 0..len {
        let mut set = BTreeMap::new();
        for (name, value) in parameters {
            if let RepairedValue::List(items) = value {
                set.insert(name.clone(), items[index].clone());
            }
        }
        sets.push(set);
    }
    Ok(sets)
}

/// True if any parameter value is a list (the call is batch-shaped).
pub fn is_batch(parameters: &BTreeMap<String, RepairedValue>) -> bool {
    parameters
        .values()
        .any(|v| matches!(v, RepairedValue::List(_)))
}

/// Split a scalar parameter set into unit-validated knowns and targets.
pub fn prepare(parameters: &BTreeMap<String, String>) -> Result<SolveInput> {
    let targets: Vec<String> = parameters
        .iter()
        .filter(|(_, v)| v.as_str() == TARGET)
        .map(|(k, _)| k.clone())
        .collect();
    let knowns = require_all_units(parameters)?;
    Ok(SolveInput { knowns, targets })
}

/// Fetch a known and check its physical dimension.
pub fn known_with_dimension<'a>(
    input: &'a SolveInput,
    name: &str,
    expected: Dimension,
) -> Result<&'a UnitValue> {
    let value = input.knowns.get(name).ok_or_else(|| {
        Error::computation(format!("missing required known value '{}'", name))
    })?;
    let actual = crate::units::lookup(&value.original_unit).map(|(dim, _)| dim);
    if actual != Some(expected) {
        return Err(Error::units(format!(
            "parameter '{}' must be a {:?} value, got '{}' (example: '{}')",
            name,
            expected,
            value.original_unit,
            example_for(expected)
        )));
    }
    Ok(value)
}

fn example_for(dim: Dimension) -> &'static str {
    match dim {
        Dimension::Length => "5.2 mm",
        Dimension::Area => "20 cm²",
        Dimension::Volume => "1.5 l",
        Dimension::Pressure => "10 bar",
        Dimension::Force => "2 kN",
        Dimension::Angle => "45 °",
    }
}

/// Render an SI magnitude as `{value, unit}`, display-optimized toward the
/// unit the caller originally wrote.
pub fn quantity_json(si_value: f64, dimension: Dimension, original_unit: &str) -> Value {
    let base = Quantity::new(si_value, dimension.base_unit(), Some(dimension));
    let shown = optimize_display(&base, original_unit);
    serde_json::json!({ "value": shown.value, "unit": shown.unit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scalar(s: &str) -> RepairedValue {
        RepairedValue::Scalar(s.to_string())
    }

    fn list(items: &[&str]) -> RepairedValue {
        RepairedValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn scalar_params_rejects_lists() {
        let mut params = BTreeMap::new();
        params.insert("p".to_string(), list(&["10 bar"]));
        assert!(scalar_params(&params).is_err());
    }

    #[test]
    fn expand_batch_per_index_sets() {
        let mut params = BTreeMap::new();
        params.insert("p".to_string(), list(&["10 bar", "12 bar"]));
        params.insert("sigma".to_string(), list(&["target", "target"]));

        let sets = expand_batch(&params).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0]["p"], "10 bar");
        assert_eq!(sets[1]["p"], "12 bar");
        assert_eq!(sets[1]["sigma"], "target");
    }

    #[test]
    fn expand_batch_rejects_mixed_and_ragged() {
        let mut mixed = BTreeMap::new();
        mixed.insert("p".to_string(), list(&["10 bar"]));
        mixed.insert("d".to_string(), scalar("100 mm"));
        assert!(expand_batch(&mixed).is_err());

        let mut ragged = BTreeMap::new();
        ragged.insert("p".to_string(), list(&["10 bar", "12 bar"]));
        ragged.insert("d".to_string(), list(&["100 mm"]));
        assert!(expand_batch(&ragged).is_err());
    }

    #[test]
    fn prepare_splits_targets_from_knowns() {
        let mut params = BTreeMap::new();
        params.insert("radius".to_string(), "5 cm".to_string());
        params.insert("perimeter".to_string(), "target".to_string());

        let input = prepare(&params).unwrap();
        assert_eq!(input.targets, vec!["perimeter"]);
        assert_eq!(input.knowns.len(), 1);
        assert_eq!(input.knowns["radius"].si_value, 0.05);
    }

    #[test]
    fn known_with_dimension_checks_family() {
        let mut params = BTreeMap::new();
        params.insert("p".to_string(), "10 bar".to_string());
        let input = prepare(&params).unwrap();

        assert!(known_with_dimension(&input, "p", Dimension::Pressure).is_ok());
        assert!(matches!(
            known_with_dimension(&input, "p", Dimension::Length),
            Err(Error::Units(_))
        ));
    }

    #[test]
    fn quantity_json_prefers_original_unit() {
        let value = quantity_json(0.1, Dimension::Length, "cm");
        assert_eq!(value["unit"], "cm");
        assert_eq!(value["value"], 10.0);
    }
}
