//! Pressure-vessel handlers — the boiler formula (Kesselformel).
//!
//! Thin-walled cylindrical shell under internal pressure:
//! `sigma = p * d / (2 * s)`. Any one of the four variables is solvable
//! from the other three. This is the batch-capable reference handler.

use super::solve::{
    expand_batch, is_batch, known_with_dimension, prepare, quantity_json, scalar_params,
};
use crate::registry::{FormulaHandler, HandlerMetadata, ParamSpec, SolvingMode};
use crate::repair::RepairedValue;
use crate::types::{Error, Result};
use crate::units::Dimension;
use crate::validation::validate_positive;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const VARIABLES: &[&str] = &["p", "d", "s", "sigma"];

/// Boiler-formula solver.
#[derive(Debug, Default)]
pub struct KesselformelHandler;

#[async_trait]
impl FormulaHandler for KesselformelHandler {
    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            name: "solve_kesselformel".to_string(),
            description: "Kesselformel für dünnwandige Zylinder: sigma = p·d / (2·s). \
                          Drei bekannte Größen bestimmen die vierte. \
                          Lösbare Variablen: [p, d, s, sigma]"
                .to_string(),
            tags: vec![
                "Druck".to_string(),
                "Festigkeit".to_string(),
                "symbolic".to_string(),
            ],
            category: "festigkeitslehre".to_string(),
            has_solving: SolvingMode::Symbolic,
            supports_batch: true,
            parameters: vec![
                ParamSpec {
                    name: "p".to_string(),
                    description: "Innendruck".to_string(),
                    example: "10 bar".to_string(),
                },
                ParamSpec {
                    name: "d".to_string(),
                    description: "Innendurchmesser".to_string(),
                    example: "100 mm".to_string(),
                },
                ParamSpec {
                    name: "s".to_string(),
                    description: "Wanddicke".to_string(),
                    example: "2.5 mm".to_string(),
                },
                ParamSpec {
                    name: "sigma".to_string(),
                    description: "Zulässige Spannung".to_string(),
                    example: "160 N/mm²".to_string(),
                },
            ],
            examples: vec![
                json!({ "p": "10 bar", "d": "100 mm", "sigma": "160 N/mm²", "s": "target" }),
                json!({
                    "p": ["10 bar", "16 bar"],
                    "d": ["100 mm", "100 mm"],
                    "sigma": ["160 N/mm²", "160 N/mm²"],
                    "s": ["target", "target"],
                }),
            ],
        }
    }

    async fn solve(&self, parameters: &BTreeMap<String, RepairedValue>) -> Result<Value> {
        if is_batch(parameters) {
            let sets = expand_batch(parameters)?;
            // Each index is an independent solve; a failing row becomes an
            // error entry instead of discarding the rest of the batch.
            let results: Vec<Value> = sets
                .iter()
                .enumerate()
                .map(|(index, set)| match solve_one(set) {
                    Ok(solved) => solved,
                    Err(e) => json!({ "error": format!("batch index {}: {}", index, e) }),
                })
                .collect();
            return Ok(json!({ "batch": true, "results": results }));
        }

        let scalars = scalar_params(parameters)?;
        solve_one(&scalars)
    }
}

fn solve_one(scalars: &BTreeMap<String, String>) -> Result<Value> {
    let input = prepare(scalars)?;

    for name in input.knowns.keys() {
        if !VARIABLES.contains(&name.as_str()) {
            return Err(Error::computation(format!(
                "unknown parameter '{}', solvable: {}",
                name,
                VARIABLES.join(", ")
            )));
        }
    }
    if input.knowns.len() != 3 {
        return Err(Error::computation(format!(
            "boiler formula needs exactly three known values among p, d, s, sigma \
             ({} given)",
            input.knowns.len()
        )));
    }

    // The target may be declared explicitly or inferred as the missing one.
    let target = VARIABLES
        .iter()
        .find(|v| !input.knowns.contains_key(**v))
        .copied()
        .ok_or_else(|| Error::computation("no unknown left to solve for"))?;
    if let Some(declared) = input.targets.first() {
        if declared != target {
            return Err(Error::computation(format!(
                "declared target '{}' conflicts with missing variable '{}'",
                declared, target
            )));
        }
    }

    let get = |name: &str, dim: Dimension| -> Result<f64> {
        let value = known_with_dimension(&input, name, dim)?;
        validate_positive(value.si_value, name)?;
        Ok(value.si_value)
    };

    let (si_value, dimension) = match target {
        "sigma" => {
            let (p, d, s) = (
                get("p", Dimension::Pressure)?,
                get("d", Dimension::Length)?,
                get("s", Dimension::Length)?,
            );
            (p * d / (2.0 * s), Dimension::Pressure)
        }
        "p" => {
            let (sigma, d, s) = (
                get("sigma", Dimension::Pressure)?,
                get("d", Dimension::Length)?,
                get("s", Dimension::Length)?,
            );
            (2.0 * s * sigma / d, Dimension::Pressure)
        }
        "d" => {
            let (sigma, p, s) = (
                get("sigma", Dimension::Pressure)?,
                get("p", Dimension::Pressure)?,
                get("s", Dimension::Length)?,
            );
            (2.0 * s * sigma / p, Dimension::Length)
        }
        "s" => {
            let (sigma, p, d) = (
                get("sigma", Dimension::Pressure)?,
                get("p", Dimension::Pressure)?,
                get("d", Dimension::Length)?,
            );
            (p * d / (2.0 * sigma), Dimension::Length)
        }
        other => {
            return Err(Error::internal(format!("unexpected target '{}'", other)));
        }
    };

    // Display the result in a unit family the caller already used for the
    // same dimension, when one exists.
    let display_unit = input
        .knowns
        .values()
        .find(|v| crate::units::lookup(&v.original_unit).map(|(dim, _)| dim) == Some(dimension))
        .map(|v| v.original_unit.clone())
        .unwrap_or_else(|| dimension.base_unit().to_string());

    let mut given = serde_json::Map::new();
    for (name, value) in scalars {
        if value != crate::units::TARGET {
            given.insert(name.clone(), Value::String(value.clone()));
        }
    }

    Ok(json!({
        "solved": target,
        (target): quantity_json(si_value, dimension, &display_unit),
        "given": given,
    }))
}
