//! Elementary geometry handlers — circle and rectangle.

use super::solve::{known_with_dimension, prepare, quantity_json, scalar_params, SolveInput};
use crate::registry::{FormulaHandler, HandlerMetadata, ParamSpec, SolvingMode};
use crate::repair::RepairedValue;
use crate::types::{Error, Result};
use crate::units::{lookup, Dimension};
use crate::validation::validate_positive;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::f64::consts::PI;

fn param(name: &str, description: &str, example: &str) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        description: description.to_string(),
        example: example.to_string(),
    }
}

/// Area display unit matching a length unit (`cm` → `cm²`), when the table
/// knows it.
fn area_unit_for(length_unit: &str) -> String {
    let squared = format!("{}²", length_unit);
    if lookup(&squared).is_some() {
        squared
    } else {
        "m²".to_string()
    }
}

// =============================================================================
// Circle
// =============================================================================

/// Circle solver: one known among radius, diameter, perimeter, area derives
/// all the others.
#[derive(Debug, Default)]
pub struct KreisUmfangHandler;

#[async_trait]
impl FormulaHandler for KreisUmfangHandler {
    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            name: "solve_kreis_umfang".to_string(),
            description: "Kreisberechnung: aus einer bekannten Größe werden Radius, \
                          Durchmesser, Umfang und Fläche bestimmt. \
                          Lösbare Variablen: [radius, diameter, perimeter, area]"
                .to_string(),
            tags: vec![
                "elementar".to_string(),
                "Umfang".to_string(),
                "Fläche".to_string(),
                "symbolic".to_string(),
            ],
            category: "geometrie".to_string(),
            has_solving: SolvingMode::Symbolic,
            supports_batch: false,
            parameters: vec![
                param("radius", "Kreisradius", "5 cm"),
                param("diameter", "Durchmesser", "10 cm"),
                param("perimeter", "Umfang", "31.4 cm"),
                param("area", "Kreisfläche", "78.5 cm²"),
            ],
            examples: vec![
                json!({ "radius": "5 cm" }),
                json!({ "area": "78.5 cm²", "radius": "target" }),
            ],
        }
    }

    async fn solve(&self, parameters: &BTreeMap<String, RepairedValue>) -> Result<Value> {
        let scalars = scalar_params(parameters)?;
        let input = prepare(&scalars)?;

        if input.knowns.len() != 1 {
            return Err(Error::computation(format!(
                "circle solve needs exactly one known value among radius, diameter, \
                 perimeter, area ({} given)",
                input.knowns.len()
            )));
        }

        #[allow(clippy::unwrap_used)] // len checked above
        let (known_name, known) = input.knowns.iter().next().unwrap();

        let radius_si = match known_name.as_str() {
            "radius" => {
                known_with_dimension(&input, known_name, Dimension::Length)?;
                known.si_value
            }
            "diameter" => {
                known_with_dimension(&input, known_name, Dimension::Length)?;
                known.si_value / 2.0
            }
            "perimeter" => {
                known_with_dimension(&input, known_name, Dimension::Length)?;
                known.si_value / (2.0 * PI)
            }
            "area" => {
                known_with_dimension(&input, known_name, Dimension::Area)?;
                (known.si_value / PI).sqrt()
            }
            other => {
                return Err(Error::computation(format!(
                    "unknown parameter '{}', solvable: radius, diameter, perimeter, area",
                    other
                )));
            }
        };
        validate_positive(known.si_value, known_name)?;

        // Dimension mismatches fall back to the display ladder, so passing
        // the caller's unit for every output family is safe.
        let length_unit = known.original_unit.clone();
        let area_unit = if known_name == "area" {
            known.original_unit.clone()
        } else {
            area_unit_for(&length_unit)
        };
        let given = scalars.get(known_name).cloned().unwrap_or_default();

        Ok(json!({
            "radius": quantity_json(radius_si, Dimension::Length, &length_unit),
            "diameter": quantity_json(2.0 * radius_si, Dimension::Length, &length_unit),
            "perimeter": quantity_json(2.0 * PI * radius_si, Dimension::Length, &length_unit),
            "area": quantity_json(PI * radius_si * radius_si, Dimension::Area, &area_unit),
            "given": { (known_name.clone()): given },
        }))
    }
}

// =============================================================================
// Rectangle
// =============================================================================

/// Rectangle solver: any two independent knowns among side a, side b, area,
/// perimeter solve the rest. The (area, perimeter) case goes through the
/// quadratic for the side lengths.
#[derive(Debug, Default)]
pub struct RechteckHandler;

#[async_trait]
impl FormulaHandler for RechteckHandler {
    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            name: "solve_rechteck".to_string(),
            description: "Rechteckberechnung: aus zwei bekannten Größen werden die \
                          Seiten, die Fläche und der Umfang bestimmt. \
                          Lösbare Variablen: [a, b, area, perimeter]"
                .to_string(),
            tags: vec![
                "elementar".to_string(),
                "Fläche".to_string(),
                "symbolic".to_string(),
            ],
            category: "geometrie".to_string(),
            has_solving: SolvingMode::SymbolicNumeric,
            supports_batch: false,
            parameters: vec![
                param("a", "Seite a", "4 cm"),
                param("b", "Seite b", "3 cm"),
                param("area", "Fläche", "12 cm²"),
                param("perimeter", "Umfang", "14 cm"),
            ],
            examples: vec![
                json!({ "a": "4 cm", "b": "3 cm" }),
                json!({ "area": "12 cm²", "perimeter": "14 cm" }),
            ],
        }
    }

    async fn solve(&self, parameters: &BTreeMap<String, RepairedValue>) -> Result<Value> {
        let scalars = scalar_params(parameters)?;
        let input = prepare(&scalars)?;

        if input.knowns.len() != 2 {
            return Err(Error::computation(format!(
                "rectangle solve needs exactly two known values among a, b, area, \
                 perimeter ({} given)",
                input.knowns.len()
            )));
        }
        for name in input.knowns.keys() {
            if !matches!(name.as_str(), "a" | "b" | "area" | "perimeter") {
                return Err(Error::computation(format!(
                    "unknown parameter '{}', solvable: a, b, area, perimeter",
                    name
                )));
            }
        }

        let (side_a, side_b) = solve_rectangle_sides(&input)?;
        validate_positive(side_a, "a")?;
        validate_positive(side_b, "b")?;

        let length_unit = input
            .knowns
            .iter()
            .find(|(name, _)| matches!(name.as_str(), "a" | "b" | "perimeter"))
            .map(|(_, v)| v.original_unit.clone())
            .unwrap_or_else(|| "m".to_string());
        let area_unit = input
            .knowns
            .get("area")
            .map(|v| v.original_unit.clone())
            .unwrap_or_else(|| area_unit_for(&length_unit));

        Ok(json!({
            "a": quantity_json(side_a, Dimension::Length, &length_unit),
            "b": quantity_json(side_b, Dimension::Length, &length_unit),
            "area": quantity_json(side_a * side_b, Dimension::Area, &area_unit),
            "perimeter": quantity_json(2.0 * (side_a + side_b), Dimension::Length, &length_unit),
        }))
    }
}

/// Side lengths in SI from any valid pair of knowns.
fn solve_rectangle_sides(input: &SolveInput) -> Result<(f64, f64)> {
    let length = |name: &str| -> Result<f64> {
        Ok(known_with_dimension(input, name, Dimension::Length)?.si_value)
    };
    let has = |name: &str| input.knowns.contains_key(name);

    if has("a") && has("b") {
        return Ok((length("a")?, length("b")?));
    }
    if has("area") && has("perimeter") {
        let area = known_with_dimension(input, "area", Dimension::Area)?.si_value;
        let half_perimeter = length("perimeter")? / 2.0;
        let discriminant = half_perimeter * half_perimeter - 4.0 * area;
        if discriminant < 0.0 {
            return Err(Error::computation(
                "no rectangle exists with this area and perimeter (negative discriminant)",
            ));
        }
        let root = discriminant.sqrt();
        return Ok(((half_perimeter + root) / 2.0, (half_perimeter - root) / 2.0));
    }
    for side in ["a", "b"] {
        if has(side) && has("area") {
            let s = length(side)?;
            let area = known_with_dimension(input, "area", Dimension::Area)?.si_value;
            validate_positive(s, side)?;
            let computed = area / s;
            return Ok(if side == "a" { (s, computed) } else { (computed, s) });
        }
        if has(side) && has("perimeter") {
            let s = length(side)?;
            let computed = length("perimeter")? / 2.0 - s;
            return Ok(if side == "a" { (s, computed) } else { (computed, s) });
        }
    }

    Err(Error::computation(
        "unsolvable configuration: give two of a, b, area, perimeter",
    ))
}
