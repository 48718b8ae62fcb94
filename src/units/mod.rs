//! Unit interpreter — "value unit" parsing, SI conversion, display scaling.
//!
//! Every physical parameter arrives as a string like `"5.2 mm"` or
//! `"160 N/mm²"`. Parsing and conversion fail closed (a value without a
//! recognizable unit is a units error); display optimization never fails
//! and degrades to the unconverted quantity.

mod tables;

pub use tables::{display_ladder, lookup, Dimension, UNIT_TABLE};

use crate::types::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Sentinel marking the unknown a handler must solve for.
pub const TARGET: &str = "target";

/// A magnitude in a coherent base-unit system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<Dimension>,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>, dimension: Option<Dimension>) -> Self {
        Self {
            value,
            unit: unit.into(),
            dimension,
        }
    }
}

/// A validated parameter value: SI magnitude plus the unit the caller wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitValue {
    pub si_value: f64,
    pub si_unit: String,
    pub original_unit: String,
}

fn value_unit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // sign, digits with optional decimal (dot or comma) and exponent,
        // whitespace, unit token. The token must start with a letter but may
        // contain digits for ASCII spellings (mm2, N/mm2).
        #[allow(clippy::unwrap_used)]
        let re = Regex::new(
            r"^\s*([+-]?(?:\d+(?:[.,]\d+)?|[.,]\d+)(?:[eE][+-]?\d+)?)\s*([A-Za-zµ°%][A-Za-z0-9µ°²³/%]*)\s*$",
        )
        .unwrap();
        re
    })
}

/// Parse a `"value unit"` string into magnitude and unit label.
///
/// The decimal comma is accepted (`"5,2 mm"`); the unit token is required.
pub fn parse(input: &str) -> Result<(f64, String)> {
    let caps = value_unit_regex().captures(input).ok_or_else(|| {
        Error::units(format!(
            "value '{}' is not of the form '<number> <unit>' (examples: '5.2 mm', '10 bar')",
            input
        ))
    })?;

    let magnitude: f64 = caps[1].replace(',', ".").parse().map_err(|_| {
        Error::units(format!("cannot read '{}' as a number", &caps[1]))
    })?;

    Ok((magnitude, caps[2].to_string()))
}

/// Parse and convert to the coherent SI base unit of the token's dimension.
pub fn convert_to_base(input: &str) -> Result<Quantity> {
    let (magnitude, unit) = parse(input)?;
    let (dimension, factor) = lookup(&unit).ok_or_else(|| {
        Error::units(format!(
            "unknown unit '{}' in '{}' (examples: mm, cm², l, bar, N/mm²)",
            unit, input
        ))
    })?;

    Ok(Quantity::new(
        magnitude * factor,
        dimension.base_unit(),
        Some(dimension),
    ))
}

/// Re-express a base-unit quantity in a human-scaled unit.
///
/// Preference order: the caller's original unit when the magnitude lands in
/// [0.1, 1000], then the ladder member whose magnitude is closest to 1
/// within that window. Never fails; any miss returns the input unchanged.
pub fn optimize_display(quantity: &Quantity, original_unit: &str) -> Quantity {
    let Some(dimension) = quantity.dimension else {
        return quantity.clone();
    };

    let in_window = |v: f64| (0.1..=1000.0).contains(&v.abs()) || v == 0.0;

    if let Some((dim, factor)) = lookup(original_unit) {
        if dim == dimension {
            let scaled = round_display(quantity.value / factor);
            if in_window(scaled) {
                return Quantity::new(scaled, original_unit, Some(dimension));
            }
        }
    }

    let mut best: Option<(f64, &str, f64)> = None;
    for &candidate in display_ladder(dimension) {
        let Some((_, factor)) = lookup(candidate) else {
            continue;
        };
        let scaled = round_display(quantity.value / factor);
        if !in_window(scaled) {
            continue;
        }
        let distance = scaled.abs().max(f64::MIN_POSITIVE).log10().abs();
        if best.map_or(true, |(d, _, _)| distance < d) {
            best = Some((distance, candidate, scaled));
        }
    }

    match best {
        Some((_, unit, scaled)) => Quantity::new(scaled, unit, Some(dimension)),
        None => quantity.clone(),
    }
}

/// Drop float noise below the 12th decimal so converted display values read
/// like the exact figures they represent (0.1 m / 0.01 would otherwise show
/// as 9.999999999999998 cm). Display magnitudes sit in [0.1, 1000], where
/// twelve decimals are far below measurement precision.
fn round_display(value: f64) -> f64 {
    (value * 1e12).round() / 1e12
}

/// Validate that every non-target entry carries a recognizable unit.
///
/// Returns the SI conversion per parameter; the first failure names the
/// offending parameter and shows well-formed examples.
pub fn require_all_units(
    parameters: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, UnitValue>> {
    let mut validated = BTreeMap::new();
    for (name, raw) in parameters {
        if raw == TARGET {
            continue;
        }
        let (_, original_unit) = parse(raw).map_err(|_| {
            Error::units(format!(
                "parameter '{}' needs a value with a unit, got '{}' (examples: '5.2 mm', '10 bar')",
                name, raw
            ))
        })?;
        let quantity = convert_to_base(raw).map_err(|_| {
            Error::units(format!(
                "parameter '{}' has an unrecognized unit in '{}' (examples: '5.2 mm', '10 bar')",
                name, raw
            ))
        })?;
        validated.insert(
            name.clone(),
            UnitValue {
                si_value: quantity.value,
                si_unit: quantity.unit,
                original_unit,
            },
        );
    }
    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_plain_value() {
        let (magnitude, unit) = parse("5.2 mm").unwrap();
        assert_eq!(magnitude, 5.2);
        assert_eq!(unit, "mm");
    }

    #[test]
    fn parse_accepts_decimal_comma_and_exponent() {
        assert_eq!(parse("5,2 mm").unwrap().0, 5.2);
        assert_eq!(parse("1.2e3 Pa").unwrap().0, 1200.0);
        assert_eq!(parse("-3 cm").unwrap().0, -3.0);
    }

    #[test]
    fn parse_rejects_unitless_and_garbage() {
        assert!(parse("5.2").is_err());
        assert!(parse("mm").is_err());
        assert!(parse("").is_err());
        assert!(matches!(parse("5.2"), Err(crate::types::Error::Units(_))));
    }

    #[test]
    fn convert_to_base_length() {
        let q = convert_to_base("5.2 mm").unwrap();
        assert!((q.value - 0.0052).abs() < 1e-12);
        assert_eq!(q.unit, "m");
        assert_eq!(q.dimension, Some(Dimension::Length));
    }

    #[test]
    fn convert_to_base_pressure_alias() {
        let q = convert_to_base("160 N/mm²").unwrap();
        assert_eq!(q.value, 160e6);
        assert_eq!(q.unit, "Pa");
        // ASCII spelling with a digit in the token
        assert_eq!(convert_to_base("160 N/mm2").unwrap().value, 160e6);
    }

    #[test]
    fn convert_unknown_unit_is_units_error() {
        assert!(matches!(
            convert_to_base("5 parsec"),
            Err(crate::types::Error::Units(_))
        ));
    }

    #[test]
    fn display_prefers_original_unit_in_window() {
        // circumference of a 5 cm circle, in base units
        let q = Quantity::new(0.314_159_265, "m", Some(Dimension::Length));
        let shown = optimize_display(&q, "cm");
        assert_eq!(shown.unit, "cm");
        assert!((shown.value - 31.415_926_5).abs() < 1e-6);
    }

    #[test]
    fn display_falls_back_to_ladder() {
        // 5.2e-6 km is outside the window; cm lands closest to 1
        let q = Quantity::new(0.0052, "m", Some(Dimension::Length));
        let shown = optimize_display(&q, "km");
        assert_eq!(shown.unit, "cm");
        assert!((shown.value - 0.52).abs() < 1e-12);
    }

    #[test]
    fn display_unknown_dimension_is_identity() {
        let q = Quantity::new(42.0, "?", None);
        assert_eq!(optimize_display(&q, "mm"), q);
    }

    #[test]
    fn display_round_trips_within_family() {
        for input in ["5.2 mm", "3 bar", "250 cm³", "7 m²"] {
            let (magnitude, unit) = parse(input).unwrap();
            let base = convert_to_base(input).unwrap();
            let shown = optimize_display(&base, &unit);
            if shown.unit == unit {
                assert!((shown.value - magnitude).abs() < 1e-9, "{}", input);
            }
        }
    }

    #[test]
    fn require_all_units_skips_target_and_names_offender() {
        let mut params = BTreeMap::new();
        params.insert("radius".to_string(), "5 cm".to_string());
        params.insert("perimeter".to_string(), TARGET.to_string());
        let validated = require_all_units(&params).unwrap();
        assert_eq!(validated.len(), 1);
        assert_eq!(validated["radius"].si_value, 0.05);
        assert_eq!(validated["radius"].original_unit, "cm");

        params.insert("depth".to_string(), "12".to_string());
        let err = require_all_units(&params).unwrap_err();
        assert!(err.to_string().contains("depth"));
    }
}
