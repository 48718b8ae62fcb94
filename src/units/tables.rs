//! Unit tables — token lookup and display ladders.
//!
//! Data-driven mapping from unit tokens to SI conversion factors. The
//! display ladders list, per dimension, the human-scale candidates
//! `optimize_display` may pick from (smallest factor first).

use serde::{Deserialize, Serialize};

/// Physical dimension of a parsed quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Length,
    Area,
    Volume,
    Pressure,
    Force,
    Angle,
}

impl Dimension {
    /// Coherent SI base unit label for this dimension.
    pub fn base_unit(self) -> &'static str {
        match self {
            Dimension::Length => "m",
            Dimension::Area => "m²",
            Dimension::Volume => "m³",
            Dimension::Pressure => "Pa",
            Dimension::Force => "N",
            Dimension::Angle => "rad",
        }
    }
}

/// `(token, dimension, factor to SI base)`.
///
/// ASCII spellings (mm2, m3) are accepted alongside the superscript forms
/// because LLM callers emit both.
pub const UNIT_TABLE: &[(&str, Dimension, f64)] = &[
    // Length
    ("µm", Dimension::Length, 1e-6),
    ("um", Dimension::Length, 1e-6),
    ("mm", Dimension::Length, 1e-3),
    ("cm", Dimension::Length, 1e-2),
    ("dm", Dimension::Length, 1e-1),
    ("m", Dimension::Length, 1.0),
    ("km", Dimension::Length, 1e3),
    // Area
    ("mm²", Dimension::Area, 1e-6),
    ("mm2", Dimension::Area, 1e-6),
    ("cm²", Dimension::Area, 1e-4),
    ("cm2", Dimension::Area, 1e-4),
    ("dm²", Dimension::Area, 1e-2),
    ("dm2", Dimension::Area, 1e-2),
    ("m²", Dimension::Area, 1.0),
    ("m2", Dimension::Area, 1.0),
    // Volume
    ("mm³", Dimension::Volume, 1e-9),
    ("mm3", Dimension::Volume, 1e-9),
    ("cm³", Dimension::Volume, 1e-6),
    ("cm3", Dimension::Volume, 1e-6),
    ("ml", Dimension::Volume, 1e-6),
    ("l", Dimension::Volume, 1e-3),
    ("dm³", Dimension::Volume, 1e-3),
    ("dm3", Dimension::Volume, 1e-3),
    ("m³", Dimension::Volume, 1.0),
    ("m3", Dimension::Volume, 1.0),
    // Pressure (N/mm² is the machine-design spelling of MPa)
    ("Pa", Dimension::Pressure, 1.0),
    ("hPa", Dimension::Pressure, 1e2),
    ("kPa", Dimension::Pressure, 1e3),
    ("MPa", Dimension::Pressure, 1e6),
    ("mbar", Dimension::Pressure, 1e2),
    ("bar", Dimension::Pressure, 1e5),
    ("N/mm²", Dimension::Pressure, 1e6),
    ("N/mm2", Dimension::Pressure, 1e6),
    // Force
    ("N", Dimension::Force, 1.0),
    ("kN", Dimension::Force, 1e3),
    ("MN", Dimension::Force, 1e6),
    // Angle
    ("rad", Dimension::Angle, 1.0),
    ("°", Dimension::Angle, std::f64::consts::PI / 180.0),
    ("deg", Dimension::Angle, std::f64::consts::PI / 180.0),
];

/// Look up a unit token. Exact match first, then case-insensitive.
pub fn lookup(token: &str) -> Option<(Dimension, f64)> {
    if let Some(&(_, dim, factor)) = UNIT_TABLE.iter().find(|(t, _, _)| *t == token) {
        return Some((dim, factor));
    }
    UNIT_TABLE
        .iter()
        .find(|(t, _, _)| t.eq_ignore_ascii_case(token))
        .map(|&(_, dim, factor)| (dim, factor))
}

/// Display ladder per dimension: candidates for human-scaled output.
///
/// Dimensions without a ladder (force, angle) are displayed in base units.
pub fn display_ladder(dim: Dimension) -> &'static [&'static str] {
    match dim {
        Dimension::Length => &["mm", "cm", "m", "km"],
        Dimension::Area => &["mm²", "cm²", "m²"],
        Dimension::Volume => &["mm³", "cm³", "l", "m³"],
        Dimension::Pressure => &["Pa", "kPa", "MPa", "bar"],
        Dimension::Force | Dimension::Angle => &[],
    }
}
