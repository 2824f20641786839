//! Units of measure for distance operands.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::GeometryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Metre,
    Kilometre,
    Centimetre,
    Millimetre,
    Foot,
    UsSurveyFoot,
    Inch,
    Yard,
    Mile,
    NauticalMile,
    Degree,
}

lazy_static::lazy_static! {
    static ref UNIT_ALIASES: HashMap<&'static str, LengthUnit> = {
        let mut m = HashMap::new();
        for (aliases, unit) in [
            (&["m", "metre", "meter", "metres", "meters", "urn:ogc:def:uom:epsg::9001"][..], LengthUnit::Metre),
            (&["km", "kilometre", "kilometer", "kilometres", "kilometers", "urn:ogc:def:uom:epsg::9036"][..], LengthUnit::Kilometre),
            (&["cm", "centimetre", "centimeter", "centimetres", "centimeters", "urn:ogc:def:uom:epsg::1033"][..], LengthUnit::Centimetre),
            (&["mm", "millimetre", "millimeter", "millimetres", "millimeters", "urn:ogc:def:uom:epsg::1025"][..], LengthUnit::Millimetre),
            (&["ft", "foot", "feet", "urn:ogc:def:uom:epsg::9002"][..], LengthUnit::Foot),
            (&["us-ft", "us survey foot", "us_survey_foot", "urn:ogc:def:uom:epsg::9003"][..], LengthUnit::UsSurveyFoot),
            (&["in", "inch", "inches"][..], LengthUnit::Inch),
            (&["yd", "yard", "yards", "urn:ogc:def:uom:epsg::9096"][..], LengthUnit::Yard),
            (&["mi", "mile", "miles", "urn:ogc:def:uom:epsg::9093"][..], LengthUnit::Mile),
            (&["nmi", "nautical mile", "nautical miles", "urn:ogc:def:uom:epsg::9030"][..], LengthUnit::NauticalMile),
            (&["deg", "degree", "degrees", "urn:ogc:def:uom:epsg::9102"][..], LengthUnit::Degree),
        ] {
            for alias in aliases {
                m.insert(*alias, unit);
            }
        }
        m
    };
}

impl LengthUnit {
    /// Resolve a unit name, abbreviation or EPSG unit URN (case-insensitive)
    pub fn parse(name: &str) -> Result<LengthUnit, GeometryError> {
        UNIT_ALIASES
            .get(name.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| GeometryError::UnknownUnit(name.to_string()))
    }

    /// Metres per unit; `None` for angular units
    pub fn metres_per_unit(&self) -> Option<f64> {
        let factor = match self {
            LengthUnit::Metre => 1.0,
            LengthUnit::Kilometre => 1000.0,
            LengthUnit::Centimetre => 0.01,
            LengthUnit::Millimetre => 0.001,
            LengthUnit::Foot => 0.3048,
            LengthUnit::UsSurveyFoot => 1200.0 / 3937.0,
            LengthUnit::Inch => 0.0254,
            LengthUnit::Yard => 0.9144,
            LengthUnit::Mile => 1609.344,
            LengthUnit::NauticalMile => 1852.0,
            LengthUnit::Degree => return None,
        };
        Some(factor)
    }

    /// Convert `value` from this unit into `target`
    pub fn convert(&self, value: f64, target: LengthUnit) -> Result<f64, GeometryError> {
        if *self == target {
            return Ok(value);
        }
        match (self.metres_per_unit(), target.metres_per_unit()) {
            (Some(from), Some(to)) => Ok(value * from / to),
            _ => Err(GeometryError::IncompatibleUnits {
                from: self.to_string(),
                to: target.to_string(),
            }),
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LengthUnit::Metre => "metre",
            LengthUnit::Kilometre => "kilometre",
            LengthUnit::Centimetre => "centimetre",
            LengthUnit::Millimetre => "millimetre",
            LengthUnit::Foot => "foot",
            LengthUnit::UsSurveyFoot => "US survey foot",
            LengthUnit::Inch => "inch",
            LengthUnit::Yard => "yard",
            LengthUnit::Mile => "mile",
            LengthUnit::NauticalMile => "nautical mile",
            LengthUnit::Degree => "degree",
        };
        f.write_str(name)
    }
}
