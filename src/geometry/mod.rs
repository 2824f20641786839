//! Geometry literals used by spatial predicates.
//!
//! Only what the query compiler needs: coordinates, a handful of geometry
//! kinds, envelopes, WKT output for binding and SRS name parsing.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

pub mod transform;
pub mod units;

pub use transform::{BuiltinTransformer, GeometryTransformer};
pub use units::LengthUnit;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeometryError {
    #[error("Unsupported srsName `{0}` (expected an EPSG code)")]
    UnsupportedSrsName(String),
    #[error("Geometry declares neither srid nor srs_name")]
    MissingSrs,
    #[error("A coordinate needs 2 or 3 ordinates, got {0}")]
    InvalidCoordinate(usize),
    #[error("Geometry has no coordinates")]
    Empty,
    #[error("Unknown unit of measure `{0}`")]
    UnknownUnit(String),
    #[error("Cannot convert a distance from {from} to {to}")]
    IncompatibleUnits { from: String, to: String },
    #[error("No coordinate transformation from EPSG:{from} to EPSG:{to}")]
    UnsupportedTransformation { from: i32, to: i32 },
}

lazy_static::lazy_static! {
    static ref EPSG_CODE: regex::Regex = regex::Regex::new(
        r"^(?:EPSG:(\d+)|urn:ogc:def:crs(?:,crs)?:EPSG:[\d.]*:(\d+)|https?://www\.opengis\.net/def/crs/EPSG/[\d.]+/(\d+))$"
    ).expect("EPSG pattern is valid");
}

/// Extract the EPSG code from the common srsName spellings
pub fn parse_srs_name(srs_name: &str) -> Result<i32, GeometryError> {
    EPSG_CODE
        .captures(srs_name.trim())
        .and_then(|caps| caps.iter().skip(1).flatten().next().map(|m| m.as_str()))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| GeometryError::UnsupportedSrsName(srs_name.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Coordinate { x, y, z: None }
    }

    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Coordinate { x, y, z: Some(z) }
    }
}

impl TryFrom<Vec<f64>> for Coordinate {
    type Error = GeometryError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        match values.as_slice() {
            [x, y] => Ok(Coordinate::new(*x, *y)),
            [x, y, z] => Ok(Coordinate::new_3d(*x, *y, *z)),
            other => Err(GeometryError::InvalidCoordinate(other.len())),
        }
    }
}

impl From<Coordinate> for Vec<f64> {
    fn from(c: Coordinate) -> Self {
        match c.z {
            Some(z) => vec![c.x, c.y, z],
            None => vec![c.x, c.y],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub lower: Coordinate,
    pub upper: Coordinate,
}

impl Envelope {
    /// Grow the envelope by `distance` in every direction
    pub fn expand(&self, distance: f64) -> Envelope {
        Envelope {
            lower: Coordinate {
                x: self.lower.x - distance,
                y: self.lower.y - distance,
                z: self.lower.z.map(|z| z - distance),
            },
            upper: Coordinate {
                x: self.upper.x + distance,
                y: self.upper.y + distance,
                z: self.upper.z.map(|z| z + distance),
            },
        }
    }

    fn ring(&self) -> Vec<Coordinate> {
        let (l, u) = (self.lower, self.upper);
        vec![
            Coordinate::new(l.x, l.y),
            Coordinate::new(u.x, l.y),
            Coordinate::new(u.x, u.y),
            Coordinate::new(l.x, u.y),
            Coordinate::new(l.x, l.y),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum Geometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    /// Exterior ring followed by interior rings
    Polygon(Vec<Vec<Coordinate>>),
    MultiPolygon(Vec<Vec<Vec<Coordinate>>>),
    Envelope(Envelope),
}

/// Geometry literal with its spatial reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeometryObjectDef")]
pub struct GeometryObject {
    #[serde(flatten)]
    pub geometry: Geometry,
    pub srid: i32,
}

/// Serialized form accepting either an SRID or an srsName
#[derive(Deserialize)]
struct GeometryObjectDef {
    #[serde(flatten)]
    geometry: Geometry,
    #[serde(default)]
    srid: Option<i32>,
    #[serde(default)]
    srs_name: Option<String>,
}

impl TryFrom<GeometryObjectDef> for GeometryObject {
    type Error = GeometryError;

    fn try_from(def: GeometryObjectDef) -> Result<Self, Self::Error> {
        let srid = match (def.srid, &def.srs_name) {
            (Some(srid), _) => srid,
            (None, Some(name)) => parse_srs_name(name)?,
            (None, None) => return Err(GeometryError::MissingSrs),
        };
        Ok(GeometryObject {
            geometry: def.geometry,
            srid,
        })
    }
}

impl GeometryObject {
    pub fn new(geometry: Geometry, srid: i32) -> Self {
        GeometryObject { geometry, srid }
    }

    pub fn envelope_of(envelope: Envelope, srid: i32) -> Self {
        GeometryObject {
            geometry: Geometry::Envelope(envelope),
            srid,
        }
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        match &self.geometry {
            Geometry::Point(c) => vec![*c],
            Geometry::LineString(cs) => cs.clone(),
            Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().copied().collect(),
            Geometry::Envelope(env) => vec![env.lower, env.upper],
        }
    }

    /// Bounding box of all coordinates
    pub fn envelope(&self) -> Result<Envelope, GeometryError> {
        let coords = self.coordinates();
        let first = coords.first().ok_or(GeometryError::Empty)?;
        let has_z = coords.iter().all(|c| c.z.is_some());

        let mut lower = *first;
        let mut upper = *first;
        for c in &coords[1..] {
            lower.x = lower.x.min(c.x);
            lower.y = lower.y.min(c.y);
            upper.x = upper.x.max(c.x);
            upper.y = upper.y.max(c.y);
            if let (Some(lz), Some(uz), Some(cz)) = (lower.z, upper.z, c.z) {
                lower.z = Some(lz.min(cz));
                upper.z = Some(uz.max(cz));
            }
        }
        if !has_z {
            lower.z = None;
            upper.z = None;
        }
        Ok(Envelope { lower, upper })
    }

    /// Apply a coordinate mapping and assign a new SRID
    pub fn map_coordinates<F>(&self, srid: i32, mut f: F) -> Result<GeometryObject, GeometryError>
    where
        F: FnMut(Coordinate) -> Result<Coordinate, GeometryError>,
    {
        let mut ring = |cs: &Vec<Coordinate>| -> Result<Vec<Coordinate>, GeometryError> {
            cs.iter().map(|c| f(*c)).collect()
        };
        let geometry = match &self.geometry {
            Geometry::Point(c) => Geometry::Point(ring(&vec![*c])?[0]),
            Geometry::LineString(cs) => Geometry::LineString(ring(cs)?),
            Geometry::Polygon(rings) => {
                Geometry::Polygon(rings.iter().map(&mut ring).collect::<Result<_, _>>()?)
            }
            Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| rings.iter().map(&mut ring).collect::<Result<Vec<_>, _>>())
                    .collect::<Result<_, _>>()?,
            ),
            Geometry::Envelope(env) => {
                let corners = ring(&vec![env.lower, env.upper])?;
                Geometry::Envelope(Envelope {
                    lower: corners[0],
                    upper: corners[1],
                })
            }
        };
        Ok(GeometryObject { geometry, srid })
    }

    /// Well-known text; envelopes are written as polygons
    pub fn to_wkt(&self) -> String {
        fn coord(out: &mut String, c: &Coordinate) {
            match c.z {
                Some(z) => {
                    let _ = write!(out, "{} {} {}", c.x, c.y, z);
                }
                None => {
                    let _ = write!(out, "{} {}", c.x, c.y);
                }
            }
        }
        fn seq(out: &mut String, cs: &[Coordinate]) {
            out.push('(');
            for (i, c) in cs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                coord(out, c);
            }
            out.push(')');
        }
        fn rings(out: &mut String, rs: &[Vec<Coordinate>]) {
            out.push('(');
            for (i, r) in rs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                seq(out, r);
            }
            out.push(')');
        }

        let is_3d = self.coordinates().iter().all(|c| c.z.is_some())
            && !matches!(self.geometry, Geometry::Envelope(_));
        let z = if is_3d { " Z " } else { " " };

        let mut out = String::new();
        match &self.geometry {
            Geometry::Point(c) => {
                out.push_str("POINT");
                out.push_str(z);
                seq(&mut out, std::slice::from_ref(c));
            }
            Geometry::LineString(cs) => {
                out.push_str("LINESTRING");
                out.push_str(z);
                seq(&mut out, cs);
            }
            Geometry::Polygon(rs) => {
                out.push_str("POLYGON");
                out.push_str(z);
                rings(&mut out, rs);
            }
            Geometry::MultiPolygon(polys) => {
                out.push_str("MULTIPOLYGON");
                out.push_str(z);
                out.push('(');
                for (i, p) in polys.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    rings(&mut out, p);
                }
                out.push(')');
            }
            Geometry::Envelope(env) => {
                out.push_str("POLYGON ");
                rings(&mut out, &[env.ring()]);
            }
        }
        out
    }
}
