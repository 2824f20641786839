//! Reprojection of query geometries into the database SRS.

use std::f64::consts::PI;

use super::{Coordinate, GeometryError, GeometryObject};

/// Reprojects geometry literals before they are bound into a statement
pub trait GeometryTransformer: Send + Sync {
    fn transform(&self, geometry: &GeometryObject, target_srid: i32)
        -> Result<GeometryObject, GeometryError>;
}

/// Handles the identity case and WGS 84 <-> Web Mercator
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTransformer;

const EARTH_RADIUS: f64 = 6_378_137.0;
const WGS84: i32 = 4326;
const WEB_MERCATOR: i32 = 3857;

fn to_web_mercator(c: Coordinate) -> Result<Coordinate, GeometryError> {
    let x = c.x.to_radians() * EARTH_RADIUS;
    let y = (PI / 4.0 + c.y.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    Ok(Coordinate { x, y, z: c.z })
}

fn to_wgs84(c: Coordinate) -> Result<Coordinate, GeometryError> {
    let lon = (c.x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (c.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    Ok(Coordinate {
        x: lon,
        y: lat,
        z: c.z,
    })
}

impl GeometryTransformer for BuiltinTransformer {
    fn transform(
        &self,
        geometry: &GeometryObject,
        target_srid: i32,
    ) -> Result<GeometryObject, GeometryError> {
        match (geometry.srid, target_srid) {
            (from, to) if from == to => Ok(geometry.clone()),
            (WGS84, WEB_MERCATOR) => geometry.map_coordinates(target_srid, to_web_mercator),
            (WEB_MERCATOR, WGS84) => geometry.map_coordinates(target_srid, to_wgs84),
            (from, to) => Err(GeometryError::UnsupportedTransformation { from, to }),
        }
    }
}
