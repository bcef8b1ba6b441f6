//! Spherical Web Mercator (EPSG:3857) projection
//!
//! Coordinates use `x = longitude`, `y = latitude` in degrees on the geographic
//! side and meters on the projected side.

use geo::Coord;
use std::f64::consts::PI;

/// WGS84 semi-major axis, the sphere radius used by Web Mercator
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude at which the projected map becomes square
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Projects a geographic coordinate into Web Mercator meters
///
/// Latitudes beyond [`MAX_LATITUDE`] are clamped.
pub fn to_mercator(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    Coord {
        x: EARTH_RADIUS * coord.x.to_radians(),
        y: EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln(),
    }
}

/// Inverse of [`to_mercator`]
pub fn to_wgs84(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / EARTH_RADIUS).to_degrees(),
        y: (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees(),
    }
}
