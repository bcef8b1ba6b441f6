//! Geographic helpers for the crawl
//!
//! This module handles:
//! - Parsing the search area from GeoJSON
//! - Web Mercator projection
//! - Partitioning the area into bounded-size query cells

mod bounds;
mod partition;
pub mod projection;

pub use bounds::GeoBounds;
pub use partition::{partition, MAX_GRID_CELLS};

use crate::{GeoError, GeoResult};
use geo::{BoundingRect, CoordsIter, Geometry};
use geojson::GeoJson;

/// Parses GeoJSON text into a geometry
///
/// Accepts a bare geometry, a feature or a feature collection (which becomes a
/// geometry collection). Coordinates follow the GeoJSON lon/lat order.
///
/// # Returns
///
/// * `Ok(Geometry)` - Parsed geometry with at least one coordinate
/// * `Err(GeoError)` - Malformed GeoJSON, no coordinates, or coordinates off the globe
pub fn parse_geojson(text: &str) -> GeoResult<Geometry<f64>> {
    let geojson: GeoJson = text.parse()?;
    let geometry = Geometry::<f64>::try_from(geojson)?;

    if geometry.bounding_rect().is_none() {
        return Err(GeoError::EmptyGeometry);
    }

    if let Some(coord) = geometry
        .coords_iter()
        .find(|c| !(-90.0..=90.0).contains(&c.y) || !(-180.0..=180.0).contains(&c.x))
    {
        return Err(GeoError::CoordinateOutOfRange {
            lat: coord.y,
            lng: coord.x,
        });
    }

    Ok(geometry)
}

/// Parses GeoJSON text and partitions it into cells of at most `cell_size_m`
pub fn partition_geojson(text: &str, cell_size_m: f64) -> GeoResult<Vec<GeoBounds>> {
    let geometry = parse_geojson(text)?;
    partition(&geometry, cell_size_m)
}
