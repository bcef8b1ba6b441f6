//! Polygon to query-cell partitioning
//!
//! The polygon's bounding box is projected into Web Mercator so a single cell
//! size in meters means the same thing on both axes. The projected box is cut
//! into an even grid whose steps never exceed the cell size, each grid cell is
//! mapped back to geographic coordinates, and cells that miss the polygon are
//! dropped.

use crate::geo::bounds::GeoBounds;
use crate::geo::projection::{to_mercator, to_wgs84};
use crate::{GeoError, GeoResult};
use geo::{BoundingRect, Coord, Geometry, Intersects};

/// Upper bound on grid positions considered for one partition
pub const MAX_GRID_CELLS: usize = 1_000_000;

/// Splits a geometry into cells no larger than `cell_size_m` on either side
///
/// # Arguments
///
/// * `geometry` - Area to cover, in lon/lat degrees
/// * `cell_size_m` - Maximum cell side in Web Mercator meters
///
/// # Returns
///
/// * `Ok(Vec<GeoBounds>)` - Cells covering the geometry, top-to-bottom, left-to-right
/// * `Err(GeoError)` - Invalid cell size, empty geometry or an oversized grid
///
/// A geometry whose bounding box has zero width or height yields exactly one
/// cell spanning that box.
pub fn partition(geometry: &Geometry<f64>, cell_size_m: f64) -> GeoResult<Vec<GeoBounds>> {
    if !cell_size_m.is_finite() || cell_size_m <= 0.0 {
        return Err(GeoError::InvalidCellSize(cell_size_m));
    }

    let bbox = geometry.bounding_rect().ok_or(GeoError::EmptyGeometry)?;
    let extent = GeoBounds::from_rect(bbox);

    let min = to_mercator(bbox.min());
    let max = to_mercator(bbox.max());
    let width = max.x - min.x;
    let height = max.y - min.y;

    if width <= 0.0 || height <= 0.0 {
        tracing::debug!("Degenerate extent {:?}, using a single cell", extent);
        return Ok(vec![extent]);
    }

    let columns_f = (width / cell_size_m).ceil();
    let rows_f = (height / cell_size_m).ceil();
    let count = columns_f * rows_f;
    if count > MAX_GRID_CELLS as f64 {
        return Err(GeoError::TooManyCells {
            count,
            limit: MAX_GRID_CELLS,
        });
    }

    let columns = columns_f as usize;
    let rows = rows_f as usize;
    if columns * rows == 1 {
        return Ok(vec![extent]);
    }

    let step_x = width / columns as f64;
    let step_y = height / rows as f64;

    // Grid lines are shared by neighbouring cells and the outermost ones are the
    // exact geographic extent, so round-off can't open gaps between cells.
    let lngs: Vec<f64> = (0..=columns)
        .map(|i| match i {
            0 => extent.min_lng,
            i if i == columns => extent.max_lng,
            i => {
                to_wgs84(Coord {
                    x: min.x + step_x * i as f64,
                    y: min.y,
                })
                .x
            }
        })
        .collect();

    let lats: Vec<f64> = (0..=rows)
        .map(|j| match j {
            0 => extent.max_lat,
            j if j == rows => extent.min_lat,
            j => {
                to_wgs84(Coord {
                    x: min.x,
                    y: max.y - step_y * j as f64,
                })
                .y
            }
        })
        .collect();

    let mut cells = Vec::new();
    for row in lats.windows(2) {
        for column in lngs.windows(2) {
            let cell = GeoBounds::new(row[1], column[0], row[0], column[1]);
            if geometry.intersects(&cell.to_rect().to_polygon()) {
                cells.push(cell);
            }
        }
    }

    tracing::debug!(
        "Partitioned {:.0}x{:.0}m extent into {} of {} cells ({}x{} grid)",
        width,
        height,
        cells.len(),
        columns * rows,
        columns,
        rows
    );

    Ok(cells)
}
