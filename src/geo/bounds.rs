use crate::api::{Bounds, Coordinates};
use crate::geo::projection::to_mercator;
use geo::{Coord, Rect};

/// Axis-aligned bounding box in geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl GeoBounds {
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }
    }

    /// Builds bounds from a lon/lat rectangle
    pub fn from_rect(rect: Rect<f64>) -> Self {
        Self::new(rect.min().y, rect.min().x, rect.max().y, rect.max().x)
    }

    /// Returns the bounds as a lon/lat rectangle
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_lng,
                y: self.min_lat,
            },
            Coord {
                x: self.max_lng,
                y: self.max_lat,
            },
        )
    }

    /// Inclusive point test
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }

    /// Projected width in Web Mercator meters
    pub fn width_m(&self) -> f64 {
        let (min, max) = self.projected_corners();
        max.x - min.x
    }

    /// Projected height in Web Mercator meters
    pub fn height_m(&self) -> f64 {
        let (min, max) = self.projected_corners();
        max.y - min.y
    }

    fn projected_corners(&self) -> (Coord<f64>, Coord<f64>) {
        let rect = self.to_rect();
        (to_mercator(rect.min()), to_mercator(rect.max()))
    }
}

impl From<GeoBounds> for Bounds {
    fn from(bounds: GeoBounds) -> Self {
        Bounds {
            top_left: Coordinates {
                lat: bounds.max_lat,
                lng: bounds.min_lng,
            },
            bottom_right: Coordinates {
                lat: bounds.min_lat,
                lng: bounds.max_lng,
            },
        }
    }
}
