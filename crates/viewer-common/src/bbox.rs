//! Bounding box types and operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic bounding box in degrees.
///
/// Used both for the request extent (west, south, east, north) and for the
/// extent a decoded raster covers (left, bottom, right, top).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse a comma separated "west,south,east,north" string.
    ///
    /// Only the shape and the numbers are checked. Ordering of the corners is
    /// left to whoever consumes the box.
    pub fn parse(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let number = |part: &str| {
            part.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))
        };

        Ok(Self {
            min_x: number(parts[0])?,
            min_y: number(parts[1])?,
            max_x: number(parts[2])?,
            max_y: number(parts[3])?,
        })
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center of the box as `[lat, lon]`, the order web maps expect.
    pub fn center_lat_lon(&self) -> [f64; 2] {
        [
            (self.min_y + self.max_y) / 2.0,
            (self.min_x + self.max_x) / 2.0,
        ]
    }

    /// Corner pair `[[south, west], [north, east]]` for image overlays.
    pub fn lat_lon_corners(&self) -> [[f64; 2]; 2] {
        [[self.min_y, self.min_x], [self.max_y, self.max_x]]
    }

    /// True when every coordinate fits a lon/lat extent.
    ///
    /// Longitudes up to 360 are accepted for 0..360 grids.
    pub fn is_geographic(&self) -> bool {
        let lon_ok = |x: f64| x.is_finite() && (-180.0..=360.0).contains(&x);
        let lat_ok = |y: f64| y.is_finite() && (-90.0..=90.0).contains(&y);
        lon_ok(self.min_x) && lon_ok(self.max_x) && lat_ok(self.min_y) && lat_ok(self.max_y)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'west,south,east,north'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}
