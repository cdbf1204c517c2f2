//! Structural checks applied before and after sample data is read.

use viewer_common::BoundingBox;

use crate::error::{GeoTiffError, GeoTiffResult};
use crate::geokeys::CrsKind;

/// Upper bounds on what a single artifact may load into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterLimits {
    /// Largest accepted width or height
    pub max_dimension: u32,
    /// Largest accepted width * height
    pub max_pixels: u64,
}

impl Default for RasterLimits {
    fn default() -> Self {
        Self {
            max_dimension: 8192,
            max_pixels: 50_000_000,
        }
    }
}

impl RasterLimits {
    /// Header check: runs before any sample is decoded.
    pub fn check_dimensions(&self, width: u32, height: u32, bands: usize) -> GeoTiffResult<()> {
        if width == 0 || height == 0 || bands == 0 {
            return Err(GeoTiffError::EmptyRaster {
                width,
                height,
                bands,
            });
        }
        if width > self.max_dimension || height > self.max_dimension {
            return Err(GeoTiffError::TooLarge {
                width,
                height,
                limit: format!("max dimension {}", self.max_dimension),
            });
        }
        if width as u64 * height as u64 > self.max_pixels {
            return Err(GeoTiffError::TooLarge {
                width,
                height,
                limit: format!("max pixels {}", self.max_pixels),
            });
        }
        Ok(())
    }
}

/// The map draws in lon/lat; projected rasters and extents outside the
/// lon/lat range are rejected.
pub fn check_crs(crs: CrsKind, bounds: &BoundingBox) -> GeoTiffResult<()> {
    match crs {
        CrsKind::Projected { epsg } => Err(GeoTiffError::IncompatibleCrs(match epsg {
            Some(code) => format!("projected EPSG:{}", code),
            None => "projected (user defined)".to_string(),
        })),
        CrsKind::Geographic { .. } | CrsKind::Unknown if !bounds.is_geographic() => {
            Err(GeoTiffError::IncompatibleCrs(format!(
                "extent {} is outside lon/lat range",
                bounds
            )))
        }
        _ => Ok(()),
    }
}
