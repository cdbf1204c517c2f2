//! Affine pixel-to-geographic transform.

use serde::Serialize;
use viewer_common::BoundingBox;

use crate::error::{GeoTiffError, GeoTiffResult};

/// Affine transform in GDAL coefficient order.
///
/// `x = c + col * a + row * b`
/// `y = f + col * d + row * e`
///
/// `(c, f)` is the outer corner of the upper-left pixel; `e` is negative for
/// north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    /// North-up transform from an origin and pixel size.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            a: pixel_width,
            b: 0.0,
            c: origin_x,
            d: 0.0,
            e: -pixel_height,
            f: origin_y,
        }
    }

    /// Build from ModelPixelScale `[sx, sy, sz]` and the first ModelTiepoint
    /// `[i, j, k, x, y, z]`.
    pub fn from_scale_and_tiepoint(scale: &[f64], tiepoint: &[f64]) -> GeoTiffResult<Self> {
        if scale.len() < 2 {
            return Err(GeoTiffError::InvalidGeoreference {
                tag: "ModelPixelScale",
                message: format!("expected 3 values, got {}", scale.len()),
            });
        }
        if tiepoint.len() < 6 {
            return Err(GeoTiffError::InvalidGeoreference {
                tag: "ModelTiepoint",
                message: format!("expected at least 6 values, got {}", tiepoint.len()),
            });
        }
        let (sx, sy) = (scale[0], scale[1]);
        if sx == 0.0 || sy == 0.0 || !sx.is_finite() || !sy.is_finite() {
            return Err(GeoTiffError::InvalidGeoreference {
                tag: "ModelPixelScale",
                message: format!("degenerate pixel size {} x {}", sx, sy),
            });
        }
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);

        Ok(Self::north_up(x - i * sx, y + j * sy, sx, sy))
    }

    /// Build from a row-major 4x4 ModelTransformation matrix.
    pub fn from_model_transformation(matrix: &[f64]) -> GeoTiffResult<Self> {
        if matrix.len() < 16 {
            return Err(GeoTiffError::InvalidGeoreference {
                tag: "ModelTransformation",
                message: format!("expected 16 values, got {}", matrix.len()),
            });
        }
        let transform = Self {
            a: matrix[0],
            b: matrix[1],
            c: matrix[3],
            d: matrix[4],
            e: matrix[5],
            f: matrix[7],
        };
        if transform.determinant().abs() < f64::EPSILON {
            return Err(GeoTiffError::InvalidGeoreference {
                tag: "ModelTransformation",
                message: "matrix is singular".to_string(),
            });
        }
        Ok(transform)
    }

    /// Shift a point-registered transform so `(c, f)` is a pixel corner.
    pub fn to_pixel_is_area(self) -> Self {
        Self {
            c: self.c - 0.5 * self.a - 0.5 * self.b,
            f: self.f - 0.5 * self.d - 0.5 * self.e,
            ..self
        }
    }

    /// Convert pixel coordinates to geographic coordinates.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.c + col * self.a + row * self.b,
            self.f + col * self.d + row * self.e,
        )
    }

    fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// Extent covered by a `width` x `height` raster.
    pub fn bounds(&self, width: u32, height: u32) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.pixel_to_geo(0.0, 0.0),
            self.pixel_to_geo(w, 0.0),
            self.pixel_to_geo(0.0, h),
            self.pixel_to_geo(w, h),
        ];
        let xs = corners.iter().map(|c| c.0);
        let ys = corners.iter().map(|c| c.1);
        BoundingBox::new(
            xs.clone().fold(f64::INFINITY, f64::min),
            ys.clone().fold(f64::INFINITY, f64::min),
            xs.fold(f64::NEG_INFINITY, f64::max),
            ys.fold(f64::NEG_INFINITY, f64::max),
        )
    }
}
