//! GeoKeyDirectory parsing, limited to the keys the viewer needs.
//!
//! https://docs.ogc.org/is/19-008r4/19-008r4.html#_geokey_directory

use serde::Serialize;

use crate::error::{GeoTiffError, GeoTiffResult};

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Coordinate reference system class declared by the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrsKind {
    Geographic { epsg: Option<u16> },
    Projected { epsg: Option<u16> },
    /// No model type key; judged from the bounds.
    Unknown,
}

/// The handful of keys that matter for overlay placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeys {
    pub crs: CrsKind,
    pub pixel_is_point: bool,
}

impl Default for GeoKeys {
    fn default() -> Self {
        Self {
            crs: CrsKind::Unknown,
            pixel_is_point: false,
        }
    }
}

impl GeoKeys {
    /// Parse the raw SHORT values of the GeoKeyDirectory tag.
    ///
    /// Only keys stored inline (location 0) are read; the ones we need are
    /// always SHORT values.
    pub fn parse(directory: &[u16]) -> GeoTiffResult<Self> {
        if directory.len() < 4 {
            return Err(GeoTiffError::InvalidGeoreference {
                tag: "GeoKeyDirectory",
                message: format!("header has {} values, expected 4", directory.len()),
            });
        }
        let key_count = directory[3] as usize;
        if directory.len() < 4 + key_count * 4 {
            return Err(GeoTiffError::InvalidGeoreference {
                tag: "GeoKeyDirectory",
                message: format!("{} keys declared, {} values present", key_count, directory.len()),
            });
        }

        let inline_value = |code: u16| {
            directory[4..4 + key_count * 4]
                .chunks_exact(4)
                .find(|entry| entry[0] == code && entry[1] == 0)
                .map(|entry| entry[3])
        };

        let epsg = |code: u16| inline_value(code).filter(|v| *v != 0 && *v != 32767);

        let crs = match inline_value(GT_MODEL_TYPE) {
            Some(MODEL_TYPE_GEOGRAPHIC) => CrsKind::Geographic {
                epsg: epsg(GEOGRAPHIC_TYPE),
            },
            Some(MODEL_TYPE_PROJECTED) => CrsKind::Projected {
                epsg: epsg(PROJECTED_CS_TYPE),
            },
            _ => CrsKind::Unknown,
        };

        Ok(Self {
            crs,
            pixel_is_point: inline_value(GT_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT),
        })
    }
}
