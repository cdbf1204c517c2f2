//! GeoTIFF reader for forecast rasters.
//!
//! Decodes the first sample band of a (Geo)TIFF file together with its
//! georeference: the affine pixel-to-geographic transform and the bounding
//! rectangle it implies.
//!
//! # Georeference
//!
//! Either the ModelPixelScale + ModelTiepoint pair or a ModelTransformation
//! matrix must be present. GeoKeyDirectory is optional; when present it
//! decides the CRS class and whether the tiepoint refers to pixel centers.
//!
//! # Validation
//!
//! Header values are checked against [`RasterLimits`] before sample data is
//! read, so an oversized or empty file is rejected without allocating its
//! grid. Projected rasters are rejected because the map draws in lon/lat.

pub mod error;
pub mod geokeys;
pub mod transform;
pub mod validation;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde::Serialize;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, instrument};
use viewer_common::BoundingBox;

pub use error::{GeoTiffError, GeoTiffResult};
pub use geokeys::{CrsKind, GeoKeys};
pub use transform::AffineTransform;
pub use validation::RasterLimits;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const PLANAR_CONFIG_SEPARATE: u32 = 2;

/// A decoded raster artifact: first band plus georeference.
#[derive(Debug, Clone)]
pub struct RasterArtifact {
    /// File name the artifact was read from
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Samples per pixel in the file; only the first is kept
    pub band_count: usize,
    /// First band, row-major, `width * height` values
    pub data: Vec<f32>,
    pub bounds: BoundingBox,
    pub transform: AffineTransform,
    pub nodata: Option<f64>,
    pub crs: CrsKind,
}

/// Artifact metadata without the sample grid.
#[derive(Debug, Clone, Serialize)]
pub struct RasterInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub band_count: usize,
    pub bounds: BoundingBox,
    pub transform: AffineTransform,
    pub nodata: Option<f64>,
    pub crs: CrsKind,
}

impl RasterArtifact {
    pub fn info(&self) -> RasterInfo {
        RasterInfo {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            band_count: self.band_count,
            bounds: self.bounds,
            transform: self.transform,
            nodata: self.nodata,
            crs: self.crs,
        }
    }
}

/// Open `path` and decode it as a single-band GeoTIFF.
#[instrument(skip(limits), fields(path = %path.display()))]
pub fn read_geotiff(path: &Path, limits: &RasterLimits) -> GeoTiffResult<RasterArtifact> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = File::open(path)?;
    decode_geotiff(BufReader::new(file), name, limits)
}

/// Decode a GeoTIFF from any seekable reader.
pub fn decode_geotiff<R: Read + Seek>(
    reader: R,
    name: String,
    limits: &RasterLimits,
) -> GeoTiffResult<RasterArtifact> {
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let band_count = match decoder.find_tag(Tag::SamplesPerPixel)? {
        Some(_) => decoder.get_tag_u32(Tag::SamplesPerPixel)? as usize,
        None => 1,
    };
    limits.check_dimensions(width, height, band_count)?;

    let geo_keys = match optional_u16_vec(&mut decoder, GEO_KEY_DIRECTORY)? {
        Some(directory) => GeoKeys::parse(&directory)?,
        None => GeoKeys::default(),
    };
    let mut transform = read_transform(&mut decoder)?;
    if geo_keys.pixel_is_point {
        transform = transform.to_pixel_is_area();
    }
    let bounds = transform.bounds(width, height);
    validation::check_crs(geo_keys.crs, &bounds)?;

    let nodata = read_nodata(&mut decoder)?;

    let planar = match decoder.find_tag(Tag::PlanarConfiguration)? {
        Some(_) => decoder.get_tag_u32(Tag::PlanarConfiguration)? == PLANAR_CONFIG_SEPARATE,
        None => false,
    };

    let samples = convert_to_f32(decoder.read_image()?);
    let data = first_band(samples, width as usize * height as usize, band_count, planar)?;

    debug!(
        name = %name,
        width,
        height,
        band_count,
        bounds = %bounds,
        "Decoded GeoTIFF"
    );

    Ok(RasterArtifact {
        name,
        width,
        height,
        band_count,
        data,
        bounds,
        transform,
        nodata,
        crs: geo_keys.crs,
    })
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> GeoTiffResult<AffineTransform> {
    let scale = optional_f64_vec(decoder, MODEL_PIXEL_SCALE)?;
    let tiepoint = optional_f64_vec(decoder, MODEL_TIEPOINT)?;

    match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) => {
            AffineTransform::from_scale_and_tiepoint(&scale, &tiepoint)
        }
        _ => match optional_f64_vec(decoder, MODEL_TRANSFORMATION)? {
            Some(matrix) => AffineTransform::from_model_transformation(&matrix),
            None => Err(GeoTiffError::MissingGeoreference),
        },
    }
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> GeoTiffResult<Option<f64>> {
    let tag = Tag::from_u16_exhaustive(GDAL_NODATA);
    if decoder.find_tag(tag)?.is_none() {
        return Ok(None);
    }
    let text = decoder.get_tag_ascii_string(tag)?;
    let text = text.trim_matches(char::from(0)).trim();
    match text.to_ascii_lowercase().as_str() {
        "nan" => Ok(Some(f64::NAN)),
        value => value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| GeoTiffError::InvalidGeoreference {
                tag: "GDAL_NODATA",
                message: format!("'{}' is not a number", text),
            }),
    }
}

fn optional_f64_vec<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    code: u16,
) -> GeoTiffResult<Option<Vec<f64>>> {
    let tag = Tag::from_u16_exhaustive(code);
    if decoder.find_tag(tag)?.is_none() {
        return Ok(None);
    }
    Ok(Some(decoder.get_tag_f64_vec(tag)?))
}

fn optional_u16_vec<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    code: u16,
) -> GeoTiffResult<Option<Vec<u16>>> {
    let tag = Tag::from_u16_exhaustive(code);
    if decoder.find_tag(tag)?.is_none() {
        return Ok(None);
    }
    Ok(Some(decoder.get_tag_u16_vec(tag)?))
}

fn convert_to_f32(data: DecodingResult) -> Vec<f32> {
    match data {
        DecodingResult::U8(values) => values.iter().map(|&v| v as f32).collect(),
        DecodingResult::U16(values) => values.iter().map(|&v| v as f32).collect(),
        DecodingResult::U32(values) => values.iter().map(|&v| v as f32).collect(),
        DecodingResult::U64(values) => values.iter().map(|&v| v as f32).collect(),
        DecodingResult::I8(values) => values.iter().map(|&v| v as f32).collect(),
        DecodingResult::I16(values) => values.iter().map(|&v| v as f32).collect(),
        DecodingResult::I32(values) => values.iter().map(|&v| v as f32).collect(),
        DecodingResult::I64(values) => values.iter().map(|&v| v as f32).collect(),
        DecodingResult::F32(values) => values,
        DecodingResult::F64(values) => values.iter().map(|&v| v as f32).collect(),
    }
}

/// Keep only band 1 of interleaved or planar sample data.
fn first_band(
    samples: Vec<f32>,
    pixels: usize,
    bands: usize,
    planar: bool,
) -> GeoTiffResult<Vec<f32>> {
    if bands == 1 || planar {
        if samples.len() < pixels {
            return Err(GeoTiffError::SampleCountMismatch {
                expected: pixels,
                actual: samples.len(),
            });
        }
        let mut samples = samples;
        samples.truncate(pixels);
        return Ok(samples);
    }

    if samples.len() != pixels * bands {
        return Err(GeoTiffError::SampleCountMismatch {
            expected: pixels * bands,
            actual: samples.len(),
        });
    }
    Ok(samples.iter().step_by(bands).copied().collect())
}
