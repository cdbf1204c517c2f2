//! Synthetic GeoTIFF writer.
//!
//! Writes the same tags a forecast retrieval would: ModelPixelScale and
//! ModelTiepoint (or a ModelTransformation matrix), a GeoKeyDirectory and
//! optionally GDAL_NODATA.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tiff::TiffResult;
use viewer_common::BoundingBox;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// How the file is tied to the ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Georeference {
    ScaleTiepoint,
    Transformation,
    /// Plain TIFF, no georeference tags
    None,
}

/// Model type written to the GeoKeyDirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Geographic(u16),
    Projected(u16),
    /// Omit the GeoKeyDirectory entirely
    Absent,
}

/// Layout and georeference of a synthetic artifact.
#[derive(Debug, Clone)]
pub struct GeoTiffSpec {
    pub width: u32,
    pub height: u32,
    pub bounds: BoundingBox,
    pub georeference: Georeference,
    pub model: ModelType,
    pub pixel_is_point: bool,
    pub nodata: Option<String>,
}

impl GeoTiffSpec {
    /// North-up WGS84 raster covering `bounds`.
    pub fn new(width: u32, height: u32, bounds: BoundingBox) -> Self {
        Self {
            width,
            height,
            bounds,
            georeference: Georeference::ScaleTiepoint,
            model: ModelType::Geographic(4326),
            pixel_is_point: false,
            nodata: None,
        }
    }

    pub fn with_georeference(mut self, georeference: Georeference) -> Self {
        self.georeference = georeference;
        self
    }

    pub fn with_model(mut self, model: ModelType) -> Self {
        self.model = model;
        self
    }

    pub fn with_nodata(mut self, nodata: &str) -> Self {
        self.nodata = Some(nodata.to_string());
        self
    }

    pub fn pixel_is_point(mut self) -> Self {
        self.pixel_is_point = true;
        self
    }

    fn pixel_size(&self) -> (f64, f64) {
        (
            self.bounds.width() / self.width as f64,
            self.bounds.height() / self.height as f64,
        )
    }

    fn tiepoint(&self) -> [f64; 6] {
        let (sx, sy) = self.pixel_size();
        if self.pixel_is_point {
            [
                0.0,
                0.0,
                0.0,
                self.bounds.min_x + sx / 2.0,
                self.bounds.max_y - sy / 2.0,
                0.0,
            ]
        } else {
            [0.0, 0.0, 0.0, self.bounds.min_x, self.bounds.max_y, 0.0]
        }
    }

    fn transformation(&self) -> [f64; 16] {
        let (sx, sy) = self.pixel_size();
        let tie = self.tiepoint();
        [
            sx, 0.0, 0.0, tie[3], //
            0.0, -sy, 0.0, tie[4], //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
    }

    fn geo_keys(&self) -> Option<Vec<u16>> {
        let (model_type, crs_key, epsg) = match self.model {
            ModelType::Geographic(epsg) => (2, 2048, epsg),
            ModelType::Projected(epsg) => (1, 3072, epsg),
            ModelType::Absent => return None,
        };
        let raster_type = if self.pixel_is_point { 2 } else { 1 };
        Some(vec![
            1, 1, 0, 3, //
            1024, 0, 1, model_type, //
            1025, 0, 1, raster_type, //
            crs_key, 0, 1, epsg,
        ])
    }
}

/// Write a single-band Float32 GeoTIFF.
pub fn write_geotiff(path: &Path, spec: &GeoTiffSpec, data: &[f32]) -> TiffResult<()> {
    write_image::<colortype::Gray32Float>(path, spec, data)
}

/// Write a three-band RGB8 GeoTIFF; `data` is interleaved.
pub fn write_rgb_geotiff(path: &Path, spec: &GeoTiffSpec, data: &[u8]) -> TiffResult<()> {
    write_image::<colortype::RGB8>(path, spec, data)
}

fn write_image<C>(path: &Path, spec: &GeoTiffSpec, data: &[C::Inner]) -> TiffResult<()>
where
    C: colortype::ColorType,
    [C::Inner]: TiffValue,
{
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image = encoder.new_image::<C>(spec.width, spec.height)?;

    let (sx, sy) = spec.pixel_size();
    match spec.georeference {
        Georeference::ScaleTiepoint => {
            image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &[sx, sy, 0.0][..])?;
            image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), &spec.tiepoint()[..])?;
        }
        Georeference::Transformation => {
            image.encoder().write_tag(
                Tag::from_u16_exhaustive(MODEL_TRANSFORMATION),
                &spec.transformation()[..],
            )?;
        }
        Georeference::None => {}
    }
    if let Some(keys) = spec.geo_keys() {
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), &keys[..])?;
    }
    if let Some(nodata) = &spec.nodata {
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), nodata.as_str())?;
    }

    image.write_data(data)
}
