//! Error types for GeoTIFF reading and validation.

use thiserror::Error;
use viewer_common::ViewerError;

/// Result type for GeoTIFF reader operations.
pub type GeoTiffResult<T> = Result<T, GeoTiffError>;

/// Why an artifact could not be turned into a raster.
#[derive(Error, Debug)]
pub enum GeoTiffError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The TIFF container itself could not be decoded
    #[error("TIFF decode error: {0}")]
    Decode(#[from] tiff::TiffError),

    /// No ModelPixelScale/ModelTiepoint pair and no ModelTransformation
    #[error("Missing georeference tags (ModelPixelScale + ModelTiepoint or ModelTransformation)")]
    MissingGeoreference,

    /// A georeference tag is present but malformed
    #[error("Invalid georeference tag {tag}: {message}")]
    InvalidGeoreference { tag: &'static str, message: String },

    /// Zero width, height or band count
    #[error("Empty raster: {width}x{height} with {bands} band(s)")]
    EmptyRaster { width: u32, height: u32, bands: usize },

    /// Dimensions beyond the configured limits
    #[error("Raster {width}x{height} exceeds limit: {limit}")]
    TooLarge {
        width: u32,
        height: u32,
        limit: String,
    },

    /// Coordinate reference system the map cannot display
    #[error("Incompatible coordinate reference system: {0}")]
    IncompatibleCrs(String),

    /// Decoded sample count does not match the header
    #[error("Sample count mismatch: expected {expected}, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },
}

impl GeoTiffError {
    /// Short machine readable class of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            GeoTiffError::IoError(_) => "io",
            GeoTiffError::Decode(_) => "decode",
            GeoTiffError::MissingGeoreference => "missing_georeference",
            GeoTiffError::InvalidGeoreference { .. } => "invalid_georeference",
            GeoTiffError::EmptyRaster { .. } => "empty_raster",
            GeoTiffError::TooLarge { .. } => "too_large",
            GeoTiffError::IncompatibleCrs(_) => "incompatible_crs",
            GeoTiffError::SampleCountMismatch { .. } => "sample_count_mismatch",
        }
    }
}

impl GeoTiffError {
    /// The page-facing error for artifact `name`.
    pub fn for_artifact(self, name: &str) -> ViewerError {
        match self {
            GeoTiffError::IoError(e) => ViewerError::InternalError(format!("{}: {}", name, e)),
            other => ViewerError::InvalidArtifact {
                name: name.to_string(),
                message: other.to_string(),
            },
        }
    }
}
