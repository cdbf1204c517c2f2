//! Rendering errors.

use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    #[error("Buffer holds {actual} values, {width}x{height} needs {expected}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("IDAT compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

pub(crate) fn check_len(
    width: usize,
    height: usize,
    actual: usize,
    per_pixel: usize,
) -> RenderResult<()> {
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyImage { width, height });
    }
    let expected = width * height * per_pixel;
    if actual != expected {
        return Err(RenderError::DimensionMismatch {
            width,
            height,
            expected,
            actual,
        });
    }
    Ok(())
}
