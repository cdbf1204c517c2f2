//! Min-max stretch of a band to 8-bit gray.
//!
//! `gray = trunc((v - min) / (max - min) * 255)` over the valid samples.
//! NaN and nodata samples take no part in min/max and come out transparent.
//! A band whose valid samples are all equal renders as uniform mid-gray.

use rayon::prelude::*;
use serde::Serialize;

use crate::error::{check_len, RenderResult};

/// Gray level used when min == max.
pub const DEGENERATE_GRAY: u8 = 128;

/// Minimum samples to benefit from parallel passes
const PARALLEL_THRESHOLD: usize = 65_536; // 256x256 or larger

/// Observed range of the valid samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }
}

/// Band values mapped to 0..=255, with a validity mask.
#[derive(Debug, Clone)]
pub struct NormalizedOverlay {
    pub width: usize,
    pub height: usize,
    /// Gray level per pixel, row-major; 0 where invalid
    pub values: Vec<u8>,
    /// `false` for NaN or nodata pixels
    pub valid: Vec<bool>,
    /// `None` when no pixel is valid
    pub range: Option<ValueRange>,
}

impl NormalizedOverlay {
    pub fn has_invalid(&self) -> bool {
        self.valid.iter().any(|v| !v)
    }

    /// Interleaved RGBA: gray replicated to RGB, alpha 0 where invalid.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.values.len() * 4);
        for (&gray, &valid) in self.values.iter().zip(&self.valid) {
            let alpha = if valid { 255 } else { 0 };
            rgba.extend_from_slice(&[gray, gray, gray, alpha]);
        }
        rgba
    }
}

#[inline]
fn is_valid(value: f32, nodata: Option<f32>) -> bool {
    value.is_finite() && nodata.map_or(true, |nd| value != nd)
}

/// Range of the valid samples, or `None` when there are none.
pub fn value_range(data: &[f32], nodata: Option<f64>) -> Option<ValueRange> {
    let nodata = nodata.map(|v| v as f32);
    let fold = |(lo, hi): (f32, f32), v: &f32| {
        if is_valid(*v, nodata) {
            (lo.min(*v), hi.max(*v))
        } else {
            (lo, hi)
        }
    };
    let empty = (f32::INFINITY, f32::NEG_INFINITY);

    let (min, max) = if data.len() >= PARALLEL_THRESHOLD {
        data.par_iter()
            .fold(|| empty, fold)
            .reduce(|| empty, |a, b| (a.0.min(b.0), a.1.max(b.1)))
    } else {
        data.iter().fold(empty, fold)
    };

    (min <= max).then_some(ValueRange { min, max })
}

/// Stretch `data` (row-major, `width * height`) to gray levels.
pub fn min_max_stretch(
    data: &[f32],
    width: usize,
    height: usize,
    nodata: Option<f64>,
) -> RenderResult<NormalizedOverlay> {
    check_len(width, height, data.len(), 1)?;
    let range = value_range(data, nodata);
    let nd = nodata.map(|v| v as f32);

    let map = |v: &f32| -> (u8, bool) {
        if !is_valid(*v, nd) {
            return (0, false);
        }
        match range {
            Some(r) if r.is_degenerate() => (DEGENERATE_GRAY, true),
            Some(r) => {
                let scaled = (*v as f64 - r.min as f64) / (r.max as f64 - r.min as f64) * 255.0;
                (scaled.clamp(0.0, 255.0) as u8, true)
            }
            None => (0, false),
        }
    };

    let pairs: Vec<(u8, bool)> = if data.len() >= PARALLEL_THRESHOLD {
        data.par_iter().map(map).collect()
    } else {
        data.iter().map(map).collect()
    };
    let (values, valid) = pairs.into_iter().unzip();

    Ok(NormalizedOverlay {
        width,
        height,
        values,
        valid,
        range,
    })
}
