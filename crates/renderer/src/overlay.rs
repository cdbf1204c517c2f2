//! Map placement of a stretched overlay.

use serde::Serialize;
use viewer_common::BoundingBox;

/// Initial zoom of the map.
pub const DEFAULT_ZOOM: u8 = 7;

/// Opacity of the overlay layer.
pub const OVERLAY_OPACITY: f64 = 0.7;

/// Where the map opens: the center of the first artifact's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    /// `[lat, lon]`
    pub center: [f64; 2],
    pub zoom: u8,
}

impl MapView {
    pub fn centered_on(bounds: &BoundingBox) -> Self {
        Self {
            center: bounds.center_lat_lon(),
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// An image overlay anchored to its raster's own bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayLayer {
    /// 1-based position among the matched artifacts
    pub position: usize,
    pub name: String,
    pub image_url: String,
    /// `[[bottom, left], [top, right]]`
    pub bounds: [[f64; 2]; 2],
    pub opacity: f64,
    pub interactive: bool,
    pub cross_origin: bool,
    pub z_index: i32,
}

impl OverlayLayer {
    pub fn new(
        position: usize,
        name: impl Into<String>,
        image_url: impl Into<String>,
        bounds: &BoundingBox,
    ) -> Self {
        Self {
            position,
            name: name.into(),
            image_url: image_url.into(),
            bounds: bounds.lat_lon_corners(),
            opacity: OVERLAY_OPACITY,
            interactive: true,
            cross_origin: false,
            z_index: 1,
        }
    }
}

/// 1-based layer selector over the matched artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionSelector {
    pub min: usize,
    pub max: usize,
    pub value: usize,
}

impl PositionSelector {
    /// `None` when nothing matched. `requested` is clamped into `1..=count`.
    pub fn new(count: usize, requested: Option<usize>) -> Option<Self> {
        if count == 0 {
            return None;
        }
        Some(Self {
            min: 1,
            max: count,
            value: requested.unwrap_or(1).clamp(1, count),
        })
    }

    /// A single artifact leaves nothing to choose.
    pub fn is_inert(&self) -> bool {
        self.max == self.min
    }

    /// 0-based index of the selected artifact.
    pub fn index(&self) -> usize {
        self.value - 1
    }
}
