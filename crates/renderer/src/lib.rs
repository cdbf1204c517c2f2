//! Overlay rendering for single-band forecast rasters.
//!
//! - Min-max stretch of band values to 8-bit gray
//! - PNG encoding (grayscale, indexed or gray+alpha)
//! - Placement of the overlay on the map: bounds, center, selector

pub mod error;
pub mod overlay;
pub mod png;
pub mod stretch;

pub use error::{RenderError, RenderResult};
pub use overlay::{MapView, OverlayLayer, PositionSelector, DEFAULT_ZOOM, OVERLAY_OPACITY};
pub use stretch::{min_max_stretch, NormalizedOverlay, ValueRange, DEGENERATE_GRAY};
