//! Shared test utilities for the gtiff-viewer workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A GeoTIFF writer for synthetic forecast artifacts
//! - Grid data generators
//! - Stand-in retrieval programs (shell scripts)
//! - Common test fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{write_geotiff, GeoTiffSpec, fixtures};
//! ```

pub mod fixtures;
pub mod generators;
pub mod geotiff;
pub mod scripts;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use geotiff::*;
pub use scripts::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(45.5_f64, 45.5001_f64, 0.001_f64); // passes
/// assert_approx_eq!(12.0_f32, 13.0_f32, 0.5_f32);      // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        if (left - right).abs() > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  epsilon: `{:?}`",
                left, right, epsilon
            );
        }
    }};
}

/// Approximate equality of two bounding boxes, edge by edge.
///
/// ```ignore
/// use test_utils::assert_bbox_approx_eq;
///
/// assert_bbox_approx_eq!(artifact.bounds, fixtures::bbox::NORTH_ITALY, 1e-6);
/// ```
#[macro_export]
macro_rules! assert_bbox_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        $crate::assert_approx_eq!(left.min_x, right.min_x, $epsilon);
        $crate::assert_approx_eq!(left.min_y, right.min_y, $epsilon);
        $crate::assert_approx_eq!(left.max_x, right.max_x, $epsilon);
        $crate::assert_approx_eq!(left.max_y, right.max_y, $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    use viewer_common::BoundingBox;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_bbox_approx_eq_passes() {
        let a = BoundingBox::new(11.9, 45.0, 13.2, 46.0);
        let b = BoundingBox::new(11.9000001, 45.0, 13.2, 45.9999999);
        assert_bbox_approx_eq!(a, b, 1e-5);
    }
}
