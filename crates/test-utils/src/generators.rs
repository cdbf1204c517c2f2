//! Synthetic band generators.
//!
//! Values are predictable so tests can check what the stretch does with
//! them.

/// Grid where each cell is `col * 1000 + row`, row-major.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Precipitation-like field in mm: zero at the edges, a cell peaking at
/// `peak` in the middle.
pub fn create_precipitation_grid(width: usize, height: usize, peak: f32) -> Vec<f32> {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let radius = center_x.min(center_y).max(1.0);

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 + 0.5 - center_x;
            let dy = row as f32 + 0.5 - center_y;
            let falloff = 1.0 - ((dx * dx + dy * dy).sqrt() / radius);
            data.push((falloff * peak).max(0.0));
        }
    }
    data
}

/// Linear ramp from `min` to `max` across the whole grid.
pub fn create_ramp_grid(width: usize, height: usize, min: f32, max: f32) -> Vec<f32> {
    let count = width * height;
    let step = if count > 1 {
        (max - min) / (count - 1) as f32
    } else {
        0.0
    };
    (0..count).map(|i| min + step * i as f32).collect()
}

/// Every cell holds `value`.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Replace every `stride`-th cell with `fill` (NaN or a nodata sentinel).
pub fn punch_holes(data: &mut [f32], stride: usize, fill: f32) {
    for value in data.iter_mut().step_by(stride.max(1)) {
        *value = fill;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_endpoints() {
        let grid = create_ramp_grid(4, 4, -2.0, 13.0);
        assert_eq!(grid[0], -2.0);
        assert_eq!(grid[15], 13.0);
    }

    #[test]
    fn test_precipitation_non_negative() {
        let grid = create_precipitation_grid(20, 10, 25.0);
        assert!(grid.iter().all(|v| *v >= 0.0 && *v <= 25.0));
        assert!(grid.iter().any(|v| *v > 20.0));
    }

    #[test]
    fn test_punch_holes() {
        let mut grid = create_constant_grid(3, 3, 1.0);
        punch_holes(&mut grid, 4, f32::NAN);
        assert_eq!(grid.iter().filter(|v| v.is_nan()).count(), 3);
    }
}
