//! PNG encoding for stretched overlays.
//!
//! Picks the smallest of three layouts:
//! - **Grayscale (color type 0)**: every pixel valid.
//! - **Indexed (color type 3)**: some pixels transparent and at most 255
//!   distinct gray levels, so the levels plus one transparent entry fit a
//!   palette.
//! - **Gray + alpha (color type 4)**: fallback when all 256 levels occur
//!   alongside transparent pixels.

use rayon::prelude::*;
use std::io::Write;
use tracing::debug;

use crate::error::{check_len, RenderResult};
use crate::stretch::NormalizedOverlay;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel level scanning
const PARALLEL_THRESHOLD: usize = 4096; // 64x64 or larger

const COLOR_TYPE_GRAY: u8 = 0;
const COLOR_TYPE_INDEXED: u8 = 3;
const COLOR_TYPE_GRAY_ALPHA: u8 = 4;

/// Encode an overlay, choosing the layout automatically.
pub fn encode_overlay(overlay: &NormalizedOverlay) -> RenderResult<Vec<u8>> {
    let (width, height) = (overlay.width, overlay.height);
    check_len(width, height, overlay.values.len(), 1)?;
    check_len(width, height, overlay.valid.len(), 1)?;

    if !overlay.has_invalid() {
        debug!(width, height, "Encoding grayscale overlay");
        return create_png_gray(&overlay.values, width, height);
    }

    let levels = used_levels(overlay);
    let level_count = levels.iter().filter(|used| **used).count();
    if level_count < MAX_PALETTE_SIZE {
        debug!(width, height, level_count, "Encoding indexed overlay");
        let (palette, lookup) = build_palette(&levels);
        let transparent = palette.len() as u8;
        let indices: Vec<u8> = overlay
            .values
            .iter()
            .zip(&overlay.valid)
            .map(|(&gray, &valid)| if valid { lookup[gray as usize] } else { transparent })
            .collect();
        return create_png_indexed(width, height, &palette, &indices);
    }

    debug!(width, height, "Encoding gray+alpha overlay");
    let gray_alpha: Vec<u8> = overlay
        .values
        .iter()
        .zip(&overlay.valid)
        .flat_map(|(&gray, &valid)| [gray, if valid { 255 } else { 0 }])
        .collect();
    create_png_gray_alpha(&gray_alpha, width, height)
}

/// Which gray levels occur among the valid pixels.
fn used_levels(overlay: &NormalizedOverlay) -> [bool; 256] {
    let mark = |mut levels: [bool; 256], (gray, valid): (&u8, &bool)| {
        if *valid {
            levels[*gray as usize] = true;
        }
        levels
    };

    if overlay.values.len() >= PARALLEL_THRESHOLD {
        overlay
            .values
            .par_iter()
            .zip(overlay.valid.par_iter())
            .fold(|| [false; 256], mark)
            .reduce(
                || [false; 256],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x |= y;
                    }
                    a
                },
            )
    } else {
        overlay
            .values
            .iter()
            .zip(&overlay.valid)
            .fold([false; 256], mark)
    }
}

/// Palette of the used levels, in ascending order, and a level-to-index table.
fn build_palette(levels: &[bool; 256]) -> (Vec<u8>, [u8; 256]) {
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut lookup = [0u8; 256];
    for (level, _) in levels.iter().enumerate().filter(|(_, used)| **used) {
        lookup[level] = palette.len() as u8;
        palette.push(level as u8);
    }
    (palette, lookup)
}

/// Grayscale PNG, one byte per pixel.
pub fn create_png_gray(pixels: &[u8], width: usize, height: usize) -> RenderResult<Vec<u8>> {
    check_len(width, height, pixels.len(), 1)?;
    let mut png = start_png(width, height, COLOR_TYPE_GRAY);
    write_idat(&mut png, pixels, width, 1)?;
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Gray + alpha PNG, two bytes per pixel.
pub fn create_png_gray_alpha(pixels: &[u8], width: usize, height: usize) -> RenderResult<Vec<u8>> {
    check_len(width, height, pixels.len(), 2)?;
    let mut png = start_png(width, height, COLOR_TYPE_GRAY_ALPHA);
    write_idat(&mut png, pixels, width, 2)?;
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Indexed PNG over gray `palette`; the entry after the last gray is
/// fully transparent.
pub fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[u8],
    indices: &[u8],
) -> RenderResult<Vec<u8>> {
    check_len(width, height, indices.len(), 1)?;
    let mut png = start_png(width, height, COLOR_TYPE_INDEXED);

    let mut plte_data = Vec::with_capacity((palette.len() + 1) * 3);
    for gray in palette.iter().chain(std::iter::once(&0)) {
        plte_data.extend_from_slice(&[*gray, *gray, *gray]);
    }
    write_chunk(&mut png, b"PLTE", &plte_data);

    // tRNS: opaque grays, then the transparent entry
    let mut trns_data = vec![255u8; palette.len()];
    trns_data.push(0);
    write_chunk(&mut png, b"tRNS", &trns_data);

    write_idat(&mut png, indices, width, 1)?;
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn start_png(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);

    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(color_type);
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);
    png
}

/// Filter byte 0 per scanline, then zlib.
fn write_idat(
    png: &mut Vec<u8>,
    pixels: &[u8],
    width: usize,
    bytes_per_pixel: usize,
) -> RenderResult<()> {
    let stride = width * bytes_per_pixel;
    let mut uncompressed = Vec::with_capacity(pixels.len() + pixels.len() / stride.max(1));
    for row in pixels.chunks_exact(stride) {
        uncompressed.push(0);
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    let compressed = encoder.finish()?;

    write_chunk(png, b"IDAT", &compressed);
    Ok(())
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stretch::min_max_stretch;

    fn color_type(png: &[u8]) -> u8 {
        // signature (8) + length (4) + "IHDR" (4) + width (4) + height (4) + depth (1)
        png[25]
    }

    #[test]
    fn test_all_valid_is_grayscale() {
        let overlay = min_max_stretch(&[1.0, 2.0, 3.0, 4.0], 2, 2, None).unwrap();
        let png = encode_overlay(&overlay).unwrap();
        assert_eq!(&png[0..8], &PNG_SIGNATURE);
        assert_eq!(color_type(&png), COLOR_TYPE_GRAY);
    }

    #[test]
    fn test_transparent_pixels_use_palette() {
        let overlay = min_max_stretch(&[1.0, f32::NAN, 3.0, 4.0], 2, 2, None).unwrap();
        let png = encode_overlay(&overlay).unwrap();
        assert_eq!(color_type(&png), COLOR_TYPE_INDEXED);
    }

    #[test]
    fn test_full_range_with_holes_falls_back_to_gray_alpha() {
        let mut values: Vec<u8> = (0..=255).collect();
        values.extend_from_slice(&[0; 256]);
        let mut valid = vec![true; 512];
        valid[300] = false;
        let overlay = NormalizedOverlay {
            width: 256,
            height: 2,
            values,
            valid,
            range: None,
        };
        let png = encode_overlay(&overlay).unwrap();
        assert_eq!(color_type(&png), COLOR_TYPE_GRAY_ALPHA);
    }

    #[test]
    fn test_palette_lookup_is_ascending() {
        let mut levels = [false; 256];
        levels[3] = true;
        levels[200] = true;
        levels[17] = true;
        let (palette, lookup) = build_palette(&levels);
        assert_eq!(palette, vec![3, 17, 200]);
        assert_eq!(lookup[200], 2);
    }

    #[test]
    fn test_used_levels_parallel_scan() {
        let data: Vec<f32> = (0..128 * 128).map(|i| (i % 7) as f32).collect();
        let mut overlay = min_max_stretch(&data, 128, 128, None).unwrap();
        overlay.valid[0] = false;
        let levels = used_levels(&overlay);
        assert_eq!(levels.iter().filter(|u| **u).count(), 7);
    }
}
