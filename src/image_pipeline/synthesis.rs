//! Depth-driven stereo view synthesis.
//!
//! Each pixel is moved left by `floor(depth * shift_amount)` columns, so
//! near pixels (depth close to 1) move further than far ones. Pixels that
//! nothing lands on are filled from their nearest written neighbour.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use tracing::{debug, info};
use crate::image_pipeline::common::error::{CombineError, Result};
use crate::image_pipeline::compose::depth::DepthMap;

pub const DEFAULT_LEFT_SHIFT: u32 = 10;
pub const DEFAULT_RIGHT_SHIFT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisConfig {
    /// Maximum shift in pixels for the left view
    pub left_shift: u32,
    /// Maximum shift in pixels for the right view
    pub right_shift: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            left_shift: DEFAULT_LEFT_SHIFT,
            right_shift: DEFAULT_RIGHT_SHIFT,
        }
    }
}

/// Shifts one row. `None` marks a hole.
///
/// The scan stops at the first pixel whose forward offset `x + dx` reaches
/// the row width; pixels that would land left of column 0 are dropped.
/// Depth outside `[0, 1]` is clamped, as in [`DepthMap::to_luma8`].
pub fn shift_row(pixels: &[Rgba<u8>], depth: &[f32], shift_amount: u32) -> Vec<Option<Rgba<u8>>> {
    let width = pixels.len().min(depth.len());
    let mut shifted = vec![None; pixels.len()];

    for x in 0..width {
        let dx = (depth[x].clamp(0.0, 1.0) * shift_amount as f32) as usize;
        if dx >= width - x {
            break;
        }
        if let Some(target) = x.checked_sub(dx) {
            shifted[target] = Some(pixels[x]);
        }
    }
    shifted
}

/// Replaces every hole with the nearest written pixel of the row, preferring
/// the right-hand neighbour on ties. A row without any written pixel
/// becomes transparent black.
pub fn fill_row_holes(row: &[Option<Rgba<u8>>]) -> Vec<Rgba<u8>> {
    let width = row.len();
    let mut nearest_right = vec![None; width];
    let mut next = None;
    for x in (0..width).rev() {
        if row[x].is_some() {
            next = Some(x);
        }
        nearest_right[x] = next;
    }

    let mut previous = None;
    (0..width)
        .map(|x| {
            if let Some(pixel) = row[x] {
                previous = Some(x);
                return pixel;
            }
            let source = match (previous, nearest_right[x]) {
                (Some(l), Some(r)) => if r - x <= x - l { r } else { l },
                (Some(l), None) => l,
                (None, Some(r)) => r,
                (None, None) => return Rgba([0, 0, 0, 0]),
            };
            row[source].unwrap_or(Rgba([0, 0, 0, 0]))
        })
        .collect()
}

/// Builds one synthetic view from a photo and a matching depth map.
pub fn synthesize_view(photo: &RgbaImage, depth: &DepthMap, shift_amount: u32) -> Result<RgbaImage> {
    if photo.width() != depth.width() || photo.height() != depth.height() {
        return Err(CombineError::InvalidDepthMap(format!(
            "depth map is {}x{} but the photo is {}x{}",
            depth.width(),
            depth.height(),
            photo.width(),
            photo.height()
        )));
    }

    let width = photo.width() as usize;
    let rows: Vec<Vec<Rgba<u8>>> = (0..photo.height())
        .into_par_iter()
        .map(|y| {
            let source: Vec<Rgba<u8>> = (0..photo.width()).map(|x| *photo.get_pixel(x, y)).collect();
            fill_row_holes(&shift_row(&source, depth.row(y), shift_amount))
        })
        .collect();

    let mut raw = Vec::with_capacity(width * rows.len() * 4);
    for row in &rows {
        for pixel in row {
            raw.extend_from_slice(&pixel.0);
        }
    }

    debug!("Synthesized {}x{} view with shift {}", photo.width(), photo.height(), shift_amount);
    RgbaImage::from_raw(photo.width(), photo.height(), raw)
        .ok_or_else(|| CombineError::InvalidDepthMap("synthesized view has the wrong size".to_string()))
}

/// Left and right views for one photo.
pub fn synthesize_stereo_views(photo: &RgbaImage, depth: &DepthMap, config: &SynthesisConfig) -> Result<(RgbaImage, RgbaImage)> {
    info!(
        left_shift = config.left_shift,
        right_shift = config.right_shift,
        "Synthesizing stereo views"
    );
    let left = synthesize_view(photo, depth, config.left_shift)?;
    let right = synthesize_view(photo, depth, config.right_shift)?;
    Ok((left, right))
}
