//! Pinhole camera intrinsics derived from a field-of-view assumption.

use serde::{Deserialize, Serialize};
use crate::image_pipeline::common::error::{CombineError, Result};
use crate::image_pipeline::decode::types::ImageDescriptor;

/// Horizontal field of view assumed when the caller supplies none.
pub const DEFAULT_HORIZONTAL_FOV_DEGREES: f64 = 55.0;

/// 3x3 pinhole camera matrix `[[f, 0, cx], [0, f, cy], [0, 0, 1]]`, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub matrix: [[f64; 3]; 3],
}

impl CameraIntrinsics {
    /// Derives intrinsics for an image of the given size, assuming square
    /// pixels and a principal point at the image center.
    pub fn from_horizontal_fov(descriptor: ImageDescriptor, horizontal_fov_degrees: f64) -> Result<Self> {
        let focal = focal_length_pixels(descriptor.pixel_width, horizontal_fov_degrees)?;
        let cx = f64::from(descriptor.pixel_width) / 2.0;
        let cy = f64::from(descriptor.pixel_height) / 2.0;

        Ok(Self {
            matrix: [
                [focal, 0.0, cx],
                [0.0, focal, cy],
                [0.0, 0.0, 1.0],
            ],
        })
    }

    pub fn from_row_major(values: [f64; 9]) -> Self {
        Self {
            matrix: [
                [values[0], values[1], values[2]],
                [values[3], values[4], values[5]],
                [values[6], values[7], values[8]],
            ],
        }
    }

    pub fn to_row_major(&self) -> [f64; 9] {
        let m = &self.matrix;
        [
            m[0][0], m[0][1], m[0][2],
            m[1][0], m[1][1], m[1][2],
            m[2][0], m[2][1], m[2][2],
        ]
    }

    pub fn focal_length_pixels(&self) -> f64 {
        self.matrix[0][0]
    }

    pub fn principal_point(&self) -> (f64, f64) {
        (self.matrix[0][2], self.matrix[1][2])
    }
}

/// Checks `0 < fov < 180`. NaN is rejected as well.
pub fn validate_fov(horizontal_fov_degrees: f64) -> Result<()> {
    if horizontal_fov_degrees > 0.0 && horizontal_fov_degrees < 180.0 {
        Ok(())
    } else {
        Err(CombineError::InvalidFov(horizontal_fov_degrees))
    }
}

/// `0.5 * width / tan(0.5 * fov)`, with the fov given in degrees.
pub fn focal_length_pixels(pixel_width: u32, horizontal_fov_degrees: f64) -> Result<f64> {
    if pixel_width == 0 {
        return Err(CombineError::InvalidImageDescriptor { width: pixel_width, height: 0 });
    }
    validate_fov(horizontal_fov_degrees)?;

    let fov_radians = horizontal_fov_degrees.to_radians();
    Ok(0.5 * f64::from(pixel_width) / (0.5 * fov_radians).tan())
}
