//! Stereo container composer.
//!
//! Turns two images and a horizontal field-of-view assumption into a
//! [`ContainerWritePlan`]. No I/O happens here; the plan is handed to a
//! container writer afterwards.
//!
//! Intrinsics are derived once, from the left image, and attached to both
//! entries. Right images with different dimensions are accepted as-is.

use tracing::debug;
use crate::image_pipeline::common::error::{CombineError, Result};
use crate::image_pipeline::compose::intrinsics::{
    CameraIntrinsics, DEFAULT_HORIZONTAL_FOV_DEGREES, validate_fov,
};
use crate::image_pipeline::compose::types::{
    CameraModelMetadata, ContainerWritePlan, EntryMetadata, EntryRole, PlanEntry,
    StereoGroupDescriptor, VendorMetadata,
};
use crate::image_pipeline::decode::types::{HasDimensions, ImageDescriptor};

#[derive(Debug, Clone, Copy)]
pub struct StereoContainerComposer {
    horizontal_fov_degrees: f64,
}

impl Default for StereoContainerComposer {
    fn default() -> Self {
        Self { horizontal_fov_degrees: DEFAULT_HORIZONTAL_FOV_DEGREES }
    }
}

impl StereoContainerComposer {
    pub fn new(horizontal_fov_degrees: f64) -> Self {
        Self { horizontal_fov_degrees }
    }

    pub fn horizontal_fov_degrees(&self) -> f64 {
        self.horizontal_fov_degrees
    }

    pub fn compose<I: HasDimensions>(&self, left: I, right: I) -> Result<ContainerWritePlan<I>> {
        compose_stereo_pair(left, right, self.horizontal_fov_degrees)
    }
}

/// Builds the two-entry stereo plan.
///
/// # Errors
///
/// * `InvalidImageDescriptor` if either image has zero width.
/// * `InvalidFov` unless `0 < horizontal_fov_degrees < 180`.
pub fn compose_stereo_pair<I: HasDimensions>(
    left: I,
    right: I,
    horizontal_fov_degrees: f64,
) -> Result<ContainerWritePlan<I>> {
    let left_descriptor = left.descriptor();
    let right_descriptor = right.descriptor();
    ensure_positive_width(left_descriptor)?;
    ensure_positive_width(right_descriptor)?;
    validate_fov(horizontal_fov_degrees)?;

    let intrinsics = CameraIntrinsics::from_horizontal_fov(left_descriptor, horizontal_fov_degrees)?;
    debug!(
        focal_length = intrinsics.focal_length_pixels(),
        fov = horizontal_fov_degrees,
        "Derived intrinsics from left image {}x{}",
        left_descriptor.pixel_width,
        left_descriptor.pixel_height
    );

    let group = StereoGroupDescriptor::stereo_pair();
    let metadata = EntryMetadata {
        groups: group,
        heif: VendorMetadata {
            camera_model: CameraModelMetadata { intrinsics: intrinsics.to_row_major() },
        },
    };

    Ok(ContainerWritePlan {
        entries: [
            PlanEntry { role: EntryRole::Left, image: left, metadata },
            PlanEntry { role: EntryRole::Right, image: right, metadata },
        ],
        group,
    })
}

/// [`compose_stereo_pair`] with the default 55 degree field of view.
pub fn compose_stereo_pair_default<I: HasDimensions>(left: I, right: I) -> Result<ContainerWritePlan<I>> {
    compose_stereo_pair(left, right, DEFAULT_HORIZONTAL_FOV_DEGREES)
}

fn ensure_positive_width(descriptor: ImageDescriptor) -> Result<()> {
    if descriptor.pixel_width == 0 {
        return Err(CombineError::InvalidImageDescriptor {
            width: descriptor.pixel_width,
            height: descriptor.pixel_height,
        });
    }
    Ok(())
}
