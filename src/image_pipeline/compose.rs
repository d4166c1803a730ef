//! Composition module
//!
//! Pure, I/O-free construction of container write plans: the stereo pair
//! composer and the depth attachment composer.

mod composer;
pub mod depth;
pub mod intrinsics;
pub mod types;

pub use composer::{StereoContainerComposer, compose_stereo_pair, compose_stereo_pair_default};
pub use depth::{
    DEPTH_AUXILIARY_TYPE, DepthAttachmentPlan, DepthDescription, DepthMap, DepthPixelFormat,
    compose_depth_attachment,
};
pub use intrinsics::{CameraIntrinsics, DEFAULT_HORIZONTAL_FOV_DEGREES, focal_length_pixels};
pub use types::{
    CameraModelMetadata, ContainerWritePlan, EntryMetadata, EntryRole, GroupType, PlanEntry,
    StereoGroupDescriptor, VendorMetadata,
};
