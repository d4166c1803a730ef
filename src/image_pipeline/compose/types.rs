//! Container write plan types
//!
//! A plan is the logical description handed to a container writer: which
//! images go in, in what order, and the metadata dictionary attached to each.

use serde::{Deserialize, Serialize};
use crate::image_pipeline::compose::intrinsics::CameraIntrinsics;
use crate::image_pipeline::decode::types::{HasDimensions, ImageDescriptor};

/// Kind of relationship an image group expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupType {
    StereoPair,
}

impl GroupType {
    /// Entity group box type used for this group in a HEIF file.
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            GroupType::StereoPair => *b"ster",
        }
    }
}

/// Which entries of a container form the stereo relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StereoGroupDescriptor {
    pub group_index: u32,
    pub group_type: GroupType,
    pub left_image_index: u32,
    pub right_image_index: u32,
}

impl StereoGroupDescriptor {
    /// The only group a two-image container carries.
    pub const fn stereo_pair() -> Self {
        Self {
            group_index: 0,
            group_type: GroupType::StereoPair,
            left_image_index: 0,
            right_image_index: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraModelMetadata {
    /// Row-major 3x3 intrinsics.
    pub intrinsics: [f64; 9],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VendorMetadata {
    pub camera_model: CameraModelMetadata,
}

/// Metadata dictionary attached to one container entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub groups: StereoGroupDescriptor,
    pub heif: VendorMetadata,
}

impl EntryMetadata {
    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics::from_row_major(self.heif.camera_model.intrinsics)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryRole {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry<I> {
    pub role: EntryRole,
    pub image: I,
    pub metadata: EntryMetadata,
}

/// Exactly two entries, left first, plus the group that ties them together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerWritePlan<I = ImageDescriptor> {
    pub entries: [PlanEntry<I>; 2],
    pub group: StereoGroupDescriptor,
}

impl<I> ContainerWritePlan<I> {
    pub fn left(&self) -> &PlanEntry<I> {
        &self.entries[0]
    }

    pub fn right(&self) -> &PlanEntry<I> {
        &self.entries[1]
    }
}

impl<I: HasDimensions> ContainerWritePlan<I> {
    /// Same plan with every image reduced to its dimensions.
    pub fn to_descriptors(&self) -> ContainerWritePlan<ImageDescriptor> {
        let [left, right] = &self.entries;
        let describe = |entry: &PlanEntry<I>| PlanEntry {
            role: entry.role,
            image: entry.image.descriptor(),
            metadata: entry.metadata,
        };

        ContainerWritePlan {
            entries: [describe(left), describe(right)],
            group: self.group,
        }
    }
}
