//! Image processing pipeline module
//!
//! This module provides a structured approach to authoring image containers,
//! with separate modules for decoding, plan composition, HEIF writing,
//! stereo view synthesis, and pipeline orchestration.

pub mod common;
pub mod compose;
pub mod conversions;
pub mod decode;
pub mod heif;
pub mod synthesis;

pub use common::{
    CombineError,
    Result,
};

pub use decode::{
    DecodedImage,
    HasDimensions,
    ImageDecoder,
    ImageDescriptor,
    StandardImageDecoder,
};

pub use compose::{
    CameraIntrinsics,
    ContainerWritePlan,
    DEFAULT_HORIZONTAL_FOV_DEGREES,
    DepthMap,
    StereoContainerComposer,
    StereoGroupDescriptor,
    compose_depth_attachment,
    compose_stereo_pair,
};

pub use heif::{
    CombineConfig,
    CombineConfigBuilder,
    ContainerSummary,
    ContainerWriter,
    HeifContainerWriter,
    inspect_container,
    inspect_file,
};

pub use synthesis::SynthesisConfig;

pub use conversions::{
    DepthAttachPipeline,
    StereoPairPipeline,
    StereoSynthesisPipeline,
};
