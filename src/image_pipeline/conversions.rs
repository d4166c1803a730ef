//! Pipeline conversions module
//!
//! This module contains orchestration logic: decode inputs, compose a plan,
//! hand it to a container writer.

mod depth_attach;
mod stereo_pair;
mod stereo_synthesis;

#[cfg(test)]
mod tests;

pub use depth_attach::DepthAttachPipeline;
pub use stereo_pair::StereoPairPipeline;
pub use stereo_synthesis::StereoSynthesisPipeline;
