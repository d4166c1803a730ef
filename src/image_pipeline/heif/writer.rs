use std::io::Write;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::compose::{ContainerWritePlan, DepthAttachmentPlan};
use crate::image_pipeline::decode::types::DecodedImage;
use crate::image_pipeline::heif::types::CombineConfig;

pub trait ContainerWriter {
    fn write_stereo_pair(&self, plan: &ContainerWritePlan<DecodedImage>, output: &mut dyn Write, config: &CombineConfig) -> Result<()>;
    fn write_with_depth(&self, plan: &DepthAttachmentPlan<DecodedImage>, output: &mut dyn Write, config: &CombineConfig) -> Result<()>;
}
