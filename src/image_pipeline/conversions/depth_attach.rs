use tracing::{info, instrument};
use std::io::Write;
use std::path::Path;

use crate::image_pipeline::{
    common::error::{CombineError, Result},
    compose::{DepthDescription, DepthMap, compose_depth_attachment},
    conversions::stereo_pair::{read_input, write_output},
    decode::{ImageDecoder, StandardImageDecoder},
    heif::{CombineConfig, ContainerWriter, HeifContainerWriter},
};

/// Attach a grayscale depth image to a main image as auxiliary data.
pub struct DepthAttachPipeline<D: ImageDecoder, W: ContainerWriter> {
    decoder: D,
    writer: W,
    config: CombineConfig,
}

impl DepthAttachPipeline<StandardImageDecoder, HeifContainerWriter> {
    pub fn new(config: CombineConfig) -> Self {
        Self {
            decoder: StandardImageDecoder,
            writer: HeifContainerWriter,
            config,
        }
    }
}

impl<D: ImageDecoder, W: ContainerWriter> DepthAttachPipeline<D, W> {
    pub fn with_custom(decoder: D, writer: W, config: CombineConfig) -> Self {
        Self {
            decoder,
            writer,
            config,
        }
    }

    #[instrument(skip(self, image_data, depth_data, output), fields(image_size = image_data.len(), depth_size = depth_data.len()))]
    pub fn convert(&self, image_data: &[u8], depth_data: &[u8], output: &mut dyn Write) -> Result<DepthDescription> {
        info!("Starting depth attachment");

        let image = {
            let _span = tracing::info_span!("decode_image").entered();
            self.decoder.decode(image_data)?
        };

        let depth = {
            let _span = tracing::info_span!("decode_depth").entered();
            let decoded = self.decoder.decode(depth_data).map_err(|e| match e {
                CombineError::ImageLoadFailed(reason) => {
                    CombineError::ImageLoadFailed(format!("the depth image could not be loaded: {reason}"))
                }
                other => other,
            })?;
            DepthMap::from_image(&decoded.pixels)
        };

        let plan = {
            let _span = tracing::info_span!("compose").entered();
            compose_depth_attachment(image, depth)?
        };

        {
            let _span = tracing::info_span!("encode_container").entered();
            self.writer.write_with_depth(&plan, output, &self.config)?;
        }

        info!(
            depth_width = plan.description.width,
            depth_height = plan.description.height,
            bytes_per_row = plan.description.bytes_per_row,
            "Depth data attached"
        );
        Ok(plan.description)
    }

    #[instrument(skip(self, image_path, depth_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        &self,
        image_path: P,
        depth_path: Q,
        output_path: R,
    ) -> Result<DepthDescription> {
        let image_path = image_path.as_ref();
        let depth_path = depth_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            image = %image_path.display(),
            depth = %depth_path.display(),
            output = %output_path.display(),
            "Attaching depth"
        );

        let image_data = read_input("main", image_path)?;
        let depth_data = read_input("depth", depth_path)?;

        let mut buffer = Vec::new();
        let description = self.convert(&image_data, &depth_data, &mut buffer)?;
        write_output(output_path, &buffer)?;

        Ok(description)
    }

    pub fn config(&self) -> &CombineConfig {
        &self.config
    }
}
