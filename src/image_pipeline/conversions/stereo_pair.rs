use tracing::{info, instrument};
use std::io::Write;
use std::path::Path;

use crate::image_pipeline::{
    common::error::{CombineError, Result},
    compose::{ContainerWritePlan, EntryRole, StereoContainerComposer},
    decode::{DecodedImage, HasDimensions, ImageDecoder, ImageDescriptor, StandardImageDecoder},
    heif::{CombineConfig, ContainerWriter, HeifContainerWriter},
};

/// Decode two images, compose the stereo plan, write the container.
pub struct StereoPairPipeline<D: ImageDecoder, W: ContainerWriter> {
    decoder: D,
    writer: W,
    config: CombineConfig,
}

impl StereoPairPipeline<StandardImageDecoder, HeifContainerWriter> {
    pub fn new(config: CombineConfig) -> Self {
        Self {
            decoder: StandardImageDecoder,
            writer: HeifContainerWriter,
            config,
        }
    }
}

impl<D: ImageDecoder, W: ContainerWriter> StereoPairPipeline<D, W> {
    pub fn with_custom(decoder: D, writer: W, config: CombineConfig) -> Self {
        Self {
            decoder,
            writer,
            config,
        }
    }

    fn validate_dimensions(&self, descriptor: ImageDescriptor) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if descriptor.pixel_width == 0 || descriptor.pixel_height == 0 {
            return Err(CombineError::InvalidImageDescriptor {
                width: descriptor.pixel_width,
                height: descriptor.pixel_height,
            });
        }

        Ok(())
    }

    fn decode_side(&self, role: EntryRole, data: &[u8]) -> Result<DecodedImage> {
        let (_span, side) = match role {
            EntryRole::Left => (tracing::info_span!("decode_left").entered(), "left"),
            EntryRole::Right => (tracing::info_span!("decode_right").entered(), "right"),
        };
        let image = self.decoder.decode(data).map_err(|e| match e {
            CombineError::ImageLoadFailed(reason) => {
                CombineError::ImageLoadFailed(format!("the {side} image could not be loaded: {reason}"))
            }
            other => other,
        })?;
        self.validate_dimensions(image.descriptor())?;
        Ok(image)
    }

    /// Decodes both inputs and composes the plan without writing anything.
    pub fn plan(&self, left_data: &[u8], right_data: &[u8]) -> Result<ContainerWritePlan<DecodedImage>> {
        let left = self.decode_side(EntryRole::Left, left_data)?;
        let right = self.decode_side(EntryRole::Right, right_data)?;

        let _span = tracing::info_span!("compose", fov = self.config.horizontal_fov_degrees).entered();
        StereoContainerComposer::new(self.config.horizontal_fov_degrees).compose(left, right)
    }

    /// Returns the plan that was written, reduced to image dimensions.
    #[instrument(skip(self, left_data, right_data, output), fields(left_size = left_data.len(), right_size = right_data.len()))]
    pub fn convert(&self, left_data: &[u8], right_data: &[u8], output: &mut dyn Write) -> Result<ContainerWritePlan> {
        info!("Starting stereo pair composition");

        let plan = self.plan(left_data, right_data)?;

        {
            let _span = tracing::info_span!("encode_container").entered();
            self.writer.write_stereo_pair(&plan, output, &self.config)?;
        }

        let left = plan.left().image.descriptor();
        let right = plan.right().image.descriptor();
        info!(
            left_width = left.pixel_width,
            left_height = left.pixel_height,
            right_width = right.pixel_width,
            right_height = right.pixel_height,
            focal_length = plan.left().metadata.intrinsics().focal_length_pixels(),
            "Stereo pair complete"
        );
        Ok(plan.to_descriptors())
    }

    /// The output file is only created once the whole container encoded.
    #[instrument(skip(self, left_path, right_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        &self,
        left_path: P,
        right_path: Q,
        output_path: R,
    ) -> Result<ContainerWritePlan> {
        let left_path = left_path.as_ref();
        let right_path = right_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            left = %left_path.display(),
            right = %right_path.display(),
            output = %output_path.display(),
            "Combining files"
        );

        let left_data = read_input("left", left_path)?;
        let right_data = read_input("right", right_path)?;

        let mut buffer = Vec::new();
        let plan = self.convert(&left_data, &right_data, &mut buffer)?;
        write_output(output_path, &buffer)?;

        Ok(plan)
    }

    pub fn config(&self) -> &CombineConfig {
        &self.config
    }
}

pub(crate) fn read_input(role: &str, path: &Path) -> Result<Vec<u8>> {
    let _span = tracing::info_span!("read_input_file", role).entered();
    std::fs::read(path).map_err(|e| {
        CombineError::ImageLoadFailed(format!("the {role} image could not be loaded: {}: {}", path.display(), e))
    })
}

pub(crate) fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let _span = tracing::info_span!("write_output_file").entered();
    std::fs::write(path, bytes)
        .map_err(|e| CombineError::WriteFailed(format!("{}: {}", path.display(), e)))
}
