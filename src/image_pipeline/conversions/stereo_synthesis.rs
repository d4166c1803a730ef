use image::RgbaImage;
use tracing::{info, instrument};
use std::io::Write;
use std::path::Path;

use crate::image_pipeline::{
    common::error::{CombineError, Result},
    compose::{ContainerWritePlan, DepthMap, StereoContainerComposer},
    conversions::stereo_pair::{read_input, write_output},
    decode::{DecodedImage, ImageDecoder, StandardImageDecoder},
    heif::{CombineConfig, ContainerWriter, HeifContainerWriter},
    synthesis::{SynthesisConfig, synthesize_stereo_views},
};

/// Photo + depth map -> synthetic left/right views -> stereo container.
pub struct StereoSynthesisPipeline<D: ImageDecoder, W: ContainerWriter> {
    decoder: D,
    writer: W,
    config: CombineConfig,
    synthesis: SynthesisConfig,
}

impl StereoSynthesisPipeline<StandardImageDecoder, HeifContainerWriter> {
    pub fn new(config: CombineConfig, synthesis: SynthesisConfig) -> Self {
        Self {
            decoder: StandardImageDecoder,
            writer: HeifContainerWriter,
            config,
            synthesis,
        }
    }
}

impl<D: ImageDecoder, W: ContainerWriter> StereoSynthesisPipeline<D, W> {
    pub fn with_custom(decoder: D, writer: W, config: CombineConfig, synthesis: SynthesisConfig) -> Self {
        Self {
            decoder,
            writer,
            config,
            synthesis,
        }
    }

    /// Decodes the inputs and produces the left and right views.
    pub fn synthesize(&self, photo_data: &[u8], depth_data: &[u8]) -> Result<(RgbaImage, RgbaImage)> {
        let photo = {
            let _span = tracing::info_span!("decode_photo").entered();
            self.decoder.decode(photo_data)?.pixels.to_rgba8()
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

        let _span = tracing::info_span!("synthesize_views").entered();
        synthesize_stereo_views(&photo, &depth, &self.synthesis)
    }

    #[instrument(skip(self, photo_data, depth_data, output), fields(photo_size = photo_data.len()))]
    pub fn convert(&self, photo_data: &[u8], depth_data: &[u8], output: &mut dyn Write) -> Result<ContainerWritePlan> {
        info!("Starting stereo synthesis");
        let (left, right) = self.synthesize(photo_data, depth_data)?;
        self.write_views(left, right, output)
    }

    /// Composes and writes already synthesized views.
    pub fn write_views(&self, left: RgbaImage, right: RgbaImage, output: &mut dyn Write) -> Result<ContainerWritePlan> {
        let left = DecodedImage::new(image::DynamicImage::ImageRgba8(left));
        let right = DecodedImage::new(image::DynamicImage::ImageRgba8(right));

        let plan = {
            let _span = tracing::info_span!("compose").entered();
            StereoContainerComposer::new(self.config.horizontal_fov_degrees).compose(left, right)?
        };

        {
            let _span = tracing::info_span!("encode_container").entered();
            self.writer.write_stereo_pair(&plan, output, &self.config)?;
        }

        info!("Synthetic stereo pair complete");
        Ok(plan.to_descriptors())
    }

    /// Writes the container, and the two views as PNG files when
    /// `views_dir` is given.
    #[instrument(skip(self, photo_path, depth_path, output_path, views_dir))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        &self,
        photo_path: P,
        depth_path: Q,
        output_path: R,
        views_dir: Option<&Path>,
    ) -> Result<ContainerWritePlan> {
        let photo_path = photo_path.as_ref();
        let depth_path = depth_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            photo = %photo_path.display(),
            depth = %depth_path.display(),
            output = %output_path.display(),
            "Synthesizing stereo pair"
        );

        let photo_data = read_input("photo", photo_path)?;
        let depth_data = read_input("depth", depth_path)?;
        let (left, right) = self.synthesize(&photo_data, &depth_data)?;

        if let Some(dir) = views_dir {
            for (name, view) in [("stereo_left.png", &left), ("stereo_right.png", &right)] {
                let path = dir.join(name);
                view.save(&path)
                    .map_err(|e| CombineError::WriteFailed(format!("{}: {}", path.display(), e)))?;
                info!(path = %path.display(), "Saved synthesized view");
            }
        }

        let mut buffer = Vec::new();
        let plan = self.write_views(left, right, &mut buffer)?;
        write_output(output_path, &buffer)?;
        Ok(plan)
    }

    pub fn config(&self) -> &CombineConfig {
        &self.config
    }

    pub fn synthesis_config(&self) -> &SynthesisConfig {
        &self.synthesis
    }
}
