use clap::Parser;
use pic_combiner_rs::image_pipeline::{CombineConfig, DepthAttachPipeline, heif::DEFAULT_JPEG_QUALITY};
use pic_combiner_rs::logger;

use tracing::{error, info};

/// Attach a grayscale depth map to an image as HEIF auxiliary data.
#[derive(Parser)]
#[command(version, about)]
struct DepthAttach {
    /// The main image.
    #[arg(short, long)]
    image: String,

    /// Grayscale depth image, brighter meaning nearer.
    #[arg(short, long)]
    depth: String,

    /// The output HEIF path.
    #[arg(short, long)]
    output: String,

    /// JPEG quality for the stored images (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = DepthAttach::parse();
    logger::init();

    let config = CombineConfig::builder().jpeg_quality(cli.quality).build();
    let pipeline = DepthAttachPipeline::new(config);

    match pipeline.convert_file(&cli.image, &cli.depth, &cli.output) {
        Ok(description) => {
            info!(
                "Depth data was successfully added to the image and saved ({}x{}, {:?})",
                description.width, description.height, description.pixel_format
            );
            Ok(())
        }
        Err(e) => {
            error!("Depth attachment failed: {}", e);
            Err(e.into())
        }
    }
}
