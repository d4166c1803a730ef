use clap::Parser;
use pic_combiner_rs::image_pipeline::{
    CombineConfig, DEFAULT_HORIZONTAL_FOV_DEGREES, StereoPairPipeline,
    heif::DEFAULT_JPEG_QUALITY,
};
use pic_combiner_rs::logger;

use tracing::{error, info};

/// Combine a left and a right image into one stereo-pair HEIF container.
#[derive(Parser)]
#[command(version, about)]
struct PicCombiner {
    /// The path to the left image.
    #[arg(short, long)]
    left_image_path: String,

    /// The path to the right image.
    #[arg(short, long)]
    right_image_path: String,

    /// The output path for the combined HEIF image.
    #[arg(short, long)]
    output_image_path: String,

    /// Horizontal field of view in degrees, used to derive camera intrinsics.
    #[arg(long, default_value_t = DEFAULT_HORIZONTAL_FOV_DEGREES)]
    fov: f64,

    /// JPEG quality for each stored image (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Print the written plan as JSON on stdout.
    #[arg(long)]
    dump_plan: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = PicCombiner::parse();
    logger::init();

    let config = CombineConfig::builder()
        .horizontal_fov_degrees(cli.fov)
        .jpeg_quality(cli.quality)
        .build();
    let pipeline = StereoPairPipeline::new(config);

    info!("Stereo combiner initialized");
    info!("Horizontal FOV: {} degrees", pipeline.config().horizontal_fov_degrees);

    let plan = match pipeline.convert_file(&cli.left_image_path, &cli.right_image_path, &cli.output_image_path) {
        Ok(plan) => plan,
        Err(e) => {
            error!("Combination failed: {}", e);
            return Err(e.into());
        }
    };
    info!("Wrote {}", cli.output_image_path);

    if cli.dump_plan {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }

    Ok(())
}
