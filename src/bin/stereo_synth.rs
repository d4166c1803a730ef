use std::path::PathBuf;

use clap::Parser;
use pic_combiner_rs::image_pipeline::{
    CombineConfig, DEFAULT_HORIZONTAL_FOV_DEGREES, StereoSynthesisPipeline, SynthesisConfig,
    synthesis::{DEFAULT_LEFT_SHIFT, DEFAULT_RIGHT_SHIFT},
};
use pic_combiner_rs::logger;

use tracing::{error, info};

/// Build a stereo-pair HEIF from one photo and its depth map.
#[derive(Parser)]
#[command(version, about)]
struct StereoSynth {
    /// The source photo.
    #[arg(short, long)]
    photo: String,

    /// Grayscale depth image matching the photo, brighter meaning nearer.
    #[arg(short, long)]
    depth: String,

    /// The output HEIF path.
    #[arg(short, long)]
    output: String,

    /// Maximum pixel shift for the left view.
    #[arg(long, default_value_t = DEFAULT_LEFT_SHIFT)]
    left_shift: u32,

    /// Maximum pixel shift for the right view.
    #[arg(long, default_value_t = DEFAULT_RIGHT_SHIFT)]
    right_shift: u32,

    /// Horizontal field of view in degrees.
    #[arg(long, default_value_t = DEFAULT_HORIZONTAL_FOV_DEGREES)]
    fov: f64,

    /// Also save the synthesized views as PNG files in this directory.
    #[arg(long)]
    views_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = StereoSynth::parse();
    logger::init();

    let config = CombineConfig::builder().horizontal_fov_degrees(cli.fov).build();
    let synthesis = SynthesisConfig {
        left_shift: cli.left_shift,
        right_shift: cli.right_shift,
    };
    let pipeline = StereoSynthesisPipeline::new(config, synthesis);

    match pipeline.convert_file(&cli.photo, &cli.depth, &cli.output, cli.views_dir.as_deref()) {
        Ok(_) => {
            info!("Wrote {}", cli.output);
            Ok(())
        }
        Err(e) => {
            error!("Stereo synthesis failed: {}", e);
            Err(e.into())
        }
    }
}
