use clap::Parser;
use pic_combiner_rs::image_pipeline::inspect_file;
use pic_combiner_rs::logger;

/// Print the items, properties and groups of a HEIF file as JSON.
#[derive(Parser)]
#[command(version, about)]
struct HeifInspect {
    /// The HEIF file to inspect.
    path: String,
}

fn main() -> anyhow::Result<()> {
    let cli = HeifInspect::parse();
    logger::init_with_default("warn");

    let summary = inspect_file(&cli.path)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(group) = summary.stereo_group() {
        eprintln!(
            "stereo pair: left = entry {}, right = entry {}",
            group.left_image_index, group.right_image_index
        );
    }
    Ok(())
}
