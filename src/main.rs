use facetag::{Config, FramePipeline};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "facetag")]
#[command(about = "Detect faces in images and label them with a classifier model")]
struct Cli {
    /// Config file (defaults to configs/facetag.toml, then ~/.config/facetag/facetag.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate images and save labelled copies
    Process {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for annotated images (defaults to each input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the labelled faces of an image as JSON
    Detect {
        input: PathBuf,
    },
    /// Validate the config and check that both models load
    CheckConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Process { inputs, output_dir } => {
            let pipeline = FramePipeline::from_config(&config)?;
            for input in &inputs {
                let output = output_path(input, output_dir.as_deref());
                process_image(&pipeline, input, &output)?;
                println!("{} -> {}", input.display(), output.display());
            }
        }
        Commands::Detect { input } => {
            let pipeline = FramePipeline::from_config(&config)?;
            let mut frame = image::open(&input)
                .with_context(|| format!("failed to open image {}", input.display()))?
                .to_rgba8();
            let reports = pipeline.annotate_frame(&mut frame);
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Commands::CheckConfig => {
            println!("Config OK");
            println!("  detector model: {}", config.models.detector_path.display());
            println!("  scorer model:   {}", config.models.scorer_path.display());
            println!("  scorer input:   {0}x{0}", config.scorer.input_size);

            let pipeline = FramePipeline::from_config(&config)?;
            if pipeline.detector_enabled() {
                println!("Both models loaded");
            } else {
                println!("Scorer loaded, detector unavailable (no faces will be found)");
            }
        }
    }

    Ok(())
}

fn process_image(pipeline: &FramePipeline, input: &Path, output: &Path) -> Result<()> {
    let frame = image::open(input)
        .with_context(|| format!("failed to open image {}", input.display()))?
        .to_rgba8();

    let annotated = pipeline.process_frame(frame);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    annotated
        .save(output)
        .with_context(|| format!("failed to save annotated image {}", output.display()))?;

    Ok(())
}

fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    let file_name = format!("{}_tagged_{}.png", stem, timestamp);

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}
