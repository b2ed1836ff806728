//! vcrop CLI — crop a rectangular region out of a video.
//!
//! Usage:
//!   vcrop crop -i <INPUT> -o <OUTPUT> -x <X> -y <Y> --width <W> --height <H>
//!   vcrop info <PATH>          Show video stream information

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "vcrop",
    about = "Crop a fixed rectangular region out of every frame of a video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the given region of every frame to a new file
    Crop {
        /// Input video (or .vcrp frame archive)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (file, or directory for image-dir)
        #[arg(short, long)]
        output: PathBuf,

        /// Left edge of the crop region, in pixels
        #[arg(short)]
        x: i32,

        /// Top edge of the crop region, in pixels
        #[arg(short)]
        y: i32,

        /// Crop width in pixels
        #[arg(short = 'w', long)]
        width: i32,

        /// Crop height in pixels (long-only; -h is help)
        #[arg(long)]
        height: i32,

        /// Output format: mp4-h264, mjpeg, archive, image-dir
        #[arg(long)]
        format: Option<String>,

        /// Output frame rate (defaults to the source rate)
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Show video stream information
    Info {
        /// Path to a video file or .vcrp frame archive
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = vcrop_common::config::AppConfig::load();
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    vcrop_common::logging::init_logging(&vcrop_common::config::LoggingConfig {
        level: log_level,
        json: config.logging.json,
        file: config.logging.file.clone(),
    });

    match cli.command {
        Commands::Crop {
            input,
            output,
            x,
            y,
            width,
            height,
            format,
            fps,
        } => commands::crop::run(&config, input, output, x, y, width, height, format, fps),
        Commands::Info { path } => commands::info::run(path),
    }
}
