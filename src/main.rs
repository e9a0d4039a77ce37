// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "qrscan")]
#[command(about = "Scan QR codes from a camera or image file")]
#[command(version = qrscan::constants::app_info::version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Scan from a camera until a code is found (or Ctrl+C with --continuous)
    Scan {
        /// Keep scanning after a code is found
        #[arg(short, long)]
        continuous: bool,

        /// Milliseconds between sampled frames
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Requested frame width
        #[arg(long)]
        width: Option<u32>,

        /// Requested frame height
        #[arg(long)]
        height: Option<u32>,

        /// Requested framerate
        #[arg(long)]
        fps: Option<u32>,

        /// Device path to use (from 'qrscan list')
        #[arg(short, long)]
        device: Option<String>,

        /// Replay an image file instead of opening a camera
        #[arg(long)]
        image: Option<PathBuf>,

        /// Config file (default: ~/.config/qrscan/config.json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print detections as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Decode a single image file
    Decode {
        /// Image file to decode
        path: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=qrscan=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_cameras()?,
        Commands::Scan {
            continuous,
            interval_ms,
            width,
            height,
            fps,
            device,
            image,
            config,
            json,
        } => cli::scan(cli::ScanArgs {
            continuous,
            interval_ms,
            width,
            height,
            fps,
            device,
            image,
            config,
            json,
        })?,
        Commands::Decode { path, json } => cli::decode_file(&path, json)?,
    }

    Ok(())
}
