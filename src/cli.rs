// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Scanning from a camera or a replayed image
//! - Decoding a single image file

use chrono::{DateTime, Local};
use qrscan::backends::camera::{
    AlwaysGranted, CameraPermission, CaptureBackend, DeviceNodePermission, get_default_backend,
    select_device,
};
use qrscan::backends::virtual_camera::{StillImageBackend, load_image_as_frame};
use qrscan::{AppError, AppResult, BarcodeDecoder, Detection, QrDecoder, ScanConfig, ScanPipeline};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Flags for `qrscan scan`
pub struct ScanArgs {
    pub continuous: bool,
    pub interval_ms: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub device: Option<String>,
    pub image: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
}

/// One line of `--json` output
#[derive(Serialize)]
struct DetectionRecord<'a> {
    payload: &'a str,
    timestamp: String,
}

fn print_detection(payload: &str, timestamp: DateTime<Local>, json: bool) {
    if !json {
        println!("{}", payload);
        return;
    }
    let record = DetectionRecord {
        payload,
        timestamp: timestamp.to_rfc3339(),
    };
    match serde_json::to_string(&record) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize detection"),
    }
}

/// List all available cameras
pub fn list_cameras() -> AppResult<()> {
    let backend = get_default_backend();
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    let default_path = select_device(&cameras, None).map(|d| d.path.clone());

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let marker = if Some(&camera.path) == default_path.as_ref() {
            " (default)"
        } else {
            ""
        };
        println!("  [{}] {}{}", index, camera.name, marker);
        println!("      Path: {}", camera.path);
        println!("      Facing: {}", camera.facing);
        println!();
    }

    Ok(())
}

/// Resolve the effective config: file first, then flags on top
fn build_config(args: &ScanArgs) -> AppResult<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::load_or_default()?,
    };

    if args.continuous {
        config.continuous = true;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.interval_ms = interval_ms;
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(fps) = args.fps {
        config.framerate = fps;
    }
    if let Some(device) = &args.device {
        config.device_path = Some(device.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Scan until a code is found, or until Ctrl+C in continuous mode
pub fn scan(args: ScanArgs) -> AppResult<()> {
    let config = build_config(&args)?;

    let (backend, permission): (Arc<dyn CaptureBackend>, Arc<dyn CameraPermission>) =
        match &args.image {
            Some(path) => (
                Arc::new(StillImageBackend::open_file(path)?),
                Arc::new(AlwaysGranted),
            ),
            None => (
                Arc::from(get_default_backend()),
                Arc::new(DeviceNodePermission::default()),
            ),
        };

    let pipeline = Arc::new(ScanPipeline::new(
        config,
        backend,
        permission,
        Arc::new(QrDecoder::new()),
    )?);

    let json = args.json;
    pipeline.on_detection(move |detection: &Detection| {
        print_detection(&detection.payload, detection.timestamp, json)
    });

    {
        let pipeline = Arc::clone(&pipeline);
        ctrlc::set_handler(move || pipeline.stop())
            .map_err(|e| AppError::Other(format!("Failed to install Ctrl+C handler: {}", e)))?;
    }

    // Create async runtime for the pipeline
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| AppError::Other(format!("Failed to start runtime: {}", e)))?;

    rt.block_on(async {
        let resolution = pipeline.start().await?;
        eprintln!("Scanning at {} (Ctrl+C to stop)", resolution);
        pipeline.stopped().await;
        Ok::<_, AppError>(())
    })
}

/// Decode one image file and print the payload
pub fn decode_file(path: &Path, json: bool) -> AppResult<()> {
    let frame = load_image_as_frame(path)?;
    let config = ScanConfig::load_or_default()?;

    match QrDecoder::new().decode(&frame, &config.decoder)? {
        Some(payload) => {
            print_detection(&payload, Local::now(), json);
            Ok(())
        }
        None => Err(AppError::Other(format!(
            "No QR code found in {}",
            path.display()
        ))),
    }
}
