// SPDX-License-Identifier: GPL-3.0-only

//! Still-image frame source
//!
//! Replays a single image file as a camera stream. Useful for scanning a
//! saved screenshot or photo with the same pipeline used for live capture.

use crate::backends::camera::frame_loop::FrameProducer;
use crate::backends::camera::{
    BackendError, BackendResult, CameraDevice, CameraFacing, CameraFormat, CameraFrame,
    CaptureBackend, CaptureStream, FrameSlot, Framerate, PixelFormat,
};
use crate::constants::file_formats;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Load an image file as an RGBA camera frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(BackendError::FormatNotSupported(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();
    let data: Vec<u8> = rgba.into_raw();

    info!(width, height, "Image loaded successfully");

    Ok(CameraFrame {
        data: Arc::from(data.into_boxed_slice()),
        width,
        height,
        stride: width * 4, // RGBA = 4 bytes per pixel
        format: PixelFormat::RGBA,
        sequence: 0,
        captured_at: Instant::now(),
    })
}

/// Backend exposing one image file as a camera
pub struct StillImageBackend {
    path: PathBuf,
    frame: CameraFrame,
}

impl StillImageBackend {
    /// Load `path` eagerly so a bad file fails before scanning starts
    pub fn open_file(path: impl Into<PathBuf>) -> BackendResult<Self> {
        let path = path.into();
        let frame = load_image_as_frame(&path)?;
        Ok(Self { path, frame })
    }

    fn device(&self) -> CameraDevice {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        CameraDevice::new(
            name,
            self.path.to_string_lossy().to_string(),
            CameraFacing::External,
        )
    }
}

impl CaptureBackend for StillImageBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![self.device()]
    }

    fn open(
        &self,
        device: &CameraDevice,
        requested: &CameraFormat,
    ) -> BackendResult<Box<dyn CaptureStream>> {
        if device.path != self.device().path {
            return Err(BackendError::DeviceNotFound(device.path.clone()));
        }

        // The image dictates the geometry, only the rate is honoured
        let framerate = requested.framerate.unwrap_or_default();
        let format = CameraFormat {
            width: self.frame.width,
            height: self.frame.height,
            framerate: Some(framerate),
            pixel_format: self.frame.format,
        };

        Ok(Box::new(StillImageStream::start(
            &device.name,
            self.frame.clone(),
            format,
            framerate,
        )))
    }

    fn name(&self) -> &'static str {
        "still-image"
    }
}

struct StillImageStream {
    format: CameraFormat,
    slot: FrameSlot,
    producer: FrameProducer,
}

impl StillImageStream {
    fn start(name: &str, frame: CameraFrame, format: CameraFormat, framerate: Framerate) -> Self {
        let slot = FrameSlot::new();
        let period = framerate
            .frame_duration()
            .unwrap_or_else(|| Framerate::default().frame_duration().unwrap_or_default());

        let producer = FrameProducer::spawn(
            &format!("still-image:{}", name),
            slot.clone(),
            period,
            move || Some(frame.clone()),
        );

        Self {
            format,
            slot,
            producer,
        }
    }
}

impl CaptureStream for StillImageStream {
    fn latest_frame(&self) -> Option<CameraFrame> {
        self.slot.latest()
    }

    fn format(&self) -> &CameraFormat {
        &self.format
    }

    fn stop(&mut self) {
        self.producer.stop();
        self.slot.clear();
    }
}
