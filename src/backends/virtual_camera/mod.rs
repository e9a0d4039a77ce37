// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera sources
//!
//! Frame sources that behave like capture devices without touching
//! hardware:
//!
//! - [`VirtualCameraBackend`]: the host pushes frames through a [`FrameFeed`]
//! - [`StillImageBackend`]: an image file replayed at the requested framerate

pub mod file_source;

pub use file_source::{StillImageBackend, load_image_as_frame};

use crate::backends::camera::{
    BackendError, BackendResult, CameraDevice, CameraFacing, CameraFormat, CameraFrame,
    CaptureBackend, CaptureStream, FrameSlot, Resolution,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

struct VirtualState {
    devices: Mutex<Vec<CameraDevice>>,
    slot: FrameSlot,
    streaming: AtomicBool,
    opens: AtomicU64,
    open_failure: Mutex<Option<String>>,
    negotiated: Mutex<Option<Resolution>>,
}

/// Capture backend fed programmatically
///
/// Frames pushed while no stream is open are dropped, the same way a real
/// device produces nothing while stopped.
#[derive(Clone)]
pub struct VirtualCameraBackend {
    state: Arc<VirtualState>,
}

impl Default for VirtualCameraBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualCameraBackend {
    /// Backend exposing a single back-facing virtual device
    pub fn new() -> Self {
        Self::with_devices(vec![CameraDevice::new(
            "Virtual Camera",
            "virtual:0",
            CameraFacing::Back,
        )])
    }

    /// Backend with no devices at all
    pub fn without_devices() -> Self {
        Self::with_devices(Vec::new())
    }

    pub fn with_devices(devices: Vec<CameraDevice>) -> Self {
        Self {
            state: Arc::new(VirtualState {
                devices: Mutex::new(devices),
                slot: FrameSlot::new(),
                streaming: AtomicBool::new(false),
                opens: AtomicU64::new(0),
                open_failure: Mutex::new(None),
                negotiated: Mutex::new(None),
            }),
        }
    }

    /// Handle for pushing frames into the active stream
    pub fn feed(&self) -> FrameFeed {
        FrameFeed {
            state: Arc::clone(&self.state),
        }
    }

    /// Make every subsequent `open` fail with `reason` (`None` clears it)
    pub fn set_open_failure(&self, reason: Option<&str>) {
        *self.state.open_failure.lock() = reason.map(str::to_string);
    }

    /// Report `resolution` as negotiated regardless of what was requested
    pub fn set_negotiated(&self, resolution: Option<Resolution>) {
        *self.state.negotiated.lock() = resolution;
    }

    /// Replace the enumerated device list
    pub fn set_devices(&self, devices: Vec<CameraDevice>) {
        *self.state.devices.lock() = devices;
    }

    /// Whether a stream is currently open
    pub fn is_streaming(&self) -> bool {
        self.state.streaming.load(Ordering::SeqCst)
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> u64 {
        self.state.opens.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for VirtualCameraBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.state.devices.lock().clone()
    }

    fn open(
        &self,
        device: &CameraDevice,
        requested: &CameraFormat,
    ) -> BackendResult<Box<dyn CaptureStream>> {
        if let Some(reason) = self.state.open_failure.lock().clone() {
            return Err(BackendError::InitializationFailed(reason));
        }
        if !self.state.devices.lock().contains(device) {
            return Err(BackendError::DeviceNotFound(device.path.clone()));
        }

        let mut format = requested.clone();
        if let Some(resolution) = *self.state.negotiated.lock() {
            format.width = resolution.width;
            format.height = resolution.height;
        }

        self.state.slot.clear();
        self.state.streaming.store(true, Ordering::SeqCst);
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        info!(device = %device.name, format = %format, "Virtual camera opened");

        Ok(Box::new(VirtualStream {
            state: Arc::clone(&self.state),
            format,
            stopped: false,
        }))
    }

    fn name(&self) -> &'static str {
        "virtual"
    }
}

/// Producer side of a [`VirtualCameraBackend`]
#[derive(Clone)]
pub struct FrameFeed {
    state: Arc<VirtualState>,
}

impl FrameFeed {
    /// Publish `frame` as the newest sample
    ///
    /// Returns the assigned sequence number, or `None` if no stream is open.
    pub fn push(&self, frame: CameraFrame) -> Option<u64> {
        if !self.state.streaming.load(Ordering::SeqCst) {
            debug!("Virtual camera not streaming, dropping frame");
            return None;
        }
        Some(self.state.slot.publish(frame))
    }

    /// Publish a tightly packed grayscale frame
    pub fn push_gray(&self, width: u32, height: u32, data: Vec<u8>) -> Option<u64> {
        self.push(CameraFrame::gray(width, height, data))
    }

    /// Total frames accepted so far
    pub fn published(&self) -> u64 {
        self.state.slot.published()
    }
}

struct VirtualStream {
    state: Arc<VirtualState>,
    format: CameraFormat,
    stopped: bool,
}

impl CaptureStream for VirtualStream {
    fn latest_frame(&self) -> Option<CameraFrame> {
        if self.stopped {
            return None;
        }
        self.state.slot.latest()
    }

    fn format(&self) -> &CameraFormat {
        &self.format
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.state.streaming.store(false, Ordering::SeqCst);
        self.state.slot.clear();
        debug!("Virtual camera stopped");
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        self.stop();
    }
}
