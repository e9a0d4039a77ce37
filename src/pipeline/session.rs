// SPDX-License-Identifier: GPL-3.0-only

//! Capture session: one opened device and its stream

use crate::backends::camera::{
    CameraDevice, CameraFrame, CaptureBackend, CaptureStream, Resolution, select_device,
};
use crate::config::ScanConfig;
use crate::errors::CaptureError;
use tracing::{debug, info, trace, warn};

/// Exclusive owner of an open capture stream
///
/// Created on start, stopped exactly once. After [`CaptureSession::stop`]
/// no frame is ever returned again.
pub struct CaptureSession {
    device: CameraDevice,
    stream: Box<dyn CaptureStream>,
    resolution: Resolution,
    min_frame_width: u32,
    stopped: bool,
}

impl CaptureSession {
    /// Select a device and start streaming
    ///
    /// May block while the device negotiates; call off the async runtime.
    pub fn open(backend: &dyn CaptureBackend, config: &ScanConfig) -> Result<Self, CaptureError> {
        let devices = backend.enumerate_cameras();
        debug!(backend = backend.name(), count = devices.len(), "Enumerated cameras");

        let device = select_device(&devices, config.device_path.as_deref())
            .ok_or(CaptureError::NoDeviceAvailable)?
            .clone();

        let requested = config.requested_format();
        info!(
            device = %device.name,
            facing = %device.facing,
            requested = %requested,
            "Opening camera"
        );

        let stream = backend.open(&device, &requested).map_err(|e| {
            warn!(device = %device.name, error = %e, "Failed to start camera");
            CaptureError::from(e)
        })?;

        let resolution = stream.format().resolution();
        if resolution != requested.resolution() {
            info!(
                requested = %requested.resolution(),
                negotiated = %resolution,
                "Camera negotiated a different resolution"
            );
        }

        Ok(Self {
            device,
            stream,
            resolution,
            min_frame_width: config.min_frame_width,
            stopped: false,
        })
    }

    /// Actual negotiated resolution
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    /// Newest usable frame, if any
    ///
    /// Frames no wider than the configured minimum are treated as not yet
    /// available; some devices emit a degenerate frame right after start.
    pub fn current_frame(&self) -> Option<CameraFrame> {
        if self.stopped {
            return None;
        }
        let frame = self.stream.latest_frame()?;
        if frame.width <= self.min_frame_width {
            trace!(width = frame.width, "Frame below usable size, skipping");
            return None;
        }
        Some(frame)
    }

    /// Release the device; further calls are no-ops
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.stream.stop();
        info!(device = %self.device.name, "Camera released");
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device)
            .field("resolution", &self.resolution)
            .field("stopped", &self.stopped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{CameraFacing, Resolution};
    use crate::backends::virtual_camera::VirtualCameraBackend;

    #[test]
    fn test_no_devices() {
        let backend = VirtualCameraBackend::without_devices();
        let err = CaptureSession::open(&backend, &ScanConfig::default()).unwrap_err();
        assert_eq!(err, CaptureError::NoDeviceAvailable);
    }

    #[test]
    fn test_prefers_back_facing_device() {
        let backend = VirtualCameraBackend::with_devices(vec![
            CameraDevice::new("Front", "virtual:0", CameraFacing::Front),
            CameraDevice::new("Rear", "virtual:1", CameraFacing::Back),
        ]);
        let session = CaptureSession::open(&backend, &ScanConfig::default()).unwrap();
        assert_eq!(session.device().path, "virtual:1");
    }

    #[test]
    fn test_open_failure_maps_to_start_failed() {
        let backend = VirtualCameraBackend::new();
        backend.set_open_failure(Some("busy"));
        let err = CaptureSession::open(&backend, &ScanConfig::default()).unwrap_err();
        assert!(matches!(err, CaptureError::DeviceStartFailed(_)));
    }

    #[test]
    fn test_reports_negotiated_resolution() {
        let backend = VirtualCameraBackend::new();
        backend.set_negotiated(Some(Resolution::new(640, 480)));
        let session = CaptureSession::open(&backend, &ScanConfig::default()).unwrap();
        assert_eq!(session.resolution(), Resolution::new(640, 480));
    }

    #[test]
    fn test_small_frames_are_not_usable() {
        let backend = VirtualCameraBackend::new();
        let feed = backend.feed();
        let mut session = CaptureSession::open(&backend, &ScanConfig::default()).unwrap();
        assert!(session.current_frame().is_none());

        feed.push_gray(16, 16, vec![0; 256]).unwrap();
        assert!(session.current_frame().is_none());

        let seq = feed.push_gray(200, 10, vec![0; 2000]).unwrap();
        assert_eq!(session.current_frame().unwrap().sequence, seq);

        session.stop();
        session.stop();
        assert!(!backend.is_streaming());
        assert!(session.current_frame().is_none());
    }
}
