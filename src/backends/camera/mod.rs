// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │    ScanPipeline     │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │   CaptureSession    │  ← device selection, start/stop lifecycle
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureBackend Trait│  ← enumerate + open
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┬───────────┐
//!       ▼          ▼           ▼
//!    ┌─────┐  ┌─────────┐ ┌─────────┐
//!    │V4L2 │  │ Virtual │ │  Still  │
//!    └─────┘  └─────────┘ └─────────┘
//! ```

pub mod frame_loop;
pub mod frame_slot;
pub mod permission;
pub mod types;
pub mod v4l2;

pub use frame_slot::FrameSlot;
pub use permission::{AlwaysGranted, CameraPermission, DeviceNodePermission, PermissionStatus};
pub use types::*;

/// A source of capture devices
///
/// Implementations enumerate what is plugged in and open a streaming
/// handle for one device. Opening negotiates the format; the stream
/// reports what the device actually agreed to.
pub trait CaptureBackend: Send + Sync {
    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Open `device` and start streaming with a format as close to `requested` as possible
    fn open(
        &self,
        device: &CameraDevice,
        requested: &CameraFormat,
    ) -> BackendResult<Box<dyn CaptureStream>>;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;
}

/// A streaming capture device
pub trait CaptureStream: Send {
    /// Most recent frame produced by the device, if any
    fn latest_frame(&self) -> Option<CameraFrame>;

    /// Format the device actually negotiated
    fn format(&self) -> &CameraFormat;

    /// Stop streaming and release the device. Must be idempotent.
    fn stop(&mut self);
}

/// Pick the device to scan with
///
/// An explicitly requested path wins when it is present. Otherwise the first
/// back-facing (environment) camera is used, falling back to the first device.
pub fn select_device<'a>(
    devices: &'a [CameraDevice],
    preferred_path: Option<&str>,
) -> Option<&'a CameraDevice> {
    if let Some(path) = preferred_path {
        if let Some(device) = devices.iter().find(|d| d.path == path) {
            return Some(device);
        }
        tracing::warn!(path, "Configured camera not found, using default selection");
    }

    devices
        .iter()
        .find(|d| d.facing.is_environment())
        .or_else(|| devices.first())
}

/// Get the default hardware backend (V4L2)
pub fn get_default_backend() -> Box<dyn CaptureBackend> {
    Box::new(v4l2::V4l2Backend::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<CameraDevice> {
        vec![
            CameraDevice::new("Front Camera", "/dev/video0", CameraFacing::Front),
            CameraDevice::new("USB Webcam", "/dev/video2", CameraFacing::External),
            CameraDevice::new("Rear Camera", "/dev/video4", CameraFacing::Back),
        ]
    }

    #[test]
    fn test_prefers_back_facing() {
        let devices = devices();
        let selected = select_device(&devices, None).unwrap();
        assert_eq!(selected.path, "/dev/video4");
    }

    #[test]
    fn test_falls_back_to_first() {
        let devices: Vec<_> = devices()
            .into_iter()
            .filter(|d| d.facing != CameraFacing::Back)
            .collect();
        let selected = select_device(&devices, None).unwrap();
        assert_eq!(selected.path, "/dev/video0");
    }

    #[test]
    fn test_explicit_path_wins() {
        let devices = devices();
        let selected = select_device(&devices, Some("/dev/video2")).unwrap();
        assert_eq!(selected.name, "USB Webcam");

        // Unknown path falls back to policy
        let selected = select_device(&devices, Some("/dev/video9")).unwrap();
        assert_eq!(selected.path, "/dev/video4");
    }

    #[test]
    fn test_no_devices() {
        assert!(select_device(&[], None).is_none());
    }
}
