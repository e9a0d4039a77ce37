// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture backend
//!
//! Enumerates `/dev/video*` capture nodes and streams frames with the `v4l`
//! crate. Each open stream runs its own capture thread that overwrites a
//! [`FrameSlot`], so readers always see the newest frame and nothing queues.

use super::frame_slot::FrameSlot;
use super::types::*;
use super::{CaptureBackend, CaptureStream};
use crate::constants::{capture, timing};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream as _;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::video::capture::Parameters;

/// VIDIOC_QUERYCAP ioctl number
const VIDIOC_QUERYCAP: libc::c_ulong = 0x80685600;

/// V4L2 capability flag for single-planar video capture
const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;

/// Formats tried in order when the caller has no strong preference
const PREFERRED_FORMATS: [PixelFormat; 3] =
    [PixelFormat::YUYV, PixelFormat::MJPEG, PixelFormat::Gray8];

/// How long a dequeue may block before the stop flag is re-checked
const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(200);

/// V4L2 capability structure for VIDIOC_QUERYCAP ioctl
#[repr(C)]
struct V4l2Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

/// Query V4L2 capabilities for an open file descriptor
fn query_v4l2_cap(fd: RawFd) -> Option<V4l2Capability> {
    // SAFETY: V4l2Capability is plain old data, all-zero is a valid value
    let mut cap: V4l2Capability = unsafe { std::mem::zeroed() };
    // SAFETY: fd is open for the duration of the call and cap matches the ioctl layout
    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCAP as _, &mut cap as *mut V4l2Capability) };
    if result < 0 { None } else { Some(cap) }
}

fn c_string(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).trim().to_string()
}

/// Card name of a node if it is a video capture node (not metadata/output)
fn probe_capture_node(device_path: &str) -> Option<String> {
    let file = std::fs::File::open(device_path).ok()?;
    let cap = query_v4l2_cap(file.as_raw_fd())?;

    // Use device_caps if available, otherwise capabilities
    let caps = if cap.device_caps != 0 {
        cap.device_caps
    } else {
        cap.capabilities
    };

    if caps & V4L2_CAP_VIDEO_CAPTURE == 0 {
        debug!(device_path, "Skipping non-capture V4L2 node");
        return None;
    }

    let card = c_string(&cap.card);
    debug!(device_path, card = %card, driver = %c_string(&cap.driver), "Found V4L2 capture node");
    Some(card)
}

/// Choose the pixel format to request from what the device advertises
fn choose_pixel_format(supported: &[PixelFormat], requested: PixelFormat) -> Option<PixelFormat> {
    if supported.contains(&requested) {
        return Some(requested);
    }
    PREFERRED_FORMATS
        .into_iter()
        .find(|format| supported.contains(format))
}

/// Backend for Video4Linux2 devices
#[derive(Debug, Default, Clone, Copy)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let mut nodes = v4l::context::enum_devices();
        nodes.sort_by_key(|node| node.index());

        let cameras: Vec<CameraDevice> = nodes
            .iter()
            .filter_map(|node| {
                let path = node.path().to_string_lossy().to_string();
                let card = probe_capture_node(&path)?;
                let name = if card.is_empty() {
                    node.name().unwrap_or_else(|| path.clone())
                } else {
                    card
                };
                let facing = CameraFacing::guess_from_name(&name);
                Some(CameraDevice::new(name, path, facing))
            })
            .collect();

        info!(count = cameras.len(), "Enumerated V4L2 cameras");
        cameras
    }

    fn open(
        &self,
        device: &CameraDevice,
        requested: &CameraFormat,
    ) -> BackendResult<Box<dyn CaptureStream>> {
        let stream = V4l2Stream::open(device, requested)?;
        Ok(Box::new(stream))
    }

    fn name(&self) -> &'static str {
        "v4l2"
    }
}

/// A running V4L2 capture
pub struct V4l2Stream {
    device_path: String,
    format: CameraFormat,
    slot: FrameSlot,
    running: Arc<AtomicBool>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl V4l2Stream {
    /// Open the device, negotiate a format and start the capture thread
    pub fn open(device: &CameraDevice, requested: &CameraFormat) -> BackendResult<Self> {
        info!(device = %device.name, path = %device.path, requested = %requested, "Opening V4L2 device");

        let dev = Device::with_path(&device.path).map_err(|e| {
            BackendError::InitializationFailed(format!("Failed to open {}: {}", device.path, e))
        })?;

        let supported: Vec<PixelFormat> = dev
            .enum_formats()
            .into_iter()
            .flatten()
            .filter_map(|desc| PixelFormat::from_fourcc(&desc.fourcc.repr))
            .collect();

        let pixel_format = choose_pixel_format(&supported, requested.pixel_format).ok_or_else(
            || {
                BackendError::FormatNotSupported(format!(
                    "{} offers none of YUYV, MJPG, GREY",
                    device.path
                ))
            },
        )?;

        let mut format = dev
            .format()
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to query format: {}", e))
            })?;
        format.width = requested.width;
        format.height = requested.height;
        format.fourcc = v4l::FourCC::new(&pixel_format.fourcc());

        let actual = dev
            .set_format(&format)
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to set format: {}", e))
            })?;

        let actual_pixel_format = PixelFormat::from_fourcc(&actual.fourcc.repr).ok_or_else(|| {
            BackendError::FormatNotSupported(format!("Device switched to {}", actual.fourcc))
        })?;

        let framerate = requested.framerate.and_then(|fps| {
            let wanted = (fps.num / fps.denom.max(1)).max(1);
            match dev.set_params(&Parameters::with_fps(wanted)) {
                Ok(params) => Some(Framerate::new(
                    params.interval.denominator,
                    params.interval.numerator,
                )),
                Err(e) => {
                    warn!(error = %e, fps = wanted, "Could not set framerate, using device default");
                    None
                }
            }
        });

        let negotiated = CameraFormat {
            width: actual.width,
            height: actual.height,
            framerate,
            pixel_format: actual_pixel_format,
        };

        if negotiated.width != requested.width || negotiated.height != requested.height {
            info!(requested = %requested, negotiated = %negotiated, "Device adjusted capture format");
        }

        let slot = FrameSlot::new();
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), String>>();

        let thread_handle = {
            let slot = slot.clone();
            let running = Arc::clone(&running);
            let stride = actual.stride;
            let device_path = device.path.clone();
            let format = negotiated.clone();
            std::thread::spawn(move || {
                if let Err(e) = capture_loop(dev, &format, stride, slot, running, ready_tx) {
                    error!(device_path = %device_path, error = %e, "V4L2 capture loop failed");
                }
            })
        };

        // The mmap stream is created on the capture thread; wait for it so a
        // failure surfaces from open() instead of as a silent empty stream
        let ready = ready_rx
            .recv()
            .map_err(|_| "Capture thread exited before starting".to_string())
            .and_then(|r| r);

        if let Err(e) = ready {
            running.store(false, Ordering::SeqCst);
            let _ = thread_handle.join();
            return Err(BackendError::InitializationFailed(e));
        }

        info!(path = %device.path, format = %negotiated, "V4L2 stream started");

        Ok(Self {
            device_path: device.path.clone(),
            format: negotiated,
            slot,
            running,
            thread_handle: Some(thread_handle),
        })
    }
}

impl CaptureStream for V4l2Stream {
    fn latest_frame(&self) -> Option<CameraFrame> {
        self.slot.latest()
    }

    fn format(&self) -> &CameraFormat {
        &self.format
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            info!(path = %self.device_path, "Stopping V4L2 stream");
            if handle.join().is_err() {
                warn!(path = %self.device_path, "V4L2 capture thread panicked");
            }
        }
        self.slot.clear();
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture loop running on the stream's thread
fn capture_loop(
    dev: Device,
    format: &CameraFormat,
    stride: u32,
    slot: FrameSlot,
    running: Arc<AtomicBool>,
    ready: std::sync::mpsc::Sender<Result<(), String>>,
) -> Result<(), String> {
    let mut stream =
        match MmapStream::with_buffers(&dev, Type::VideoCapture, capture::V4L2_BUFFER_COUNT) {
            Ok(stream) => stream,
            Err(e) => {
                let msg = format!("Failed to create buffer stream: {}", e);
                let _ = ready.send(Err(msg.clone()));
                return Err(msg);
            }
        };
    stream.set_timeout(DEQUEUE_TIMEOUT);
    let _ = ready.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        let frame_start = Instant::now();

        match stream.next() {
            Ok((buf, meta)) => {
                // MJPEG buffers are only partially filled
                let used = (meta.bytesused as usize).min(buf.len());
                let data = if used > 0 { &buf[..used] } else { buf };

                let frame = CameraFrame {
                    width: format.width,
                    height: format.height,
                    data: Arc::from(data),
                    format: format.pixel_format,
                    stride,
                    sequence: 0,
                    captured_at: frame_start,
                };

                let sequence = slot.publish(frame);
                if sequence % timing::FRAME_LOG_INTERVAL == 0 {
                    debug!(
                        sequence,
                        driver_sequence = meta.sequence,
                        size = data.len(),
                        "V4L2 frame captured"
                    );
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                warn!(error = %e, "Failed to dequeue V4L2 buffer");
                std::thread::sleep(timing::CAPTURE_RETRY_DELAY);
            }
        }
    }

    debug!("V4L2 capture loop ended");
    Ok(())
}
