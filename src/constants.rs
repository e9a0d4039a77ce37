// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Capture format requested when nothing else is configured
pub mod capture {
    /// Requested frame width in pixels
    pub const DEFAULT_WIDTH: u32 = 1280;

    /// Requested frame height in pixels
    pub const DEFAULT_HEIGHT: u32 = 720;

    /// Requested framerate
    pub const DEFAULT_FRAMERATE: u32 = 40;

    /// Frames at or below this width are treated as "not ready yet".
    /// Some drivers hand out a tiny placeholder frame right after streaming starts.
    pub const MIN_USABLE_FRAME_WIDTH: u32 = 100;

    /// Number of mmap buffers queued on a V4L2 stream
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Device-name fragments that identify a back / environment-facing camera
    pub const BACK_FACING_HINTS: &[&str] = &["back", "rear", "environment", "world"];

    /// Device-name fragments that identify a front / user-facing camera
    pub const FRONT_FACING_HINTS: &[&str] = &["front", "user", "selfie", "facetime"];
}

/// Sampling and decode timing
pub mod timing {
    use super::Duration;

    /// Interval between scheduler ticks
    pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(250);

    /// Log per-frame capture diagnostics every N frames
    pub const FRAME_LOG_INTERVAL: u64 = 60;

    /// Back-off after a failed V4L2 dequeue
    pub const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(10);
}

/// Decoder tuning
pub mod decoder {
    /// Frames are downscaled to this maximum dimension in fast mode.
    /// QR codes held up to a camera are large enough to survive it.
    pub const FAST_MAX_DIMENSION: u32 = 640;
}

/// Supported file formats for the still-image source
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application identity
pub mod app_info {
    /// Directory name used under the user's config dir
    pub const CONFIG_DIR_NAME: &str = "qrscan";

    /// Config file name
    pub const CONFIG_FILE_NAME: &str = "config.json";

    /// Version string including git metadata
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
