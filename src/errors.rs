// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture-session errors
    Capture(CaptureError),
    /// Decoder errors
    Decode(DecodeError),
    /// Configuration errors
    Config(ConfigError),
    /// Backend errors outside a scan session (listing devices, loading files)
    Backend(BackendError),
    /// Generic error with message
    Other(String),
}

/// Errors surfaced by `ScanPipeline::start`
///
/// These are the only failures reported to the caller; everything that
/// happens once a session is active is handled inside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No capture device was enumerated
    NoDeviceAvailable,
    /// Camera access was not granted
    PermissionDenied,
    /// The device was found but could not be started
    DeviceStartFailed(String),
}

/// Errors raised by a decoding capability
///
/// The decode worker never propagates these; they are logged and
/// treated as "no code in this frame".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Pixel buffer is smaller than its declared geometry
    MalformedBuffer { expected: usize, actual: usize },
    /// Frame dimensions are zero or stride is narrower than a row
    InvalidGeometry(String),
    /// Compressed frame could not be decoded to pixels
    Image(String),
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Sampling interval must be greater than zero
    ZeroInterval,
    /// Requested width and height must be greater than zero
    InvalidResolution { width: u32, height: u32 },
    /// Requested framerate must be greater than zero
    ZeroFramerate,
    /// At least one symbology must be allowed
    EmptySymbologies,
    /// A decode timeout, when set, must be greater than zero
    ZeroDecodeTimeout,
    /// Config file could not be read or written
    Io(String),
    /// Config file is not valid JSON for this schema
    Parse(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Decode(e) => write!(f, "Decode error: {}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Backend(e) => write!(f, "Backend error: {}", e),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoDeviceAvailable => write!(f, "No camera device found"),
            CaptureError::PermissionDenied => write!(f, "Camera permission not granted"),
            CaptureError::DeviceStartFailed(msg) => write!(f, "Failed to start camera: {}", msg),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MalformedBuffer { expected, actual } => write!(
                f,
                "Malformed pixel buffer: expected {} bytes, got {}",
                expected, actual
            ),
            DecodeError::InvalidGeometry(msg) => write!(f, "Invalid frame geometry: {}", msg),
            DecodeError::Image(msg) => write!(f, "Image decode failed: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroInterval => write!(f, "Scan interval must be greater than zero"),
            ConfigError::InvalidResolution { width, height } => {
                write!(f, "Invalid requested resolution {}x{}", width, height)
            }
            ConfigError::ZeroFramerate => write!(f, "Framerate must be greater than zero"),
            ConfigError::EmptySymbologies => write!(f, "No symbologies enabled"),
            ConfigError::ZeroDecodeTimeout => write!(f, "Decode timeout must be positive"),
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for DecodeError {}
impl std::error::Error for ConfigError {}

// Conversions from sub-errors to AppError
impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        AppError::Decode(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<BackendError> for CaptureError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DeviceNotFound(_) => CaptureError::NoDeviceAvailable,
            other => CaptureError::DeviceStartFailed(other.to_string()),
        }
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        DecodeError::Image(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_maps_to_capture_error() {
        let missing: CaptureError = BackendError::DeviceNotFound("/dev/video9".into()).into();
        assert_eq!(missing, CaptureError::NoDeviceAvailable);

        let failed: CaptureError = BackendError::InitializationFailed("busy".into()).into();
        assert!(matches!(failed, CaptureError::DeviceStartFailed(msg) if msg.contains("busy")));
    }

    #[test]
    fn test_capture_error_status_text() {
        assert_eq!(CaptureError::NoDeviceAvailable.to_string(), "No camera device found");
        let app: AppError = CaptureError::PermissionDenied.into();
        assert_eq!(app.to_string(), "Capture error: Camera permission not granted");
    }
}
