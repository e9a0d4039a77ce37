// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraFormat, Framerate, PixelFormat};
use crate::constants::{app_info, capture, timing};
use crate::decoder::DecoderOptions;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Scan session configuration
///
/// Read once when a session starts; changing the file or the struct later
/// does not affect a running pipeline (the continuous toggle is the one
/// runtime switch, see `ScanPipeline::set_continuous`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Requested frame width
    pub width: u32,
    /// Requested frame height
    pub height: u32,
    /// Requested framerate
    pub framerate: u32,
    /// Time between sampling ticks in milliseconds
    pub interval_ms: u64,
    /// Keep scanning after a detection instead of stopping
    pub continuous: bool,
    /// Options passed to the decoder on every frame
    pub decoder: DecoderOptions,
    /// Report a decode as "no match" if it runs longer than this
    pub decode_timeout_ms: Option<u64>,
    /// Frames no wider than this are ignored
    pub min_frame_width: u32,
    /// Device node to use instead of automatic selection
    pub device_path: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            width: capture::DEFAULT_WIDTH,
            height: capture::DEFAULT_HEIGHT,
            framerate: capture::DEFAULT_FRAMERATE,
            interval_ms: timing::DEFAULT_SCAN_INTERVAL.as_millis() as u64,
            continuous: false,
            decoder: DecoderOptions::default(),
            decode_timeout_ms: None,
            min_frame_width: capture::MIN_USABLE_FRAME_WIDTH,
            device_path: None,
        }
    }
}

impl ScanConfig {
    /// Check the invariants a session relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidResolution {
                width: self.width,
                height: self.height,
            });
        }
        if self.framerate == 0 {
            return Err(ConfigError::ZeroFramerate);
        }
        if self.decoder.formats.is_empty() {
            return Err(ConfigError::EmptySymbologies);
        }
        if self.decode_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroDecodeTimeout);
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn decode_timeout(&self) -> Option<Duration> {
        self.decode_timeout_ms.map(Duration::from_millis)
    }

    /// Format to request from the capture backend
    pub fn requested_format(&self) -> CameraFormat {
        CameraFormat {
            width: self.width,
            height: self.height,
            framerate: Some(Framerate::from_int(self.framerate)),
            pixel_format: PixelFormat::YUYV,
        }
    }

    /// Default location: `$XDG_CONFIG_HOME/qrscan/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(app_info::CONFIG_DIR_NAME)
                .join(app_info::CONFIG_FILE_NAME)
        })
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ScanConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded scan config");
        Ok(config)
    }

    /// Load from the default location, falling back to defaults if absent
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved scan config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interval(), Duration::from_millis(250));
        assert_eq!(config.requested_format().width, 1280);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = ScanConfig {
            interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        let config = ScanConfig {
            height: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidResolution {
                width: 1280,
                height: 0
            })
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ScanConfig =
            serde_json::from_str(r#"{ "continuous": true, "interval_ms": 100 }"#).unwrap();
        assert!(config.continuous);
        assert_eq!(config.interval_ms, 100);
        assert_eq!(config.framerate, capture::DEFAULT_FRAMERATE);
    }
}
