// SPDX-License-Identifier: GPL-3.0-only

//! QR code decoder built on rqrr

use super::{BarcodeDecoder, DecodeEffort, DecoderOptions, LumaPlane, Symbology};
use crate::backends::camera::CameraFrame;
use crate::constants::decoder::FAST_MAX_DIMENSION;
use crate::errors::DecodeError;
use std::time::Instant;
use tracing::{debug, trace};

/// Decodes the first readable QR code in a frame
#[derive(Debug, Clone)]
pub struct QrDecoder {
    fast_max_dimension: u32,
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDecoder {
    pub fn new() -> Self {
        Self {
            fast_max_dimension: FAST_MAX_DIMENSION,
        }
    }

    /// Run detection on an already converted plane
    pub fn decode_plane(&self, plane: &LumaPlane, options: &DecoderOptions) -> Option<String> {
        if let Some(content) = scan_plane(plane) {
            return Some(content);
        }

        if options.effort == DecodeEffort::Thorough
            && let Some(content) = scan_plane(&plane.inverted())
        {
            trace!("QR code found on inverted pass");
            return Some(content);
        }

        if options.auto_rotate
            && let Some(content) = scan_plane(&plane.rotated_90())
        {
            trace!("QR code found on rotated pass");
            return Some(content);
        }

        None
    }
}

impl BarcodeDecoder for QrDecoder {
    fn decode(
        &self,
        frame: &CameraFrame,
        options: &DecoderOptions,
    ) -> Result<Option<String>, DecodeError> {
        if !options.allows(Symbology::QrCode) {
            trace!("QR codes not in allow-list, skipping frame");
            return Ok(None);
        }

        let start = Instant::now();

        let mut plane = LumaPlane::from_frame(frame)?;
        if options.effort == DecodeEffort::Fast {
            plane = plane.fit_within(self.fast_max_dimension);
        }

        let result = self.decode_plane(&plane, options);

        debug!(
            width = frame.width,
            height = frame.height,
            detect_width = plane.width,
            detect_height = plane.height,
            found = result.is_some(),
            elapsed_ms = start.elapsed().as_millis(),
            "QR detection complete"
        );

        Ok(result)
    }
}

/// Detect grids on one plane and return the first that decodes
fn scan_plane(plane: &LumaPlane) -> Option<String> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        plane.width as usize,
        plane.height as usize,
        |x, y| plane.get(x, y),
    );

    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_meta, content)) => return Some(content),
            Err(e) => {
                debug!(error = ?e, "Failed to decode QR grid");
            }
        }
    }

    None
}
