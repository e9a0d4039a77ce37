// SPDX-License-Identifier: MPL-2.0

//! Barcode decoding capability
//!
//! The scan pipeline treats decoding as an opaque, possibly slow and
//! possibly failing call behind [`BarcodeDecoder`]. [`QrDecoder`] is the
//! built-in implementation on top of `rqrr`.

pub mod luma;
pub mod qr;

pub use luma::LumaPlane;
pub use qr::QrDecoder;

use crate::backends::camera::CameraFrame;
use crate::errors::DecodeError;
use serde::{Deserialize, Serialize};

/// Code families a decoder may be asked to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbology {
    /// ISO/IEC 18004 QR code
    QrCode,
}

/// How hard the decoder tries before giving up on a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecodeEffort {
    /// Downscale large frames and make a single pass
    Fast,
    /// Full resolution, plus a pass on inverted luma for light-on-dark codes
    #[default]
    Thorough,
}

/// Per-frame decoder options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Allow-list of symbologies to report
    pub formats: Vec<Symbology>,
    /// Retry with the frame rotated by 90° when the upright pass finds nothing
    pub auto_rotate: bool,
    pub effort: DecodeEffort,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            formats: vec![Symbology::QrCode],
            auto_rotate: true,
            effort: DecodeEffort::Thorough,
        }
    }
}

impl DecoderOptions {
    pub fn allows(&self, symbology: Symbology) -> bool {
        self.formats.contains(&symbology)
    }
}

/// A decoding capability
///
/// Implementations may block for an unbounded time and may fail; the
/// pipeline runs them off the scheduling path and maps every failure to
/// "no match".
pub trait BarcodeDecoder: Send + Sync {
    /// Decode at most one code from `frame`
    fn decode(
        &self,
        frame: &CameraFrame,
        options: &DecoderOptions,
    ) -> Result<Option<String>, DecodeError>;
}

impl<F> BarcodeDecoder for F
where
    F: Fn(&CameraFrame, &DecoderOptions) -> Result<Option<String>, DecodeError> + Send + Sync,
{
    fn decode(
        &self,
        frame: &CameraFrame,
        options: &DecoderOptions,
    ) -> Result<Option<String>, DecodeError> {
        self(frame, options)
    }
}
