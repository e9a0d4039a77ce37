// SPDX-License-Identifier: MPL-2.0

//! qrscan - real-time QR code scanning from a camera
//!
//! The crate samples frames from a capture device at a bounded rate, decodes
//! at most one frame at a time off the scheduling path, and reports each
//! detected payload to a registered listener.
//!
//! # Architecture
//!
//! - [`backends`]: capture devices (V4L2, virtual feed, still image) and permission
//! - [`decoder`]: the decoding capability and the built-in QR decoder
//! - [`pipeline`]: scheduler, decode worker, result dispatcher and lifecycle
//! - [`config`]: scan configuration
//!
//! # Example
//!
//! ```ignore
//! let pipeline = ScanPipeline::new(
//!     ScanConfig::default(),
//!     Arc::new(V4l2Backend::new()),
//!     Arc::new(DeviceNodePermission::default()),
//!     Arc::new(QrDecoder::new()),
//! )?;
//! pipeline.on_detected(|payload| println!("{}", payload));
//! pipeline.start().await?;
//! pipeline.stopped().await;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod errors;
pub mod pipeline;

// Re-export commonly used types
pub use config::ScanConfig;
pub use decoder::{BarcodeDecoder, DecoderOptions, QrDecoder};
pub use errors::{AppError, AppResult, CaptureError, ConfigError, DecodeError};
pub use pipeline::{DecodeOutcome, Detection, PipelineState, ScanPipeline};
