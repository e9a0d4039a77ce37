// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for frame capture
//!
//! The backend layer abstracts where frames come from, providing a
//! consistent API to the scan pipeline regardless of the source:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                Scan Pipeline                 │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │   Camera    │    │ Virtual Camera   │   │
//! │  │   (V4L2)    │    │ (feed / image)   │   │
//! │  └─────────────┘    └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Backend traits, device selection, permission and V4L2 capture
//! - [`virtual_camera`]: Frame sources that do not need hardware

pub mod camera;
pub mod virtual_camera;
