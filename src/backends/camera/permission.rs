// SPDX-License-Identifier: GPL-3.0-only

//! Camera access permission
//!
//! Permission is checked once per `start()` before any device is opened.
//! The check is asynchronous because on some platforms it prompts the user.

use futures::future::BoxFuture;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Grants or denies access to capture devices
pub trait CameraPermission: Send + Sync {
    /// Check (and if needed request) camera access
    fn request(&self) -> BoxFuture<'_, PermissionStatus>;
}

/// Permission provider for hosts that handle access themselves
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl CameraPermission for AlwaysGranted {
    fn request(&self) -> BoxFuture<'_, PermissionStatus> {
        Box::pin(async { PermissionStatus::Granted })
    }
}

/// Checks read/write access to V4L2 device nodes
///
/// Access is granted if at least one `video*` node under the device directory
/// is accessible to this process, or if there are no nodes at all (in which
/// case device enumeration reports the missing camera instead).
#[derive(Debug, Clone)]
pub struct DeviceNodePermission {
    dev_dir: PathBuf,
}

impl Default for DeviceNodePermission {
    fn default() -> Self {
        Self::new("/dev")
    }
}

impl DeviceNodePermission {
    pub fn new(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
        }
    }

    fn check(&self) -> PermissionStatus {
        let entries = match std::fs::read_dir(&self.dev_dir) {
            Ok(entries) => entries,
            Err(_) => return PermissionStatus::Granted,
        };

        let nodes: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("video"))
            })
            .collect();

        if nodes.is_empty() {
            return PermissionStatus::Granted;
        }

        if nodes.iter().any(|node| is_accessible(node)) {
            PermissionStatus::Granted
        } else {
            debug!(nodes = nodes.len(), "No accessible video device nodes");
            PermissionStatus::Denied
        }
    }
}

impl CameraPermission for DeviceNodePermission {
    fn request(&self) -> BoxFuture<'_, PermissionStatus> {
        Box::pin(async move { self.check() })
    }
}

fn is_accessible(path: &Path) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_encoded_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
    unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) == 0 }
}
