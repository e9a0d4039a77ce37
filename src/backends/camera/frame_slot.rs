// SPDX-License-Identifier: GPL-3.0-only

//! Single-frame mailbox between a capture thread and its readers
//!
//! Producers overwrite, readers peek. There is never more than one frame
//! held, so a slow reader only ever sees the newest sample.

use super::types::CameraFrame;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Latest-sample-wins frame holder, cheap to clone and share across threads
#[derive(Clone, Default)]
pub struct FrameSlot {
    latest: Arc<Mutex<Option<CameraFrame>>>,
    published: Arc<AtomicU64>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever frame is held with `frame`
    ///
    /// The frame is stamped with the next sequence number, which is returned.
    pub fn publish(&self, mut frame: CameraFrame) -> u64 {
        let sequence = self.published.fetch_add(1, Ordering::SeqCst) + 1;
        frame.sequence = sequence;
        *self.latest.lock() = Some(frame);
        sequence
    }

    /// Most recent frame, if any has been published since the last clear
    pub fn latest(&self) -> Option<CameraFrame> {
        self.latest.lock().clone()
    }

    /// Drop the held frame
    pub fn clear(&self) {
        self.latest.lock().take();
    }

    /// Total number of frames published through this slot
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for FrameSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSlot")
            .field("published", &self.published())
            .field("holding", &self.latest.lock().is_some())
            .finish()
    }
}
