// SPDX-License-Identifier: GPL-3.0-only
//! Paced frame producer threads
//!
//! Synthetic sources (the still-image replay) publish frames from a thread
//! owned by a [`FrameProducer`]. The thread sleeps between frames with
//! `park_timeout`, so stopping wakes it immediately instead of waiting out
//! the frame period.

use super::frame_slot::FrameSlot;
use super::types::CameraFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Owns a thread that publishes one frame per period into a [`FrameSlot`]
pub struct FrameProducer {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    name: String,
}

impl FrameProducer {
    /// Start publishing frames from `next_frame` every `period`
    ///
    /// The thread ends when `next_frame` returns `None` or `stop` is called.
    pub fn spawn<F>(name: &str, slot: FrameSlot, period: Duration, mut next_frame: F) -> Self
    where
        F: FnMut() -> Option<CameraFrame> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread_name = name.to_string();

        info!(name, period_ms = period.as_millis(), "Starting frame producer");

        let handle = thread::spawn(move || {
            let mut next_due = Instant::now();

            while !stop_flag.load(Ordering::SeqCst) {
                let Some(mut frame) = next_frame() else {
                    debug!(name = %thread_name, "Frame source exhausted");
                    break;
                };
                frame.captured_at = Instant::now();
                slot.publish(frame);

                next_due += period;
                let now = Instant::now();
                if next_due > now {
                    thread::park_timeout(next_due - now);
                } else {
                    // Fell behind; do not try to catch up with a burst
                    next_due = now;
                }
            }

            debug!(name = %thread_name, published = slot.published(), "Frame producer exiting");
        });

        Self {
            handle: Some(handle),
            stop,
            name: name.to_string(),
        }
    }

    /// Whether the producer thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and wait for it; further calls are no-ops
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!(name = %self.name, "Frame producer thread panicked");
            }
        }
    }
}

impl Drop for FrameProducer {
    fn drop(&mut self) {
        self.stop();
    }
}
