// SPDX-License-Identifier: GPL-3.0-only

//! Periodic frame sampling

use super::gate::FlightPermit;
use super::shared::PipelineCore;
use super::state::PipelineState;
use crate::backends::camera::CameraFrame;
use crate::constants::timing::FRAME_LOG_INTERVAL;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, trace};

/// A frame cleared for decoding, with the permit that blocks the next one
#[derive(Debug)]
pub struct Dispatch {
    pub frame: CameraFrame,
    pub generation: u64,
    pub permit: FlightPermit,
}

/// Decides on each tick whether a decode may be dispatched
///
/// Frames produced between ticks are never queued: each tick looks only at
/// the newest one.
#[derive(Debug)]
pub struct FrameScheduler {
    interval: Duration,
    dispatched: AtomicU64,
}

impl FrameScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            dispatched: AtomicU64::new(0),
        }
    }

    /// Ticker for the scan loop; late ticks are skipped, not bunched
    pub fn ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    /// Run one sampling decision for the session `generation`
    pub(crate) fn on_tick(&self, core: &PipelineCore, generation: u64) -> Option<Dispatch> {
        let mut inner = core.lock();
        if inner.generation != generation || inner.state != PipelineState::Active {
            return None;
        }

        let Some(frame) = inner.session.as_ref().and_then(|s| s.current_frame()) else {
            trace!("No usable frame yet, skipping tick");
            return None;
        };

        let Some(permit) = core.gate.try_acquire() else {
            trace!("Previous decode still running, skipping tick");
            return None;
        };

        core.transition(&mut inner, PipelineState::AwaitingDecode);

        let count = self.dispatched.fetch_add(1, Ordering::Relaxed) + 1;
        if count % FRAME_LOG_INTERVAL == 1 {
            debug!(
                sequence = frame.sequence,
                width = frame.width,
                height = frame.height,
                dispatched = count,
                "Dispatching frame for decode"
            );
        }

        Some(Dispatch {
            frame,
            generation,
            permit,
        })
    }

    /// Number of decodes dispatched by this scheduler
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}
