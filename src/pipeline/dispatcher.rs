// SPDX-License-Identifier: GPL-3.0-only

//! Applies decode outcomes to the pipeline state

use super::session::CaptureSession;
use super::shared::PipelineCore;
use super::state::PipelineState;
use super::worker::{CompletedDecode, DecodeOutcome, Detection};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Continuous / single-shot policy and listener notification
#[derive(Debug, Default)]
pub struct ResultDispatcher;

impl ResultDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Handle one completed decode
    ///
    /// Results for a stopped or restarted session are dropped without any
    /// notification. A detection is reported before a single-shot session
    /// is stopped.
    pub(crate) fn on_outcome(&self, core: &PipelineCore, completed: CompletedDecode) {
        let CompletedDecode {
            generation,
            sequence,
            outcome,
        } = completed;

        let detection = {
            let mut inner = core.lock();
            if inner.generation != generation || inner.state != PipelineState::AwaitingDecode {
                debug!(
                    sequence,
                    generation,
                    current = inner.generation,
                    state = %inner.state,
                    "Discarding decode result for inactive session"
                );
                return;
            }

            match outcome {
                DecodeOutcome::NoMatch => {
                    core.transition(&mut inner, PipelineState::Active);
                    return;
                }
                DecodeOutcome::Detected { payload, timestamp } => {
                    info!(sequence, %timestamp, len = payload.len(), "Code detected");
                    Detection { payload, timestamp }
                }
            }
        };

        // Listener runs unlocked so it may call back into the pipeline
        if let Some(listener) = core.listener()
            && catch_unwind(AssertUnwindSafe(|| listener(&detection))).is_err()
        {
            warn!(sequence, "Detection listener panicked");
        }

        let mut inner = core.lock();
        if inner.generation != generation || inner.state != PipelineState::AwaitingDecode {
            // Stopped or restarted from inside the listener
            return;
        }
        if core.is_continuous() {
            core.transition(&mut inner, PipelineState::Active);
        } else {
            info!("Single-shot scan complete, stopping");
            let released = core.stop_locked(&mut inner);
            inner.pending_release = released.and_then(release_session);
        }
    }
}

/// Stop a session without blocking the scan loop
///
/// Joining a capture thread can take a full dequeue timeout, so inside a
/// runtime the release runs on the blocking pool and the next `start()`
/// waits for it. Outside a runtime the session is stopped in place.
fn release_session(mut session: CaptureSession) -> Option<JoinHandle<()>> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Some(handle.spawn_blocking(move || session.stop())),
        Err(_) => {
            session.stop();
            None
        }
    }
}
