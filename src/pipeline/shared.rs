// SPDX-License-Identifier: GPL-3.0-only

//! State shared between the public handle, the scan loop and decode tasks

use super::gate::SingleFlight;
use super::session::CaptureSession;
use super::state::PipelineState;
use super::worker::Detection;
use crate::errors::CaptureError;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Callback invoked with each accepted detection
pub type DetectionListener = Arc<dyn Fn(&Detection) + Send + Sync>;

/// Everything guarded by the pipeline lock
///
/// Ticks, decode results and start/stop all mutate this under one lock, so
/// a tick can never interleave with a transition caused by a result.
#[derive(Debug, Default)]
pub(crate) struct CoreInner {
    pub state: PipelineState,
    pub session: Option<CaptureSession>,
    /// Bumped on every start; stale ticks and results carry an old value
    pub generation: u64,
    pub last_error: Option<CaptureError>,
    /// Wakes the scan loop of the current session
    pub shutdown: Option<Arc<Notify>>,
    /// Background release of the previous session's device
    pub pending_release: Option<JoinHandle<()>>,
}

pub(crate) struct PipelineCore {
    inner: Mutex<CoreInner>,
    pub gate: SingleFlight,
    state_tx: watch::Sender<PipelineState>,
    continuous: AtomicBool,
    listener: RwLock<Option<DetectionListener>>,
}

impl PipelineCore {
    pub fn new(continuous: bool) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        Self {
            inner: Mutex::new(CoreInner::default()),
            gate: SingleFlight::new(),
            state_tx,
            continuous: AtomicBool::new(continuous),
            listener: RwLock::new(None),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, CoreInner> {
        self.inner.lock()
    }

    /// Move to `next` and publish it to subscribers
    ///
    /// Called with the lock held so subscribers observe transitions in order.
    pub fn transition(&self, inner: &mut CoreInner, next: PipelineState) {
        if inner.state == next {
            return;
        }
        debug!(
            from = %inner.state,
            to = %next,
            generation = inner.generation,
            "Pipeline state change"
        );
        inner.state = next;
        self.state_tx.send_replace(next);
    }

    /// Whether the start that bumped the generation to `generation` is still pending
    pub fn is_starting(&self, generation: u64) -> bool {
        let inner = self.lock();
        inner.generation == generation && inner.state == PipelineState::Starting
    }

    /// Mark the pipeline stopped and hand back the session for release
    ///
    /// The session is returned rather than stopped here so the device can be
    /// released without holding the lock.
    pub fn stop_locked(&self, inner: &mut CoreInner) -> Option<CaptureSession> {
        if let Some(shutdown) = inner.shutdown.take() {
            shutdown.notify_one();
        }
        self.transition(inner, PipelineState::Stopped);
        inner.session.take()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous.load(Ordering::SeqCst)
    }

    pub fn set_continuous(&self, continuous: bool) {
        self.continuous.store(continuous, Ordering::SeqCst);
    }

    pub fn set_listener(&self, listener: Option<DetectionListener>) {
        *self.listener.write() = listener;
    }

    pub fn listener(&self) -> Option<DetectionListener> {
        self.listener.read().clone()
    }
}
