// SPDX-License-Identifier: GPL-3.0-only

//! Real-time scan pipeline
//!
//! Samples the newest camera frame at a fixed interval, hands at most one
//! frame at a time to a [`BarcodeDecoder`] running on the blocking pool, and
//! notifies a listener when a code is found.
//!
//! ```text
//! FrameScheduler --frame--> DecodeWorker --outcome--> ResultDispatcher
//!       ^                                                   |
//!       +------------- CaptureSession <------ stop ---------+
//! ```
//!
//! Ticks and decode results are handled on one task, and every state change
//! happens under a single lock. A result that arrives after `stop()`, or
//! for an earlier session, is discarded.

pub mod dispatcher;
pub mod gate;
pub mod scheduler;
pub mod session;
mod shared;
pub mod state;
pub mod worker;

pub use dispatcher::ResultDispatcher;
pub use gate::{FlightPermit, SingleFlight};
pub use scheduler::{Dispatch, FrameScheduler};
pub use session::CaptureSession;
pub use shared::DetectionListener;
pub use state::PipelineState;
pub use worker::{CompletedDecode, DecodeOutcome, DecodeWorker, Detection, decode_guarded};

use crate::backends::camera::{CameraPermission, CaptureBackend, Resolution};
use crate::config::ScanConfig;
use crate::decoder::BarcodeDecoder;
use crate::errors::{CaptureError, ConfigError};
use shared::PipelineCore;
use std::sync::Arc;
use tokio::sync::{Notify, mpsc, watch};
use tracing::{debug, info, warn};

/// Handle to a scan pipeline
///
/// `start` must be awaited inside a Tokio runtime. Dropping the handle
/// stops any running session.
pub struct ScanPipeline {
    config: ScanConfig,
    core: Arc<PipelineCore>,
    backend: Arc<dyn CaptureBackend>,
    permission: Arc<dyn CameraPermission>,
    decoder: Arc<dyn BarcodeDecoder>,
}

impl ScanPipeline {
    pub fn new(
        config: ScanConfig,
        backend: Arc<dyn CaptureBackend>,
        permission: Arc<dyn CameraPermission>,
        decoder: Arc<dyn BarcodeDecoder>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: Arc::new(PipelineCore::new(config.continuous)),
            config,
            backend,
            permission,
            decoder,
        })
    }

    /// Acquire a camera and begin scanning
    ///
    /// Returns the negotiated resolution. Starting an already scanning
    /// pipeline is a no-op that returns the current resolution.
    pub async fn start(&self) -> Result<Resolution, CaptureError> {
        let (generation, pending_release) = {
            let mut inner = self.core.lock();
            match inner.state {
                PipelineState::Active | PipelineState::AwaitingDecode => {
                    if let Some(session) = inner.session.as_ref() {
                        debug!("Start requested while scanning, ignoring");
                        return Ok(session.resolution());
                    }
                }
                PipelineState::Starting => {
                    return Err(CaptureError::DeviceStartFailed(
                        "start already in progress".to_string(),
                    ));
                }
                PipelineState::Idle | PipelineState::Stopped => {}
            }
            inner.generation += 1;
            inner.last_error = None;
            self.core.transition(&mut inner, PipelineState::Starting);
            (inner.generation, inner.pending_release.take())
        };

        let _guard = StartGuard {
            core: &self.core,
            generation,
        };

        if let Some(pending) = pending_release
            && pending.await.is_err()
        {
            warn!("Releasing the previous camera session panicked");
        }

        if !self.permission.request().await.is_granted() {
            return self.fail_start(generation, CaptureError::PermissionDenied);
        }
        if !self.core.is_starting(generation) {
            warn!("Scan stopped while waiting for camera permission");
            return Err(stopped_while_starting());
        }

        let backend = Arc::clone(&self.backend);
        let config = self.config.clone();
        let opened =
            tokio::task::spawn_blocking(move || CaptureSession::open(backend.as_ref(), &config))
                .await
                .unwrap_or_else(|e| {
                    Err(CaptureError::DeviceStartFailed(format!(
                        "device open task failed: {}",
                        e
                    )))
                });

        let mut session = match opened {
            Ok(session) => session,
            Err(e) => return self.fail_start(generation, e),
        };
        let resolution = session.resolution();
        let device = session.device().name.clone();
        let shutdown = Arc::new(Notify::new());

        {
            let mut inner = self.core.lock();
            if inner.generation != generation || inner.state != PipelineState::Starting {
                drop(inner);
                session.stop();
                warn!("Scan stopped while the camera was starting");
                return Err(stopped_while_starting());
            }
            inner.session = Some(session);
            inner.shutdown = Some(Arc::clone(&shutdown));
            self.core.transition(&mut inner, PipelineState::Active);
        }

        self.spawn_scan_loop(generation, shutdown);
        info!(
            %resolution,
            device = %device,
            continuous = self.is_continuous(),
            "Scanning started"
        );
        Ok(resolution)
    }

    fn fail_start(&self, generation: u64, error: CaptureError) -> Result<Resolution, CaptureError> {
        warn!(error = %error, "Failed to start scanning");
        let mut inner = self.core.lock();
        if inner.generation == generation && inner.state == PipelineState::Starting {
            inner.last_error = Some(error.clone());
            self.core.transition(&mut inner, PipelineState::Stopped);
        }
        Err(error)
    }

    fn spawn_scan_loop(&self, generation: u64, shutdown: Arc<Notify>) {
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let scheduler = FrameScheduler::new(self.config.interval());
        let worker = DecodeWorker::new(
            Arc::clone(&self.decoder),
            self.config.decoder.clone(),
            self.config.decode_timeout(),
            outcome_tx,
        );
        let dispatcher = ResultDispatcher::new();
        let core = Arc::clone(&self.core);

        tokio::spawn(async move {
            let mut ticker = scheduler.ticker();
            debug!(generation, "Scan loop started");

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.notified() => break,

                    // Results first: a result racing a tick is applied before
                    // that tick may dispatch
                    Some(completed) = outcome_rx.recv() => {
                        dispatcher.on_outcome(&core, completed);
                    }

                    _ = ticker.tick() => {
                        if let Some(dispatch) = scheduler.on_tick(&core, generation) {
                            worker.spawn(dispatch);
                        }
                    }
                }
            }

            debug!(
                generation,
                dispatched = scheduler.dispatched(),
                "Scan loop exited"
            );
        });
    }

    /// Release the camera and stop scanning
    ///
    /// Safe to call at any time and from any thread. An outstanding decode
    /// runs to completion but its result is ignored.
    pub fn stop(&self) {
        let released = {
            let mut inner = self.core.lock();
            if !inner.state.owns_device() {
                return;
            }
            info!(state = %inner.state, "Stopping scan");
            self.core.stop_locked(&mut inner)
        };

        if let Some(mut session) = released {
            session.stop();
        }
    }

    /// Keep scanning after a detection (`true`) or stop on the first one
    pub fn set_continuous(&self, continuous: bool) {
        self.core.set_continuous(continuous);
    }

    pub fn is_continuous(&self) -> bool {
        self.core.is_continuous()
    }

    /// Register the detection sink, replacing any previous one
    pub fn on_detected<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_detection(move |detection: &Detection| listener(detection.payload.as_str()));
    }

    /// Like [`ScanPipeline::on_detected`], but also receives the time the
    /// code was read
    pub fn on_detection<F>(&self, listener: F)
    where
        F: Fn(&Detection) + Send + Sync + 'static,
    {
        self.core.set_listener(Some(Arc::new(listener)));
    }

    pub fn state(&self) -> PipelineState {
        self.core.lock().state
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.core.subscribe()
    }

    /// Wait until the pipeline reaches `Stopped`
    pub async fn stopped(&self) {
        let mut rx = self.core.subscribe();
        // Sender lives as long as `self`
        let _ = rx.wait_for(|state| *state == PipelineState::Stopped).await;
    }

    /// Failure from the most recent `start`, if it failed
    pub fn last_error(&self) -> Option<CaptureError> {
        self.core.lock().last_error.clone()
    }

    /// Negotiated resolution of the running session
    pub fn resolution(&self) -> Option<Resolution> {
        self.core.lock().session.as_ref().map(|s| s.resolution())
    }

    /// Whether a decode is currently running, including one whose result
    /// will be discarded
    pub fn decode_in_flight(&self) -> bool {
        self.core.gate.in_flight()
    }
}

impl Drop for ScanPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stopped_while_starting() -> CaptureError {
    CaptureError::DeviceStartFailed("stopped while starting".to_string())
}

/// Moves a start abandoned mid-way (future dropped) to `Stopped`
struct StartGuard<'a> {
    core: &'a PipelineCore,
    generation: u64,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.core.lock();
        if inner.generation == self.generation && inner.state == PipelineState::Starting {
            debug!("Start abandoned, marking pipeline stopped");
            self.core.transition(&mut inner, PipelineState::Stopped);
        }
    }
}
