// SPDX-License-Identifier: GPL-3.0-only

//! Off-thread decode execution

use super::scheduler::Dispatch;
use crate::backends::camera::CameraFrame;
use crate::decoder::{BarcodeDecoder, DecoderOptions};
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::warn;

/// Result of one dispatched decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    NoMatch,
    Detected {
        payload: String,
        timestamp: DateTime<Local>,
    },
}

/// A decoded payload and the time it was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub payload: String,
    pub timestamp: DateTime<Local>,
}

/// Outcome tagged with the session it was dispatched for
#[derive(Debug, Clone)]
pub struct CompletedDecode {
    pub generation: u64,
    pub sequence: u64,
    pub outcome: DecodeOutcome,
}

/// Runs decodes on the blocking pool and reports back over a channel
pub struct DecodeWorker {
    decoder: Arc<dyn BarcodeDecoder>,
    options: Arc<DecoderOptions>,
    timeout: Option<Duration>,
    outcomes: mpsc::UnboundedSender<CompletedDecode>,
}

impl DecodeWorker {
    pub fn new(
        decoder: Arc<dyn BarcodeDecoder>,
        options: DecoderOptions,
        timeout: Option<Duration>,
        outcomes: mpsc::UnboundedSender<CompletedDecode>,
    ) -> Self {
        Self {
            decoder,
            options: Arc::new(options),
            timeout,
            outcomes,
        }
    }

    /// Start decoding `dispatch` and return immediately
    ///
    /// Exactly one [`CompletedDecode`] is sent per call, even if the decoder
    /// panics or times out.
    pub fn spawn(&self, dispatch: Dispatch) {
        let Dispatch {
            frame,
            generation,
            permit,
        } = dispatch;
        let sequence = frame.sequence;
        let decoder = Arc::clone(&self.decoder);
        let options = Arc::clone(&self.options);
        let outcomes = self.outcomes.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let handle = tokio::task::spawn_blocking(move || {
                let outcome = decode_guarded(decoder.as_ref(), &frame, &options);
                // Released only once the decoder has really returned
                drop(permit);
                outcome
            });

            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, handle).await {
                    Ok(joined) => joined_outcome(sequence, joined),
                    Err(_) => {
                        warn!(
                            sequence,
                            timeout_ms = limit.as_millis(),
                            "Decode timed out, treating as no match"
                        );
                        DecodeOutcome::NoMatch
                    }
                },
                None => joined_outcome(sequence, handle.await),
            };

            // Receiver is gone once the scan loop exits
            let _ = outcomes.send(CompletedDecode {
                generation,
                sequence,
                outcome,
            });
        });
    }
}

/// Call the decoder and fold every failure into `NoMatch`
pub fn decode_guarded(
    decoder: &dyn BarcodeDecoder,
    frame: &CameraFrame,
    options: &DecoderOptions,
) -> DecodeOutcome {
    match decoder.decode(frame, options) {
        Ok(Some(payload)) => DecodeOutcome::Detected {
            payload,
            timestamp: Local::now(),
        },
        Ok(None) => DecodeOutcome::NoMatch,
        Err(e) => {
            warn!(sequence = frame.sequence, error = %e, "Decoder failed, treating as no match");
            DecodeOutcome::NoMatch
        }
    }
}

fn joined_outcome(sequence: u64, joined: Result<DecodeOutcome, JoinError>) -> DecodeOutcome {
    joined.unwrap_or_else(|e| {
        warn!(sequence, error = %e, "Decode task panicked, treating as no match");
        DecodeOutcome::NoMatch
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DecodeError;
    use crate::pipeline::gate::SingleFlight;

    fn frame() -> CameraFrame {
        CameraFrame::gray(4, 4, vec![0u8; 16]).with_sequence(7)
    }

    type DecodeResult = Result<Option<String>, DecodeError>;

    #[test]
    fn test_decoder_error_is_no_match() {
        let decoder = |_: &CameraFrame, _: &DecoderOptions| -> DecodeResult {
            Err(DecodeError::InvalidGeometry("0x0".into()))
        };
        let outcome = decode_guarded(&decoder, &frame(), &DecoderOptions::default());
        assert_eq!(outcome, DecodeOutcome::NoMatch);
    }

    #[test]
    fn test_payload_becomes_detected() {
        let decoder =
            |_: &CameraFrame, _: &DecoderOptions| -> DecodeResult { Ok(Some("ABC123".into())) };
        let before = Local::now();
        let outcome = decode_guarded(&decoder, &frame(), &DecoderOptions::default());
        match outcome {
            DecodeOutcome::Detected { payload, timestamp } => {
                assert_eq!(payload, "ABC123");
                assert!(timestamp >= before);
            }
            DecodeOutcome::NoMatch => panic!("expected a detection"),
        }
    }

    #[tokio::test]
    async fn test_panicking_decoder_reports_no_match_and_releases_gate() {
        let decoder: Arc<dyn BarcodeDecoder> = Arc::new(
            |_: &CameraFrame, _: &DecoderOptions| -> DecodeResult { panic!("decoder bug") },
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = DecodeWorker::new(decoder, DecoderOptions::default(), None, tx);
        let gate = SingleFlight::new();

        worker.spawn(Dispatch {
            frame: frame(),
            generation: 3,
            permit: gate.try_acquire().unwrap(),
        });

        let completed = rx.recv().await.unwrap();
        assert_eq!(completed.generation, 3);
        assert_eq!(completed.sequence, 7);
        assert_eq!(completed.outcome, DecodeOutcome::NoMatch);
        assert!(!gate.in_flight());
    }

    #[tokio::test]
    async fn test_timeout_reports_no_match_but_keeps_gate_until_done() {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = parking_lot::Mutex::new(release_rx);
        let decoder: Arc<dyn BarcodeDecoder> = Arc::new(
            move |_: &CameraFrame, _: &DecoderOptions| -> DecodeResult {
                let _ = release_rx.lock().recv();
                Ok(Some("late".into()))
            },
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = DecodeWorker::new(
            decoder,
            DecoderOptions::default(),
            Some(Duration::from_millis(20)),
            tx,
        );
        let gate = SingleFlight::new();

        worker.spawn(Dispatch {
            frame: frame(),
            generation: 1,
            permit: gate.try_acquire().unwrap(),
        });

        let completed = rx.recv().await.unwrap();
        assert_eq!(completed.outcome, DecodeOutcome::NoMatch);
        assert!(gate.in_flight());

        release_tx.send(()).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while gate.in_flight() && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!gate.in_flight());
    }
}
