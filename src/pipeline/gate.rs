// SPDX-License-Identifier: GPL-3.0-only

//! Single-flight gate for decode dispatch

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Allows at most one holder of a [`FlightPermit`] at a time
///
/// The permit is released when dropped, which the decode worker does only
/// once the decoder call has actually returned. A decode that outlives its
/// timeout therefore still blocks the next dispatch.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the permit, or `None` if it is held elsewhere
    pub fn try_acquire(&self) -> Option<FlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn in_flight(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof of exclusive access; releases the gate on drop
#[must_use = "dropping the permit immediately reopens the gate"]
#[derive(Debug)]
pub struct FlightPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let gate = SingleFlight::new();
        let permit = gate.try_acquire().unwrap();
        assert!(gate.in_flight());
        assert!(gate.try_acquire().is_none());

        drop(permit);
        assert!(!gate.in_flight());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn test_contended_acquire_grants_one() {
        let gate = SingleFlight::new();
        let granted: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let gate = gate.clone();
                    s.spawn(move || gate.try_acquire())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(granted.iter().filter(|p| p.is_some()).count(), 1);
    }
}
