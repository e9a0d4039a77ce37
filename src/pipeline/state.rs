// SPDX-License-Identifier: GPL-3.0-only

use serde::Serialize;

/// Lifecycle state of a scan pipeline
///
/// ```text
/// Idle --start--> Starting --device ready--> Active
/// Active --tick, frame available--> AwaitingDecode
/// AwaitingDecode --no match / detected (continuous)--> Active
/// AwaitingDecode --detected (single-shot)--> Stopped
/// Starting / Active / AwaitingDecode --stop--> Stopped
/// Starting --failure--> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PipelineState {
    /// Never started
    #[default]
    Idle,
    /// Permission and device negotiation in progress
    Starting,
    /// Streaming, ready to dispatch a decode on the next tick
    Active,
    /// Streaming, one decode outstanding
    AwaitingDecode,
    /// Device released
    Stopped,
}

impl PipelineState {
    /// Whether a capture device may be held in this state
    pub fn owns_device(&self) -> bool {
        !matches!(self, PipelineState::Idle | PipelineState::Stopped)
    }

    /// Whether frames are being sampled
    pub fn is_scanning(&self) -> bool {
        matches!(self, PipelineState::Active | PipelineState::AwaitingDecode)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Starting => write!(f, "starting"),
            PipelineState::Active => write!(f, "active"),
            PipelineState::AwaitingDecode => write!(f, "awaiting-decode"),
            PipelineState::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_idle_and_stopped_hold_no_device() {
        assert!(!PipelineState::Idle.owns_device());
        assert!(!PipelineState::Stopped.owns_device());
        assert!(PipelineState::Starting.owns_device());
        assert!(PipelineState::Active.owns_device());
        assert!(PipelineState::AwaitingDecode.owns_device());
    }
}
