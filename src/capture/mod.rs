//! Voice capture capability boundary
//!
//! The daemon never performs speech recognition itself; a recognizer client
//! on the other side of the IPC socket does. This module defines the contract
//! the controller programs against: `start()` either fails synchronously
//! (`Unavailable`, `Busy`) or is followed by exactly one `CaptureEvent`,
//! delivered asynchronously, at most once per start.

mod bridge;

pub use bridge::{bridge_pair, CaptureSubmitter};

#[cfg(test)]
pub mod stub;

use serde::{Deserialize, Serialize};

/// Synchronous failures from starting a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("speech capture capability is not available")]
    Unavailable,

    #[error("a capture is already in progress")]
    Busy,
}

/// Completion of one capture, delivered to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEvent {
    /// Generation returned by the `start()` that began this capture.
    /// Events from cancelled generations are discarded.
    pub generation: u64,
    pub outcome: CaptureOutcome,
}

/// Exactly one of these per completed `start()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Finalized transcript; may be empty, which is still logged
    Transcript(String),
    /// Mid-capture failure reported by the recognizer
    Error(String),
}

/// Push notifications to the recognizer client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CapturePrompt {
    /// Begin listening for the check-in
    StartListening { generation: u64 },
    /// Finalize early with whatever has been heard so far
    StopListening,
    /// Discard the capture entirely; no result expected
    CancelListening,
}

/// Capability interface to the speech recognizer
pub trait VoiceCapture: Send {
    /// Begin a capture. Returns the generation the eventual
    /// `CaptureEvent` will carry.
    fn start(&mut self) -> Result<u64, CaptureError>;

    /// Request early finalization of the in-flight capture
    fn stop(&mut self);

    /// Discard the in-flight capture; a result that still arrives
    /// for it must be dropped
    fn cancel(&mut self);
}
