//! Session events emitted by the controller on every transition
//!
//! Broadcast to subscribed IPC clients so a UI can follow the session
//! without polling.

use serde::{Deserialize, Serialize};

/// Events emitted by the check-in controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Session entered Running (fresh start or resume from Idle)
    SessionStarted,

    /// Interval expired or force stop; a check-in is requested
    CheckInRequested {
        /// Elapsed session seconds at the moment of the request
        elapsed_secs: u32,
    },

    /// Voice capture began for the pending check-in
    RecordingStarted {
        /// Capture generation; the recognizer echoes this back
        generation: u64,
    },

    /// A finalized transcript is ready for review
    TranscriptReady,

    /// Capture failed mid-flight; back to awaiting the check-in
    CaptureFailed { reason: String },

    /// Reviewed transcript saved to the session log
    EntrySaved { timestamp_label: String },

    /// Session reached its configured duration
    SessionCompleted { interval_count: u32 },

    /// Session restarted from scratch
    SessionRestarted,

    /// Session exited; state frozen for inspection
    SessionExited,

    /// Session log cleared
    LogReset,

    /// Durations changed while in Idle
    ConfigUpdated {
        session_secs: u32,
        interval_secs: u32,
    },
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::SessionStarted => write!(f, "SESSION_STARTED"),
            SessionEvent::CheckInRequested { elapsed_secs } => {
                write!(f, "CHECK_IN_REQUESTED ({}s elapsed)", elapsed_secs)
            }
            SessionEvent::RecordingStarted { generation } => {
                write!(f, "RECORDING_STARTED (gen {})", generation)
            }
            SessionEvent::TranscriptReady => write!(f, "TRANSCRIPT_READY"),
            SessionEvent::CaptureFailed { reason } => {
                write!(f, "CAPTURE_FAILED ({})", reason)
            }
            SessionEvent::EntrySaved { timestamp_label } => {
                write!(f, "ENTRY_SAVED ({})", timestamp_label)
            }
            SessionEvent::SessionCompleted { interval_count } => {
                write!(f, "SESSION_COMPLETED ({} check-ins)", interval_count)
            }
            SessionEvent::SessionRestarted => write!(f, "SESSION_RESTARTED"),
            SessionEvent::SessionExited => write!(f, "SESSION_EXITED"),
            SessionEvent::LogReset => write!(f, "LOG_RESET"),
            SessionEvent::ConfigUpdated {
                session_secs,
                interval_secs,
            } => write!(
                f,
                "CONFIG_UPDATED ({}s session, {}s interval)",
                session_secs, interval_secs
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::EntrySaved {
            timestamp_label: "25:00".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("entry_saved"));
        assert!(json.contains("25:00"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"check_in_requested","elapsed_secs":1500}"#;
        let event: SessionEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            event,
            SessionEvent::CheckInRequested { elapsed_secs: 1500 }
        ));
    }
}
