//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.
//! Two kinds of clients speak this protocol: a UI driving the session, and a
//! recognizer performing the actual speech-to-text work.

use serde::{Deserialize, Serialize};

use crate::capture::CapturePrompt;
use crate::events::SessionEvent;
use crate::session::StatusSnapshot;

/// Requests from clients to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request a session status snapshot
    GetStatus,

    /// Change session durations (Idle only)
    SetConfig {
        session_hours: u32,
        interval_minutes: u32,
    },

    /// Start (or resume) the session
    Start,

    /// End the current interval early and request a check-in
    ForceStop,

    /// The user began speaking for the pending check-in
    BeginCheckIn,

    /// The user stopped speaking; finalize the capture early
    StopCheckIn,

    /// Save the reviewed transcript to the log
    Save,

    /// Discard the transcript and record again
    Retry,

    /// Restart the session from scratch
    Restart,

    /// Exit the session, freezing state for inspection
    ExitSession,

    /// Clear the session log (Idle or Complete only)
    ResetLog,

    /// Fetch the log rendered as ordered text
    ExportLog,

    /// Announce this client as the speech recognizer
    AnnounceRecognizer,

    /// Finalized transcript for the capture started with `generation`
    /// (echoed from the `start_listening` prompt)
    CaptureResult { generation: u64, text: String },

    /// The capture started with `generation` failed
    CaptureFailed { generation: u64, reason: String },

    /// Subscribe to session event and capture prompt notifications
    Subscribe,
}

/// Responses from the daemon to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current session status
    Status(StatusSnapshot),

    /// Rendered session log
    LogText { text: String },

    /// Request accepted with nothing else to report
    Ack,

    /// Subscription confirmed
    Subscribed,

    /// Request rejected
    Error { code: String, message: String },
}

/// Push notification to subscribed clients
///
/// Untagged: the inner payloads already carry a `type` discriminator of
/// their own, and their variant names never collide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Notification {
    /// A session transition occurred
    Event(SessionEvent),

    /// The recognizer should act on the capture in flight
    Prompt(CapturePrompt),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Phase;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetConfig {
            session_hours: 2,
            interval_minutes: 25,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_config"));
        assert!(json.contains("25"));
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{"type":"capture_result","generation":2,"text":"fixed the layout bug"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(
            req,
            Request::CaptureResult { generation: 2, text } if text == "fixed the layout bug"
        ));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(StatusSnapshot {
            phase: Phase::Running,
            session_secs: 3600,
            interval_secs: 1500,
            elapsed_secs: 10,
            session_remaining_secs: 3590,
            interval_remaining_secs: 1490,
            interval_count: 0,
            entry_count: 0,
        });
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("status"));
        assert!(json.contains("running"));
    }

    #[test]
    fn test_notification_round_trip() {
        let notification = Notification::Prompt(CapturePrompt::StartListening { generation: 3 });
        let json = serde_json::to_string(&notification).unwrap();
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            back,
            Notification::Prompt(CapturePrompt::StartListening { generation: 3 })
        ));
    }
}
