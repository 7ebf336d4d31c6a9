//! Session management: the check-in state machine and the session log
//!
//! `CheckInController` owns all session state. Timers and the capture
//! adapter report through channels; nothing mutates state but the
//! controller, one message at a time.

mod controller;
mod log;

pub use controller::{
    Action, CheckInController, Command, CommandReply, ControlError, Phase, StatusSnapshot,
};
