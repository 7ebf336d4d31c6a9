//! Check-in controller state machine
//!
//! Orchestrates Idle -> Running -> AwaitingCheckIn -> Recording -> Reviewing
//! -> Running/Complete. The controller runs a single select loop over three
//! channels (clock ticks, capture completions, client commands) and processes
//! one message at a time, so transitions never interleave.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::capture::{CaptureError, CaptureEvent, CaptureOutcome, VoiceCapture};
use crate::clock::{Clock, Tick};
use crate::config::{ConfigError, SessionConfig};
use crate::events::SessionEvent;
use crate::timer::{IntervalTimer, SessionTimer};

use super::log::{LogEntry, SessionLog};

/// The six phases of a focus session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No session running; configuration is editable
    Idle,
    /// Both timers counting
    Running,
    /// Interval expired or force-stopped; waiting for the user to speak
    AwaitingCheckIn,
    /// Voice capture in flight
    Recording,
    /// Transcript captured, awaiting save or retry
    Reviewing,
    /// Session duration exhausted
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Running => write!(f, "Running"),
            Phase::AwaitingCheckIn => write!(f, "AwaitingCheckIn"),
            Phase::Recording => write!(f, "Recording"),
            Phase::Reviewing => write!(f, "Reviewing"),
            Phase::Complete => write!(f, "Complete"),
        }
    }
}

/// Point-in-time view of the session, answered to status queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub session_secs: u32,
    pub interval_secs: u32,
    pub elapsed_secs: u32,
    pub session_remaining_secs: u32,
    pub interval_remaining_secs: u32,
    pub interval_count: u32,
    pub entry_count: usize,
}

/// User-initiated actions on the session
#[derive(Debug, Clone)]
pub enum Action {
    Start,
    ForceStop,
    BeginCheckIn,
    StopCheckIn,
    Save,
    Retry,
    Restart,
    ExitSession,
    ResetLog,
    SetConfig(SessionConfig),
    Query,
    ExportLog,
}

/// Successful command outcome
#[derive(Debug, Clone)]
pub enum CommandReply {
    Status(StatusSnapshot),
    LogText(String),
}

/// Errors surfaced to IPC clients; none are fatal to the daemon
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("{action} is not valid in the {phase} phase")]
    InvalidPhase {
        action: &'static str,
        phase: Phase,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// A command from a client, with an optional reply channel
#[derive(Debug)]
pub struct Command {
    pub action: Action,
    pub reply: Option<oneshot::Sender<Result<CommandReply, ControlError>>>,
}

/// The state machine driving a focus session
pub struct CheckInController<C: VoiceCapture> {
    config: SessionConfig,
    phase: Phase,
    session_timer: SessionTimer,
    interval_timer: IntervalTimer,
    interval_count: u32,
    /// Transcript awaiting review; cleared on cycle start, save, and retry
    draft: Option<String>,
    log: SessionLog,
    clock: Clock,
    capture: C,
    /// Generation of the capture in flight, if any
    active_capture: Option<u64>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl<C: VoiceCapture> CheckInController<C> {
    pub fn new(
        config: SessionConfig,
        clock: Clock,
        capture: C,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            session_timer: SessionTimer::new(config.session_secs),
            interval_timer: IntervalTimer::new(config.interval_secs),
            interval_count: 0,
            draft: None,
            log: SessionLog::new(),
            clock,
            capture,
            active_capture: None,
            event_tx,
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            phase: self.phase(),
            session_secs: self.config.session_secs,
            interval_secs: self.config.interval_secs,
            elapsed_secs: self.session_timer.elapsed_secs(),
            session_remaining_secs: self.session_timer.remaining_secs(),
            interval_remaining_secs: self.interval_timer.remaining_secs(),
            interval_count: self.interval_count,
            entry_count: self.log.len(),
        }
    }

    /// Run the controller, processing ticks, capture completions, and
    /// commands until the command channel closes.
    pub async fn run(
        mut self,
        mut tick_rx: mpsc::Receiver<Tick>,
        mut capture_rx: mpsc::Receiver<CaptureEvent>,
        mut command_rx: mpsc::Receiver<Command>,
    ) {
        info!("check-in controller started in Idle phase");

        loop {
            tokio::select! {
                Some(tick) = tick_rx.recv() => self.handle_tick(tick),
                Some(event) = capture_rx.recv() => self.handle_capture(event),
                command = command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                }
            }
        }

        // Teardown: release the tick source and cancel any in-flight capture
        self.clock.stop();
        self.cancel_capture();
        info!("check-in controller stopped");
    }

    /// Advance both timers by one logical second.
    ///
    /// Session completion takes precedence over interval expiry when both
    /// land on the same tick: no trailing check-in for a finished session.
    pub(crate) fn handle_tick(&mut self, tick: Tick) {
        if tick.generation != self.clock.generation() {
            debug!(
                tick_generation = tick.generation,
                clock_generation = self.clock.generation(),
                "discarding stale tick"
            );
            return;
        }
        if self.phase != Phase::Running {
            // Timers are paused outside Running; the tick has no effect
            return;
        }

        let session_complete = self.session_timer.tick();
        let interval_expired = self.interval_timer.tick();

        if session_complete {
            self.complete_session();
        } else if interval_expired {
            self.request_check_in();
        }
    }

    /// Handle a capture completion. Results from a cancelled or superseded
    /// capture, or arriving outside Recording, are discarded.
    pub(crate) fn handle_capture(&mut self, event: CaptureEvent) {
        let expected = match self.active_capture {
            Some(generation) if self.phase == Phase::Recording => generation,
            _ => {
                debug!(?event, "discarding capture result with no capture pending");
                return;
            }
        };
        if event.generation != expected {
            debug!(
                got = event.generation,
                expected,
                "discarding capture result from superseded capture"
            );
            return;
        }

        self.active_capture = None;
        match event.outcome {
            CaptureOutcome::Transcript(text) => {
                self.draft = Some(text);
                self.transition_to(Phase::Reviewing);
                self.emit(SessionEvent::TranscriptReady);
            }
            CaptureOutcome::Error(reason) => {
                warn!(%reason, "capture failed, returning to check-in prompt");
                self.draft = None;
                self.transition_to(Phase::AwaitingCheckIn);
                self.emit(SessionEvent::CaptureFailed { reason });
            }
        }
    }

    /// Handle a client command, sending the outcome on the reply channel
    pub(crate) fn handle_command(&mut self, command: Command) {
        let result = self.apply_action(command.action);
        if let Err(error) = &result {
            warn!(%error, "command rejected");
        }
        if let Some(reply) = command.reply {
            let _ = reply.send(result);
        }
    }

    fn apply_action(&mut self, action: Action) -> Result<CommandReply, ControlError> {
        match action {
            Action::Query => return Ok(CommandReply::Status(self.snapshot())),
            Action::ExportLog => return Ok(CommandReply::LogText(self.log.to_ordered_text())),
            Action::Start => self.start()?,
            Action::ForceStop => self.force_stop()?,
            Action::BeginCheckIn => self.begin_check_in()?,
            Action::StopCheckIn => self.stop_check_in()?,
            Action::Save => self.save()?,
            Action::Retry => self.retry()?,
            Action::Restart => self.restart()?,
            Action::ExitSession => self.exit_session(),
            Action::ResetLog => self.reset_log()?,
            Action::SetConfig(config) => self.set_config(config)?,
        }
        Ok(CommandReply::Status(self.snapshot()))
    }

    /// Idle/Complete -> Running. A session that had completed starts over
    /// from scratch; one exited mid-way resumes its elapsed time. The
    /// interval timer is always re-armed to the full configured duration.
    fn start(&mut self) -> Result<(), ControlError> {
        match self.phase {
            Phase::Idle | Phase::Complete => {}
            phase => {
                return Err(ControlError::InvalidPhase {
                    action: "start",
                    phase,
                })
            }
        }

        if self.session_timer.is_complete() {
            self.session_timer.reset(self.config.session_secs);
            self.interval_count = 0;
            self.log.reset();
        }
        self.interval_timer.reset(self.config.interval_secs);
        self.draft = None;

        self.session_timer.start();
        self.interval_timer.start();
        debug_assert!(self.session_timer.is_running() && self.interval_timer.is_running());
        self.clock.start();
        self.transition_to(Phase::Running);
        self.emit(SessionEvent::SessionStarted);
        Ok(())
    }

    /// Running -> AwaitingCheckIn with the interval remaining frozen.
    /// Idempotent while already awaiting a check-in.
    fn force_stop(&mut self) -> Result<(), ControlError> {
        match self.phase {
            Phase::Running => {
                self.request_check_in();
                Ok(())
            }
            // An expiry already pending counts as the same transition
            Phase::AwaitingCheckIn => Ok(()),
            phase => Err(ControlError::InvalidPhase {
                action: "force_stop",
                phase,
            }),
        }
    }

    /// AwaitingCheckIn -> Recording via the capture capability.
    /// A synchronous start failure leaves the phase untouched.
    fn begin_check_in(&mut self) -> Result<(), ControlError> {
        if self.phase != Phase::AwaitingCheckIn {
            return Err(ControlError::InvalidPhase {
                action: "begin_check_in",
                phase: self.phase,
            });
        }

        self.draft = None;
        match self.capture.start() {
            Ok(generation) => {
                self.active_capture = Some(generation);
                self.transition_to(Phase::Recording);
                self.emit(SessionEvent::RecordingStarted { generation });
                Ok(())
            }
            Err(CaptureError::Busy) => {
                warn!("capture already active, ignoring begin_check_in");
                Ok(())
            }
            Err(error @ CaptureError::Unavailable) => {
                warn!("speech capability unavailable, staying in check-in prompt");
                Err(error.into())
            }
        }
    }

    /// Ask the recognizer to finalize the in-flight capture early.
    /// The phase stays Recording until the result arrives.
    fn stop_check_in(&mut self) -> Result<(), ControlError> {
        if self.phase != Phase::Recording {
            return Err(ControlError::InvalidPhase {
                action: "stop_check_in",
                phase: self.phase,
            });
        }
        self.capture.stop();
        Ok(())
    }

    /// Reviewing -> Running (or Complete when the session is exhausted).
    /// Appends the drafted transcript, counts the cycle, and re-arms the
    /// interval to its full duration.
    fn save(&mut self) -> Result<(), ControlError> {
        if self.phase != Phase::Reviewing {
            return Err(ControlError::InvalidPhase {
                action: "save",
                phase: self.phase,
            });
        }

        // An empty transcript is still a confirmed check-in
        let text = self.draft.take().unwrap_or_default();
        let entry = LogEntry::new(self.session_timer.elapsed_secs(), text);
        self.emit(SessionEvent::EntrySaved {
            timestamp_label: entry.timestamp_label.clone(),
        });
        self.log.append(entry);
        self.interval_count += 1;
        self.interval_timer.reset(self.config.interval_secs);

        if self.session_timer.elapsed_secs() >= self.config.session_secs {
            self.complete_session();
        } else {
            self.session_timer.start();
            self.interval_timer.start();
            self.transition_to(Phase::Running);
        }
        Ok(())
    }

    /// Reviewing -> Recording, discarding the draft
    fn retry(&mut self) -> Result<(), ControlError> {
        if self.phase != Phase::Reviewing {
            return Err(ControlError::InvalidPhase {
                action: "retry",
                phase: self.phase,
            });
        }

        self.draft = None;
        match self.capture.start() {
            Ok(generation) => {
                self.active_capture = Some(generation);
                self.transition_to(Phase::Recording);
                self.emit(SessionEvent::RecordingStarted { generation });
                Ok(())
            }
            Err(CaptureError::Busy) => {
                warn!("capture already active, ignoring retry");
                Ok(())
            }
            Err(error @ CaptureError::Unavailable) => {
                self.transition_to(Phase::AwaitingCheckIn);
                Err(error.into())
            }
        }
    }

    /// Any active phase -> Running with all session state reset
    fn restart(&mut self) -> Result<(), ControlError> {
        match self.phase {
            Phase::Running | Phase::AwaitingCheckIn | Phase::Recording | Phase::Reviewing => {}
            phase => {
                return Err(ControlError::InvalidPhase {
                    action: "restart",
                    phase,
                })
            }
        }

        self.cancel_capture();
        self.draft = None;
        self.interval_count = 0;
        self.log.reset();
        self.session_timer.reset(self.config.session_secs);
        self.interval_timer.reset(self.config.interval_secs);

        self.session_timer.start();
        self.interval_timer.start();
        self.clock.start();
        self.transition_to(Phase::Running);
        self.emit(SessionEvent::SessionRestarted);
        Ok(())
    }

    /// Any phase -> Idle, state frozen for inspection and export
    fn exit_session(&mut self) {
        self.pause_timers();
        self.cancel_capture();
        self.draft = None;
        self.clock.stop();
        self.transition_to(Phase::Idle);
        self.emit(SessionEvent::SessionExited);
    }

    /// Clear the log; only permitted when no check-in can be pending
    fn reset_log(&mut self) -> Result<(), ControlError> {
        match self.phase {
            Phase::Idle | Phase::Complete => {
                self.log.reset();
                self.emit(SessionEvent::LogReset);
                Ok(())
            }
            phase => Err(ControlError::InvalidPhase {
                action: "reset_log",
                phase,
            }),
        }
    }

    /// Replace the configured durations; Idle only. Both timers are
    /// re-armed against the new durations.
    fn set_config(&mut self, config: SessionConfig) -> Result<(), ControlError> {
        if self.phase != Phase::Idle {
            return Err(ControlError::InvalidPhase {
                action: "set_config",
                phase: self.phase,
            });
        }
        config.validate()?;

        self.config = config;
        self.session_timer.reset(config.session_secs);
        self.interval_timer.reset(config.interval_secs);
        self.interval_count = 0;
        self.emit(SessionEvent::ConfigUpdated {
            session_secs: config.session_secs,
            interval_secs: config.interval_secs,
        });
        Ok(())
    }

    /// Pause both timers and prompt for a check-in
    fn request_check_in(&mut self) {
        self.pause_timers();
        self.transition_to(Phase::AwaitingCheckIn);
        self.emit(SessionEvent::CheckInRequested {
            elapsed_secs: self.session_timer.elapsed_secs(),
        });
    }

    /// Pause everything and finish the session; no check-in is prompted
    fn complete_session(&mut self) {
        self.pause_timers();
        self.clock.stop();
        self.transition_to(Phase::Complete);
        self.emit(SessionEvent::SessionCompleted {
            interval_count: self.interval_count,
        });
    }

    /// Timers pause together: stopping one must never leave the other running
    fn pause_timers(&mut self) {
        self.session_timer.pause();
        self.interval_timer.pause();
    }

    fn cancel_capture(&mut self) {
        if self.active_capture.take().is_some() {
            self.capture.cancel();
        }
    }

    fn transition_to(&mut self, new_phase: Phase) {
        if new_phase != self.phase {
            info!(from = %self.phase, to = %new_phase, "phase transition");
            self.phase = new_phase;
        }
    }

    fn emit(&self, event: SessionEvent) {
        debug!(%event, "emitting session event");
        let _ = self.event_tx.send(event);
    }
}
