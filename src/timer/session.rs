//! Count-up timer for the overall session

/// Tracks elapsed session time against a configured duration and signals
/// completion exactly once when the limit is reached.
#[derive(Debug)]
pub struct SessionTimer {
    elapsed_secs: u32,
    duration_secs: u32,
    running: bool,
    completed: bool,
}

impl SessionTimer {
    /// Create a paused timer for the given session duration
    pub fn new(duration_secs: u32) -> Self {
        Self {
            elapsed_secs: 0,
            duration_secs,
            running: false,
            completed: false,
        }
    }

    /// Seconds elapsed since the session started
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    /// Seconds left until the session completes
    pub fn remaining_secs(&self) -> u32 {
        self.duration_secs - self.elapsed_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Begin (or resume) counting up. Has no effect once completed.
    pub fn start(&mut self) {
        if !self.completed {
            self.running = true;
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Reset elapsed time to zero against a fresh duration. Paused.
    pub fn reset(&mut self, duration_secs: u32) {
        self.elapsed_secs = 0;
        self.duration_secs = duration_secs;
        self.running = false;
        self.completed = false;
    }

    /// Advance one logical second, clamped at the configured duration.
    /// Returns true on the tick that completes the session; never twice.
    pub fn tick(&mut self) -> bool {
        if !self.running || self.completed {
            return false;
        }

        self.elapsed_secs = (self.elapsed_secs + 1).min(self.duration_secs);
        if self.elapsed_secs == self.duration_secs {
            self.completed = true;
            self.running = false;
            return true;
        }
        false
    }
}
