//! Countdown timer for one check-in interval

/// Counts down the current interval and signals expiry exactly once.
///
/// After expiring the timer stops itself and stays inert until `reset()`
/// re-arms it with a fresh duration.
#[derive(Debug)]
pub struct IntervalTimer {
    remaining_secs: u32,
    running: bool,
    expired: bool,
}

impl IntervalTimer {
    /// Create a paused timer armed with the given duration
    pub fn new(duration_secs: u32) -> Self {
        Self {
            remaining_secs: duration_secs,
            running: false,
            expired: false,
        }
    }

    /// Seconds left in the current interval
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin (or resume) counting down. Has no effect once expired;
    /// an expired timer must be reset before it can run again.
    pub fn start(&mut self) {
        if !self.expired {
            self.running = true;
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Re-arm with a fresh duration, clearing the expired latch. Paused.
    pub fn reset(&mut self, duration_secs: u32) {
        self.remaining_secs = duration_secs;
        self.running = false;
        self.expired = false;
    }

    /// Advance one logical second. Returns true on the tick that
    /// exhausts the interval; never returns true twice per arm.
    pub fn tick(&mut self) -> bool {
        if !self.running || self.expired {
            return false;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.expired = true;
            self.running = false;
            return true;
        }
        false
    }
}
