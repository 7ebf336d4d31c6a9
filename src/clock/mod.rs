//! Monotonic 1-second tick source
//!
//! Drives both timers through the controller. The clock is cancelable: every
//! `start()` bumps a generation number stamped onto each tick, and consumers
//! discard ticks whose generation does not match the current one, so a tick
//! delivered late from a stopped clock can never advance the timers.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One tick of the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Generation of the clock run that produced this tick
    pub generation: u64,
}

/// Periodic tick source backed by a tokio interval task
pub struct Clock {
    tick_tx: mpsc::Sender<Tick>,
    period: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Clock {
    /// Create a stopped clock that will send ticks on the given channel
    pub fn new(tick_tx: mpsc::Sender<Tick>) -> Self {
        Self::with_period(tick_tx, Duration::from_secs(1))
    }

    /// Create a clock with a custom period (tests use a short one)
    pub fn with_period(tick_tx: mpsc::Sender<Tick>, period: Duration) -> Self {
        Self {
            tick_tx,
            period,
            generation: 0,
            task: None,
        }
    }

    /// Generation of the current run; ticks from earlier runs are stale
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Start ticking. Any previous run is stopped first, and its
    /// remaining ticks are invalidated by the generation bump.
    pub fn start(&mut self) -> u64 {
        self.stop();
        self.generation += 1;

        let generation = self.generation;
        let tick_tx = self.tick_tx.clone();
        let period = self.period;

        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first interval tick fires immediately; skip it so the
            // first delivered tick marks one full elapsed period.
            interval.tick().await;

            loop {
                interval.tick().await;
                if tick_tx.send(Tick { generation }).await.is_err() {
                    debug!(generation, "tick channel closed, clock task exiting");
                    break;
                }
            }
        }));

        info!(generation, "clock started");
        generation
    }

    /// Stop ticking. No tick with the current generation will be
    /// delivered after this returns.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.generation += 1;
            info!(generation = self.generation, "clock stopped");
        }
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
