//! Scripted capture double for controller tests

use super::{CaptureError, VoiceCapture};

/// Test double that records calls and fails on demand.
///
/// Tests drive completions by sending `CaptureEvent`s into the controller's
/// capture channel directly, using the generation recorded here.
#[derive(Debug, Default)]
pub struct ScriptedCapture {
    pub available: bool,
    pub generation: u64,
    pub active: bool,
    pub starts: u32,
    pub stops: u32,
    pub cancels: u32,
}

impl ScriptedCapture {
    pub fn available() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }
}

impl VoiceCapture for ScriptedCapture {
    fn start(&mut self) -> Result<u64, CaptureError> {
        if !self.available {
            return Err(CaptureError::Unavailable);
        }
        if self.active {
            return Err(CaptureError::Busy);
        }
        self.active = true;
        self.starts += 1;
        self.generation += 1;
        Ok(self.generation)
    }

    fn stop(&mut self) {
        if self.active {
            self.stops += 1;
        }
    }

    fn cancel(&mut self) {
        if self.active {
            self.active = false;
            self.cancels += 1;
        }
    }
}
