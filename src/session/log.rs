//! Append-only session log of confirmed check-in transcripts

use serde::{Deserialize, Serialize};

/// One confirmed check-in, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Elapsed session time at the moment of save, `HH:MM:SS` or `MM:SS`
    pub timestamp_label: String,
    /// Transcript text, verbatim; may be empty
    pub text: String,
}

impl LogEntry {
    pub fn new(elapsed_secs: u32, text: impl Into<String>) -> Self {
        Self {
            timestamp_label: format_clock(elapsed_secs),
            text: text.into(),
        }
    }
}

/// Ordered sequence of log entries; grows only by append
#[derive(Debug, Default)]
pub struct SessionLog {
    entries: Vec<LogEntry>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the log as one bulleted line per entry, insertion order,
    /// for clipboard copy or export. Entry text appears verbatim.
    pub fn to_ordered_text(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        self.entries()
            .iter()
            .map(|entry| format!("\u{2022} {} - {}", entry.timestamp_label, entry.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Clear all entries. Phase guards live in the controller: reset is
    /// only reachable from Idle or Complete.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

/// Format elapsed seconds as `HH:MM:SS`, eliding hours when zero (`MM:SS`)
pub fn format_clock(secs: u32) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
