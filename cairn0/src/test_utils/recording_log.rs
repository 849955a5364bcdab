//! RecordingLog: keeps every diagnostic in memory.

use crate::log::{Log, Severity};
use crate::resource::ResourceRef;
use std::sync::{Mutex, PoisonError};

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity.
    pub severity: Severity,
    /// Message text.
    pub message: String,
    /// `type::name` of the resource it was attributed to.
    pub resource: Option<String>,
}

/// A [`Log`] that records every entry. Use `.entries()` to inspect them.
#[derive(Debug, Default)]
pub struct RecordingLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry, in order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries at `severity`.
    pub fn at(&self, severity: Severity) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.severity == severity)
            .collect()
    }
}

impl Log for RecordingLog {
    fn log(&self, severity: Severity, message: &str, resource: Option<&ResourceRef>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                severity,
                message: message.to_owned(),
                resource: resource.map(ToString::to_string),
            });
    }
}
