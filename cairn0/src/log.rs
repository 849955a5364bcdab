//! The Log interface: fire-and-forget diagnostics.

use crate::resource::ResourceRef;
use serde::{Deserialize, Serialize};

/// Severity of a diagnostic.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Verbose detail.
    Debug,
    /// Progress.
    Info,
    /// Something looks off.
    Warning,
    /// Something failed.
    Error,
}

/// Diagnostics sink.
///
/// Every method is synchronous and must never block for long: callers log
/// from inside registrations and callbacks.
pub trait Log: Send + Sync {
    /// Record a message, optionally attributed to a resource.
    fn log(&self, severity: Severity, message: &str, resource: Option<&ResourceRef>);

    /// [`Severity::Debug`].
    fn debug(&self, message: &str, resource: Option<&ResourceRef>) {
        self.log(Severity::Debug, message, resource);
    }

    /// [`Severity::Info`].
    fn info(&self, message: &str, resource: Option<&ResourceRef>) {
        self.log(Severity::Info, message, resource);
    }

    /// [`Severity::Warning`].
    fn warn(&self, message: &str, resource: Option<&ResourceRef>) {
        self.log(Severity::Warning, message, resource);
    }

    /// [`Severity::Error`].
    fn error(&self, message: &str, resource: Option<&ResourceRef>) {
        self.log(Severity::Error, message, resource);
    }
}

/// A [`Log`] that emits structured [`tracing`] events.
///
/// Wire to any `tracing`-compatible subscriber.
///
/// | Severity | Level |
/// |----------|-------|
/// | Debug | `DEBUG` |
/// | Info | `INFO` |
/// | Warning | `WARN` |
/// | Error | `ERROR` |
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl TracingLog {
    /// Create a new `TracingLog`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Log for TracingLog {
    fn log(&self, severity: Severity, message: &str, resource: Option<&ResourceRef>) {
        let resource = resource.map(ToString::to_string).unwrap_or_default();
        match severity {
            Severity::Debug => tracing::debug!(resource = %resource, "{message}"),
            Severity::Info => tracing::info!(resource = %resource, "{message}"),
            Severity::Warning => tracing::warn!(resource = %resource, "{message}"),
            Severity::Error => tracing::error!(resource = %resource, "{message}"),
        }
    }
}
