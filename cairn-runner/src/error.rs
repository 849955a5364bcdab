//! Run failures.

use cairn0::error::OutputError;
use cairn0::task::TaskLabel;
use std::fmt;
use thiserror::Error;

/// Exit code for a run where resources failed but the program completed.
pub const EXIT_RESOURCE_FAILURE: i32 = 32;

/// Exit code for any other failed run.
pub const EXIT_FAILURE: i32 = 1;

/// One failed tracked task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Tracking sequence number; lower means started earlier.
    pub seq: u64,
    /// What the task was.
    pub label: TaskLabel,
    /// Why it failed.
    pub error: OutputError,
}

impl TaskFailure {
    /// `type::name` of the resource the failure belongs to, if any.
    pub fn resource(&self) -> Option<&str> {
        self.label.resource.as_deref().or_else(|| self.error.resource())
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.error)
    }
}

/// A run that finished with at least one failure.
///
/// Failures are ordered by when their task was tracked. The first is the
/// primary failure; the others are kept so none is lost.
#[derive(Debug, Clone, Error)]
#[error("{}", render(.primary, .additional))]
pub struct RunError {
    /// The earliest failure.
    pub primary: TaskFailure,
    /// Every later failure, in order.
    pub additional: Vec<TaskFailure>,
}

impl RunError {
    /// Build from failures in any order. `None` if there are none.
    pub fn from_failures(mut failures: Vec<TaskFailure>) -> Option<Self> {
        failures.sort_by_key(|f| f.seq);
        let mut failures = failures.into_iter();
        let primary = failures.next()?;
        Some(Self {
            primary,
            additional: failures.collect(),
        })
    }

    /// Every failure, primary first.
    pub fn failures(&self) -> impl Iterator<Item = &TaskFailure> {
        std::iter::once(&self.primary).chain(self.additional.iter())
    }

    /// Number of failures.
    pub fn len(&self) -> usize {
        1 + self.additional.len()
    }

    /// Always false; a `RunError` holds at least one failure.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Process exit code for this failure: [`EXIT_RESOURCE_FAILURE`] when
    /// every failure is attributed to a resource, [`EXIT_FAILURE`] otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.failures().all(|f| f.resource().is_some()) {
            EXIT_RESOURCE_FAILURE
        } else {
            EXIT_FAILURE
        }
    }
}

fn render(primary: &TaskFailure, additional: &[TaskFailure]) -> String {
    if additional.is_empty() {
        return format!("run failed: {primary}");
    }
    let mut out = format!("run failed with {} errors:", additional.len() + 1);
    for (i, failure) in std::iter::once(primary).chain(additional).enumerate() {
        out.push_str(&format!("\n  {}. {failure}", i + 1));
    }
    out
}
