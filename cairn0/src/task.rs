//! Task tracking seam between Outputs and whoever waits for a program.
//!
//! A [`TaskTracker`] is installed for the duration of a future with
//! [`scope`]. Every Output created inside that future, and every task the
//! tracker spawns, hands its background work to the same tracker. Nothing
//! here is process-global: two deployments running side by side each see
//! only their own tracker.

use crate::error::OutputError;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static CURRENT_TRACKER: Arc<dyn TaskTracker>;
}

/// What a tracked task is, for error attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLabel {
    /// Human readable description.
    pub description: String,
    /// `type::name` of the resource the task belongs to, if any.
    pub resource: Option<String>,
}

impl TaskLabel {
    /// A task not tied to a resource.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            resource: None,
        }
    }

    /// A task registering or otherwise acting on a resource.
    pub fn for_resource(description: impl Into<String>, resource: impl fmt::Display) -> Self {
        Self {
            description: description.into(),
            resource: Some(resource.to_string()),
        }
    }
}

impl fmt::Display for TaskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(resource) => write!(f, "{} ({resource})", self.description),
            None => f.write_str(&self.description),
        }
    }
}

/// Accepts asynchronous work that must finish before a program is done.
pub trait TaskTracker: Send + Sync {
    /// Track a task whose failure counts against the program.
    fn track(&self, label: TaskLabel, task: BoxFuture<'static, Result<(), OutputError>>);

    /// Track background work (an Output's computation). Its failure is
    /// reported wherever the Output is consumed, not here.
    fn track_background(&self, task: BoxFuture<'static, ()>);
}

/// Run `future` with `tracker` as the current tracker.
pub async fn scope<F: Future>(tracker: Arc<dyn TaskTracker>, future: F) -> F::Output {
    CURRENT_TRACKER.scope(tracker, future).await
}

/// The tracker in scope, if any.
pub fn current() -> Option<Arc<dyn TaskTracker>> {
    CURRENT_TRACKER.try_with(Arc::clone).ok()
}

/// Start background work: on the current tracker if there is one, else on
/// the current tokio runtime. Outside any runtime the work is dropped and
/// runs when first awaited.
pub(crate) fn drive(task: BoxFuture<'static, ()>) {
    if let Some(tracker) = current() {
        tracker.track_background(task);
    } else if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(task);
    }
}
