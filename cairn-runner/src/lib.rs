#![deny(missing_docs)]
//! In-process task tracking for cairn programs.
//!
//! A [`Runner`] owns every asynchronous task a program sets in motion:
//! resource registrations, invokes, and the background computations behind
//! Outputs. It installs itself as the current
//! [`TaskTracker`](cairn0::task::TaskTracker) for the program body and for
//! every task it spawns, so work started deep inside an `apply` callback is
//! tracked by the same runner.
//!
//! Lifecycle: `Running → Draining → Completed`. A task leaves the table
//! the moment it settles, recording its failure if it has one; draining
//! waits until the table is empty, which includes any task started by
//! another task while it ran. A panicking task is caught and reported as
//! [`OutputError::Task`]. There is
//! no cancellation and no fail-fast: a failing task never stops its
//! siblings. Failures are collected and reported together by
//! [`Runner::complete`].

mod error;

pub use error::{EXIT_FAILURE, EXIT_RESOURCE_FAILURE, RunError, TaskFailure};

use cairn0::error::OutputError;
use cairn0::task::{self, TaskLabel, TaskTracker};
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// The program body is executing.
    Running,
    /// Waiting for every tracked task.
    Draining,
    /// Nothing left to wait for.
    Completed(Completion),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every task succeeded.
    Succeeded,
    /// The program body finished but some tasks failed.
    PartiallyFailed,
    /// The program body itself failed.
    Fatal,
}

struct Table {
    next_seq: u64,
    /// In-flight tasks by sequence number. `None` marks background work.
    pending: BTreeMap<u64, Option<TaskLabel>>,
    failures: Vec<TaskFailure>,
    state: RunState,
    body_failed: bool,
}

/// Tracks and drains a program's asynchronous work.
///
/// Cheap to clone; clones share one task table. Each deployment owns its
/// own runner.
#[derive(Clone)]
pub struct Runner {
    table: Arc<Mutex<Table>>,
    in_flight: Arc<watch::Sender<usize>>,
}

impl Runner {
    /// Create a runner in the `Running` state.
    pub fn new() -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            table: Arc::new(Mutex::new(Table {
                next_seq: 1,
                pending: BTreeMap::new(),
                failures: Vec::new(),
                state: RunState::Running,
                body_failed: false,
            })),
            in_flight: Arc::new(in_flight),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_seq(&self) -> u64 {
        let mut table = self.lock();
        let seq = table.next_seq;
        table.next_seq += 1;
        seq
    }

    /// This runner as a tracker handle.
    pub fn tracker(&self) -> Arc<dyn TaskTracker> {
        Arc::new(self.clone())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.lock().state
    }

    /// Number of tasks still in flight. Finished tasks leave the table as
    /// soon as they complete.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Failures recorded so far, in tracking order.
    pub fn failures(&self) -> Vec<TaskFailure> {
        let mut failures = self.lock().failures.clone();
        failures.sort_by_key(|f| f.seq);
        failures
    }

    /// Record a failure that did not come from a tracked task.
    pub fn record_failure(&self, label: TaskLabel, error: OutputError) {
        let seq = self.next_seq();
        self.push_failure(seq, label, error);
    }

    fn push_failure(&self, seq: u64, label: TaskLabel, error: OutputError) {
        tracing::debug!(seq, label = %label, error = %error, "runner.task.failed");
        self.lock().failures.push(TaskFailure { seq, label, error });
    }

    fn spawn(&self, label: Option<TaskLabel>, task: BoxFuture<'static, Result<(), OutputError>>) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let label = label.unwrap_or_else(|| TaskLabel::new("background task"));
                self.record_failure(label, OutputError::Task(e.to_string()));
                return;
            }
        };
        let runner = self.clone();
        let tracker = self.tracker();

        // The entry goes in under the same lock the task needs to settle,
        // so a task can never finish before it is in the table.
        let mut table = self.lock();
        let seq = table.next_seq;
        table.next_seq += 1;
        tracing::debug!(
            seq,
            label = %label.as_ref().map(ToString::to_string).unwrap_or_default(),
            "runner.track"
        );
        table.pending.insert(seq, label);
        self.in_flight.send_replace(table.pending.len());
        handle.spawn(async move {
            let outcome = task::scope(tracker, AssertUnwindSafe(task).catch_unwind()).await;
            let result = outcome.unwrap_or_else(|panic| Err(OutputError::Task(panic_message(panic))));
            runner.settle(seq, result);
        });
    }

    fn settle(&self, seq: u64, result: Result<(), OutputError>) {
        let mut table = self.lock();
        let label = table.pending.remove(&seq).flatten();
        let failure = match (result, label) {
            (Ok(()), _) => None,
            (Err(error), Some(label)) => Some((label, error)),
            // A background computation reports its own failure to whoever
            // consumes the Output, unless it panicked.
            (Err(error @ OutputError::Task(_)), None) => {
                Some((TaskLabel::new("background task"), error))
            }
            (Err(_), None) => None,
        };
        if let Some((label, error)) = failure {
            tracing::debug!(seq, label = %label, error = %error, "runner.task.failed");
            table.failures.push(TaskFailure { seq, label, error });
        }
        self.in_flight.send_replace(table.pending.len());
    }

    /// Run `program` with this runner in scope, then drain.
    ///
    /// Returns the program's value if it succeeded. A failing program is
    /// recorded and marks the run fatal; tasks it started are still
    /// drained.
    pub async fn execute<F, T>(&self, program: F) -> Option<T>
    where
        F: Future<Output = Result<T, OutputError>>,
    {
        let seq = self.next_seq();
        let outcome = task::scope(self.tracker(), program).await;
        let value = match outcome {
            Ok(value) => Some(value),
            Err(error) => {
                self.lock().body_failed = true;
                self.push_failure(seq, TaskLabel::new("program"), error);
                None
            }
        };
        self.drain().await;
        value
    }

    /// Wait until no tracked task is in flight.
    ///
    /// Tasks started by other tasks enter the table before their parent
    /// settles, so the table is empty only once all work is done.
    pub async fn drain(&self) {
        {
            let mut table = self.lock();
            if table.state == RunState::Running {
                table.state = RunState::Draining;
            }
            tracing::debug!(tasks = table.pending.len(), "runner.drain.start");
        }
        let mut in_flight = self.in_flight.subscribe();
        // The sender lives as long as `self`, so this only returns once the
        // count reaches zero.
        let _ = in_flight.wait_for(|count| *count == 0).await;
        tracing::debug!("runner.drain.done");
    }

    /// Drain, then settle the final state and report failures.
    pub async fn complete(&self) -> Result<(), RunError> {
        self.drain().await;
        let failures = self.failures();
        let completion = if self.lock().body_failed {
            Completion::Fatal
        } else if failures.is_empty() {
            Completion::Succeeded
        } else {
            Completion::PartiallyFailed
        };
        self.lock().state = RunState::Completed(completion);
        tracing::info!(?completion, failures = failures.len(), "runner.complete");
        match RunError::from_failures(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("task panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("task panicked: {message}")
    } else {
        "task panicked".to_owned()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.lock();
        f.debug_struct("Runner")
            .field("state", &table.state)
            .field("pending", &table.pending.len())
            .field("failures", &table.failures.len())
            .finish()
    }
}

impl TaskTracker for Runner {
    fn track(&self, label: TaskLabel, task: BoxFuture<'static, Result<(), OutputError>>) {
        self.spawn(Some(label), task);
    }

    fn track_background(&self, task: BoxFuture<'static, ()>) {
        self.spawn(
            None,
            Box::pin(async move {
                task.await;
                Ok(())
            }),
        );
    }
}
