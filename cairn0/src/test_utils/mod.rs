//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag. A [`MockMonitor`]
//! answers registrations from a [`Mocks`] table without any engine, and a
//! [`RecordingLog`] keeps every diagnostic for inspection.

mod echo_mocks;
mod mock_monitor;
mod recording_log;

pub use echo_mocks::EchoMocks;
pub use mock_monitor::{MockCallArgs, MockMonitor, MockResourceArgs, Mocks};
pub use recording_log::{LogEntry, RecordingLog};
