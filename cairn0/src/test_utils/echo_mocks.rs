//! EchoMocks: every resource's state is its inputs.

use super::mock_monitor::{MockCallArgs, MockResourceArgs, Mocks};
use crate::error::MonitorError;
use crate::wire::PropertyBag;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// A [`Mocks`] table that echoes inputs back as state and assigns
/// `<name>_id` as ID.
///
/// Per-name delays, failures and extra outputs script the awkward cases;
/// function calls echo their arguments.
#[derive(Debug, Clone, Default)]
pub struct EchoMocks {
    delays: BTreeMap<String, Duration>,
    failures: BTreeMap<String, String>,
    outputs: BTreeMap<String, PropertyBag>,
}

impl EchoMocks {
    /// Echo everything, immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the registration of `name` for `delay`.
    pub fn with_delay(mut self, name: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(name.into(), delay);
        self
    }

    /// Fail the registration of `name` (or a call to the function `name`)
    /// with a provider error.
    pub fn with_failure(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(name.into(), message.into());
        self
    }

    /// Merge `outputs` into the state of `name`.
    pub fn with_outputs(mut self, name: impl Into<String>, outputs: PropertyBag) -> Self {
        self.outputs.insert(name.into(), outputs);
        self
    }
}

#[async_trait]
impl Mocks for EchoMocks {
    async fn new_resource(
        &self,
        args: MockResourceArgs,
    ) -> Result<(Option<String>, PropertyBag), MonitorError> {
        if let Some(delay) = self.delays.get(&args.name) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(&args.name) {
            return Err(MonitorError::Provider(message.clone()));
        }
        let id = args.import_id.unwrap_or_else(|| format!("{}_id", args.name));
        let mut state = args.inputs;
        if let Some(extra) = self.outputs.get(&args.name) {
            state.extend(extra.clone());
        }
        Ok((Some(id), state))
    }

    async fn call(&self, args: MockCallArgs) -> Result<PropertyBag, MonitorError> {
        if let Some(message) = self.failures.get(&args.token) {
            return Err(MonitorError::Provider(message.clone()));
        }
        Ok(args.args)
    }
}
