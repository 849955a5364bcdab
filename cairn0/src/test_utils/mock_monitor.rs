//! MockMonitor: a Monitor that answers from a [`Mocks`] table.

use crate::error::MonitorError;
use crate::id::{ResourceId, Urn};
use crate::monitor::{InvokeRequest, Monitor, RegisterResourceRequest, RegisterResourceResponse};
use crate::wire::PropertyBag;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

const SUPPORTED_FEATURES: &[&str] = &["secrets", "resourceReferences"];

/// What a mocked resource registration sees.
#[derive(Debug, Clone)]
pub struct MockResourceArgs {
    /// Type token.
    pub type_token: String,
    /// Declared name.
    pub name: String,
    /// Input properties, secret and unknown markers intact.
    pub inputs: PropertyBag,
    /// Provider reference, if one was given.
    pub provider: Option<String>,
    /// ID of the resource being imported, if any.
    pub import_id: Option<String>,
}

/// What a mocked provider function call sees.
#[derive(Debug, Clone)]
pub struct MockCallArgs {
    /// Function token.
    pub token: String,
    /// Arguments.
    pub args: PropertyBag,
    /// Provider reference, if one was given.
    pub provider: Option<String>,
}

/// The provider behaviour behind a [`MockMonitor`].
#[async_trait]
pub trait Mocks: Send + Sync {
    /// Create a custom resource: return its ID and output state.
    async fn new_resource(
        &self,
        args: MockResourceArgs,
    ) -> Result<(Option<String>, PropertyBag), MonitorError>;

    /// Run a provider function.
    async fn call(&self, args: MockCallArgs) -> Result<PropertyBag, MonitorError>;
}

/// A [`Monitor`] that builds URNs itself and asks a [`Mocks`] table for
/// everything a provider would decide.
///
/// Components and the stack never reach the mocks; their state is their
/// inputs. While previewing, a custom resource's ID is withheld (the
/// engine only knows it after a real create) unless it is being imported.
///
/// Every request is recorded: use [`registrations`](Self::registrations),
/// [`invokes`](Self::invokes) and [`resource_outputs`](Self::resource_outputs)
/// to inspect what a program sent.
pub struct MockMonitor<M> {
    mocks: M,
    project: String,
    stack: String,
    dry_run: bool,
    registrations: Mutex<Vec<RegisterResourceRequest>>,
    invokes: Mutex<Vec<InvokeRequest>>,
    resource_outputs: Mutex<BTreeMap<Urn, PropertyBag>>,
}

impl<M: Mocks> MockMonitor<M> {
    /// A monitor for `project`/`stack`, performing an update.
    pub fn new(mocks: M, project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            mocks,
            project: project.into(),
            stack: stack.into(),
            dry_run: false,
            registrations: Mutex::new(Vec::new()),
            invokes: Mutex::new(Vec::new()),
            resource_outputs: Mutex::new(BTreeMap::new()),
        }
    }

    /// Behave as during a preview.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Every registration request received, in arrival order.
    pub fn registrations(&self) -> Vec<RegisterResourceRequest> {
        lock(&self.registrations).clone()
    }

    /// The registration request for `name`, if one arrived.
    pub fn registration(&self, name: &str) -> Option<RegisterResourceRequest> {
        lock(&self.registrations)
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }

    /// How many registration requests named `name` arrived.
    pub fn registration_count(&self, name: &str) -> usize {
        lock(&self.registrations)
            .iter()
            .filter(|r| r.name == name)
            .count()
    }

    /// Every invoke request received, in arrival order.
    pub fn invokes(&self) -> Vec<InvokeRequest> {
        lock(&self.invokes).clone()
    }

    /// Outputs attached with `register_resource_outputs`, by URN.
    pub fn resource_outputs(&self) -> BTreeMap<Urn, PropertyBag> {
        lock(&self.resource_outputs).clone()
    }

    /// The mocks table.
    pub fn mocks(&self) -> &M {
        &self.mocks
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl<M: Mocks> Monitor for MockMonitor<M> {
    async fn register_resource(
        &self,
        request: RegisterResourceRequest,
    ) -> Result<RegisterResourceResponse, MonitorError> {
        lock(&self.registrations).push(request.clone());
        let urn = Urn::compose(
            &self.stack,
            &self.project,
            request.parent_urn.as_ref(),
            &request.type_token,
            &request.name,
        );
        if !request.custom {
            return Ok(RegisterResourceResponse::new(urn, None, request.properties));
        }

        let import_id = request.import_id.as_ref().map(|id| id.as_str().to_owned());
        let (id, state) = self
            .mocks
            .new_resource(MockResourceArgs {
                type_token: request.type_token.clone(),
                name: request.name.clone(),
                inputs: request.properties.clone(),
                provider: request.provider_ref.clone(),
                import_id: import_id.clone(),
            })
            .await?;
        let id = if self.dry_run && import_id.is_none() {
            None
        } else {
            id.map(ResourceId::new)
        };
        Ok(RegisterResourceResponse::new(urn, id, state))
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<PropertyBag, MonitorError> {
        lock(&self.invokes).push(request.clone());
        self.mocks
            .call(MockCallArgs {
                token: request.token,
                args: request.args,
                provider: request.provider_ref,
            })
            .await
    }

    async fn supports_feature(&self, feature: &str) -> bool {
        SUPPORTED_FEATURES.contains(&feature)
    }

    async fn register_resource_outputs(
        &self,
        urn: &Urn,
        outputs: PropertyBag,
    ) -> Result<(), MonitorError> {
        lock(&self.resource_outputs).insert(urn.clone(), outputs);
        Ok(())
    }
}
