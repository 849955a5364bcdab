//! The Monitor protocol: how the core talks to the external engine.

use crate::error::MonitorError;
use crate::id::{ResourceId, Urn};
use crate::resource::{ResolvedAlias, ResourceRef};
use crate::wire::PropertyBag;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// The remote registration service.
///
/// Implementations:
/// - a gRPC client talking to the engine (out of scope here)
/// - `MockMonitor` in `test_utils`: answers from a `Mocks` table,
///   no network
///
/// Calling code doesn't know which implementation is behind the trait.
/// Timeouts and retries belong to the implementation's RPC layer.
#[async_trait]
pub trait Monitor: Send + Sync {
    /// Register one resource and wait for the engine's answer.
    async fn register_resource(
        &self,
        request: RegisterResourceRequest,
    ) -> Result<RegisterResourceResponse, MonitorError>;

    /// Invoke a provider function.
    async fn invoke(&self, request: InvokeRequest) -> Result<PropertyBag, MonitorError>;

    /// Whether the engine understands an optional protocol feature
    /// (`"secrets"`, for instance). The default supports none.
    async fn supports_feature(&self, feature: &str) -> bool {
        let _ = feature;
        false
    }

    /// Attach outputs to an already registered resource (stack exports,
    /// component outputs). The default accepts and discards them.
    async fn register_resource_outputs(
        &self,
        urn: &Urn,
        outputs: PropertyBag,
    ) -> Result<(), MonitorError> {
        let _ = (urn, outputs);
        Ok(())
    }
}

/// A create/update request for one resource.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct RegisterResourceRequest {
    /// Type token.
    pub type_token: String,
    /// Declared name.
    pub name: String,
    /// Parent resource.
    pub parent: Option<ResourceRef>,
    /// Parent's URN, resolved.
    pub parent_urn: Option<Urn>,
    /// Whether a provider manages the resource (custom or provider kind).
    pub custom: bool,
    /// Input properties in wire form.
    pub properties: PropertyBag,
    /// Every resource this one depends on, in declaration order.
    pub dependencies: Vec<ResourceRef>,
    /// Dependencies per input property.
    pub property_dependencies: BTreeMap<String, Vec<ResourceRef>>,
    /// Previous identities.
    pub aliases: Vec<ResolvedAlias>,
    /// Refuse deletion.
    pub protect: bool,
    /// Explicit provider resource.
    pub provider: Option<ResourceRef>,
    /// Provider reference string (`<urn>::<id>`).
    pub provider_ref: Option<String>,
    /// Input properties whose changes are ignored.
    pub ignore_changes: Vec<String>,
    /// Output properties the engine must treat as secret.
    pub additional_secret_outputs: Vec<String>,
    /// Delete before creating the replacement.
    pub delete_before_replace: bool,
    /// Leave the cloud resource behind on delete.
    pub retain_on_delete: bool,
    /// Input properties whose changes force replacement.
    pub replace_on_changes: Vec<String>,
    /// ID of an existing resource to adopt.
    pub import_id: Option<ResourceId>,
    /// Provider plugin version.
    pub version: Option<String>,
}

impl RegisterResourceRequest {
    /// A request with no properties and default options.
    pub fn new(type_token: impl Into<String>, name: impl Into<String>, custom: bool) -> Self {
        Self {
            type_token: type_token.into(),
            name: name.into(),
            parent: None,
            parent_urn: None,
            custom,
            properties: PropertyBag::new(),
            dependencies: vec![],
            property_dependencies: BTreeMap::new(),
            aliases: vec![],
            protect: false,
            provider: None,
            provider_ref: None,
            ignore_changes: vec![],
            additional_secret_outputs: vec![],
            delete_before_replace: false,
            retain_on_delete: false,
            replace_on_changes: vec![],
            import_id: None,
            version: None,
        }
    }
}

/// The engine's answer to a [`RegisterResourceRequest`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterResourceResponse {
    /// Assigned URN.
    pub urn: Urn,
    /// Provider ID. `None` (or empty) while previewing a create.
    pub id: Option<ResourceId>,
    /// Output properties; unknown and secret markers preserved.
    pub properties: PropertyBag,
}

impl RegisterResourceResponse {
    /// Create a response.
    pub fn new(urn: Urn, id: Option<ResourceId>, properties: PropertyBag) -> Self {
        Self {
            urn,
            id,
            properties,
        }
    }
}

/// A provider function call.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    /// Function token (`package:module:function`).
    pub token: String,
    /// Arguments in wire form.
    pub args: PropertyBag,
    /// Provider reference string (`<urn>::<id>`).
    pub provider_ref: Option<String>,
    /// Provider plugin version.
    pub version: Option<String>,
}

impl InvokeRequest {
    /// Create an invoke request.
    pub fn new(token: impl Into<String>, args: PropertyBag) -> Self {
        Self {
            token: token.into(),
            args,
            provider_ref: None,
            version: None,
        }
    }
}
