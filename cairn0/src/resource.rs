//! Declared resources: the nodes of a program's resource tree.
//!
//! A [`ResourceRef`] is created the moment a program declares a resource,
//! long before the engine has assigned it a URN. It carries the declared
//! option bag and a handle on the resource's one and only registration;
//! its URN and ID are delivered as [`Output`]s that resolve once the
//! registration completes.

use crate::error::OutputError;
use crate::id::{ResourceId, Urn};
use crate::output::{Output, OutputData};
use crate::transform::Transformation;
use crate::wire::PropertyBag;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

/// What kind of resource a node is.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Managed by a provider; has an ID.
    Custom,
    /// A logical grouping of child resources; no ID.
    Component,
    /// A provider instance; a custom resource other resources reference.
    Provider,
}

impl ResourceKind {
    /// Whether the engine hands a provider operation for this resource
    /// (custom and provider resources).
    pub fn is_custom(self) -> bool {
        matches!(self, ResourceKind::Custom | ResourceKind::Provider)
    }
}

/// Where a relative alias finds its parent.
#[derive(Debug, Clone)]
pub enum AliasParent {
    /// An explicit parent URN.
    Urn(Output<Urn>),
    /// A parent resource; its URN is awaited.
    Resource(ResourceRef),
}

/// An alias relative to the resource's current identity: every field left
/// `None` keeps the resource's current value.
#[derive(Debug, Clone, Default)]
pub struct RelativeAlias {
    /// Previous type token.
    pub type_token: Option<String>,
    /// Previous name.
    pub name: Option<String>,
    /// Previous stack.
    pub stack: Option<String>,
    /// Previous project.
    pub project: Option<String>,
    /// Previous parent.
    pub parent: Option<AliasParent>,
}

impl RelativeAlias {
    /// An alias with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the type token.
    pub fn with_type(mut self, type_token: impl Into<String>) -> Self {
        self.type_token = Some(type_token.into());
        self
    }

    /// Override the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the stack.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Override the project.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Previous parent given by URN.
    pub fn with_parent_urn(mut self, urn: Output<Urn>) -> Self {
        self.parent = Some(AliasParent::Urn(urn));
        self
    }

    /// Previous parent given by resource.
    pub fn with_parent(mut self, parent: ResourceRef) -> Self {
        self.parent = Some(AliasParent::Resource(parent));
        self
    }
}

/// A historical identity a resource should also be recognised by.
#[derive(Debug, Clone)]
pub enum AliasSpec {
    /// An absolute URN.
    Urn(Urn),
    /// The resource used to have no parent.
    NoParent,
    /// Overrides relative to the current identity.
    Relative(RelativeAlias),
}

/// An alias ready for the wire. Every field is populated; unset ones hold
/// their zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAlias {
    /// Absolute URN, or empty.
    pub urn: String,
    /// Type override, or empty.
    pub type_token: String,
    /// Name override, or empty.
    pub name: String,
    /// Stack override, or empty.
    pub stack: String,
    /// Project override, or empty.
    pub project: String,
    /// Parent URN, or empty.
    pub parent_urn: String,
    /// Whether the resource used to have no parent.
    pub no_parent: bool,
}

/// The option bag every resource is declared with.
#[derive(Clone, Default)]
pub struct ResourceOptions {
    /// Parent in the resource tree. Defaults to the stack.
    pub parent: Option<ResourceRef>,
    /// Explicit dependencies, on top of those carried by input Outputs.
    pub depends_on: Vec<ResourceRef>,
    /// Provider instance to manage the resource with.
    pub provider: Option<ResourceRef>,
    /// Previous identities.
    pub aliases: Vec<AliasSpec>,
    /// Rewrites applied to this resource (custom resources) or to its
    /// children (components).
    pub transformations: Vec<Arc<dyn Transformation>>,
    /// Refuse deletion.
    pub protect: bool,
    /// Input properties whose changes are ignored when diffing.
    pub ignore_changes: Vec<String>,
    /// Output properties to treat as secret whatever the provider says.
    pub additional_secret_outputs: Vec<String>,
    /// Delete before creating the replacement.
    pub delete_before_replace: bool,
    /// Leave the cloud resource in place when it is deleted from the program.
    pub retain_on_delete: bool,
    /// Input properties whose changes force a replacement.
    pub replace_on_changes: Vec<String>,
    /// Adopt an existing cloud resource with this ID.
    pub import_id: Option<String>,
    /// Provider plugin version.
    pub version: Option<String>,
}

impl ResourceOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parent.
    pub fn with_parent(mut self, parent: &impl Resource) -> Self {
        self.parent = Some(parent.resource_ref().clone());
        self
    }

    /// Add an explicit dependency.
    pub fn with_depends_on(mut self, resource: &impl Resource) -> Self {
        self.depends_on.push(resource.resource_ref().clone());
        self
    }

    /// Set the provider.
    pub fn with_provider(mut self, provider: &impl Resource) -> Self {
        self.provider = Some(provider.resource_ref().clone());
        self
    }

    /// Add an alias.
    pub fn with_alias(mut self, alias: AliasSpec) -> Self {
        self.aliases.push(alias);
        self
    }

    /// Append a transformation.
    pub fn with_transformation(mut self, transformation: Arc<dyn Transformation>) -> Self {
        self.transformations.push(transformation);
        self
    }

    /// Set the protect flag.
    pub fn with_protect(mut self, protect: bool) -> Self {
        self.protect = protect;
        self
    }

    /// Ignore changes to an input property.
    pub fn with_ignore_changes(mut self, property: impl Into<String>) -> Self {
        self.ignore_changes.push(property.into());
        self
    }

    /// Treat an output property as secret.
    pub fn with_additional_secret_output(mut self, property: impl Into<String>) -> Self {
        self.additional_secret_outputs.push(property.into());
        self
    }

    /// Set delete-before-replace.
    pub fn with_delete_before_replace(mut self, enabled: bool) -> Self {
        self.delete_before_replace = enabled;
        self
    }

    /// Set retain-on-delete.
    pub fn with_retain_on_delete(mut self, enabled: bool) -> Self {
        self.retain_on_delete = enabled;
        self
    }

    /// Force replacement when an input property changes.
    pub fn with_replace_on_changes(mut self, property: impl Into<String>) -> Self {
        self.replace_on_changes.push(property.into());
        self
    }

    /// Import an existing resource.
    pub fn with_import(mut self, id: impl Into<String>) -> Self {
        self.import_id = Some(id.into());
        self
    }

    /// Pin the provider plugin version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl fmt::Debug for ResourceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("parent", &self.parent)
            .field("depends_on", &self.depends_on)
            .field("provider", &self.provider)
            .field("aliases", &self.aliases)
            .field("transformations", &self.transformations.len())
            .field("protect", &self.protect)
            .field("ignore_changes", &self.ignore_changes)
            .field("additional_secret_outputs", &self.additional_secret_outputs)
            .field("delete_before_replace", &self.delete_before_replace)
            .field("retain_on_delete", &self.retain_on_delete)
            .field("replace_on_changes", &self.replace_on_changes)
            .field("import_id", &self.import_id)
            .field("version", &self.version)
            .finish()
    }
}

/// What the engine handed back for a registered resource.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredState {
    /// Assigned URN.
    pub urn: Urn,
    /// Provider ID; `None` for components and while previewing a create.
    pub id: Option<ResourceId>,
    /// Output properties in wire form.
    pub outputs: PropertyBag,
}

/// The single registration of a resource, shared by everything that waits
/// on it.
pub type Registration = Shared<BoxFuture<'static, Result<Arc<RegisteredState>, OutputError>>>;

/// Identity of a resource being declared.
#[derive(Debug, Clone)]
pub struct ResourceHeader {
    /// Type token (`package:module:Type`).
    pub type_token: String,
    /// Declared name.
    pub name: String,
    /// Kind of node.
    pub kind: ResourceKind,
    /// Effective parent.
    pub parent: Option<ResourceRef>,
    /// Declared options.
    pub options: ResourceOptions,
}

impl ResourceHeader {
    /// A header with empty options and no parent.
    pub fn new(type_token: impl Into<String>, name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            type_token: type_token.into(),
            name: name.into(),
            kind,
            parent: None,
            options: ResourceOptions::new(),
        }
    }
}

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

struct ResourceNode {
    seq: u64,
    header: ResourceHeader,
    registration: OnceLock<Registration>,
}

/// Opaque handle on a declared resource.
///
/// Cheap to clone. Two handles are equal when they name the same
/// declaration; handles order by declaration sequence.
#[derive(Clone)]
pub struct ResourceRef {
    inner: Arc<ResourceNode>,
}

impl ResourceRef {
    /// Declare a resource. `register` receives the new handle and returns
    /// the registration future; it is wrapped so that it runs at most once,
    /// by whoever polls it first.
    pub fn new<F>(header: ResourceHeader, register: F) -> Self
    where
        F: FnOnce(ResourceRef) -> BoxFuture<'static, Result<RegisteredState, OutputError>>,
    {
        let resource = Self {
            inner: Arc::new(ResourceNode {
                seq: NEXT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
                header,
                registration: OnceLock::new(),
            }),
        };
        let registration = register(resource.clone()).map(|r| r.map(Arc::new)).boxed().shared();
        // Freshly created, so nobody else can have filled the cell.
        let _ = resource.inner.registration.set(registration);
        resource
    }

    /// Declaration sequence number, unique within the process.
    pub fn seq(&self) -> u64 {
        self.inner.seq
    }

    /// Type token.
    pub fn type_token(&self) -> &str {
        &self.inner.header.type_token
    }

    /// Declared name.
    pub fn name(&self) -> &str {
        &self.inner.header.name
    }

    /// Kind of node.
    pub fn kind(&self) -> ResourceKind {
        self.inner.header.kind
    }

    /// Effective parent.
    pub fn parent(&self) -> Option<&ResourceRef> {
        self.inner.header.parent.as_ref()
    }

    /// Declared options.
    pub fn options(&self) -> &ResourceOptions {
        &self.inner.header.options
    }

    /// Ancestors, immediate parent first.
    pub fn ancestors(&self) -> impl Iterator<Item = &ResourceRef> {
        std::iter::successors(self.parent(), |r| r.parent())
    }

    /// The shared registration future.
    pub fn registration(&self) -> Registration {
        match self.inner.registration.get() {
            Some(registration) => registration.clone(),
            None => future::ready(Err(OutputError::other(format!(
                "{self} has no registration"
            ))))
            .boxed()
            .shared(),
        }
    }

    /// The resource's URN. Depends on this resource.
    pub fn urn(&self) -> Output<Urn> {
        let registration = self.registration();
        let me = self.clone();
        Output::from_data(async move {
            let state = registration.await?;
            Ok(OutputData::known(state.urn.clone()).with_dependencies(&me.singleton()))
        })
    }

    /// The provider-assigned ID; unknown while previewing a create. `None`
    /// for components.
    pub fn id(&self) -> Option<Output<ResourceId>> {
        if !self.kind().is_custom() {
            return None;
        }
        let registration = self.registration();
        let me = self.clone();
        Some(Output::from_data(async move {
            let state = registration.await?;
            let data = match state.id.as_ref() {
                Some(id) if !id.as_str().is_empty() => OutputData::known(id.clone()),
                _ => OutputData::unknown(),
            };
            Ok(data.with_dependencies(&me.singleton()))
        }))
    }

    fn singleton(&self) -> crate::output::DependencySet {
        crate::output::DependencySet::singleton(self.clone())
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.inner.seq == other.inner.seq
    }
}

impl Eq for ResourceRef {}

impl PartialOrd for ResourceRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResourceRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.seq.cmp(&other.inner.seq)
    }
}

impl Hash for ResourceRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.seq.hash(state);
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.type_token(), self.name())
    }
}

impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceRef({self})")
    }
}

/// Anything that stands for a declared resource.
pub trait Resource {
    /// The underlying handle.
    fn resource_ref(&self) -> &ResourceRef;

    /// Type token.
    fn type_token(&self) -> &str {
        self.resource_ref().type_token()
    }

    /// Declared name.
    fn name(&self) -> &str {
        self.resource_ref().name()
    }

    /// Effective parent.
    fn parent(&self) -> Option<&ResourceRef> {
        self.resource_ref().parent()
    }

    /// Declared options.
    fn options(&self) -> &ResourceOptions {
        self.resource_ref().options()
    }
}

impl Resource for ResourceRef {
    fn resource_ref(&self) -> &ResourceRef {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn registered(header: ResourceHeader, calls: Arc<AtomicUsize>) -> ResourceRef {
        ResourceRef::new(header, move |me| {
            async move {
                calls.fetch_add(1, AtomicOrdering::SeqCst);
                Ok(RegisteredState {
                    urn: Urn::new(format!("urn:cairn:dev::p::{}::{}", me.type_token(), me.name())),
                    id: Some(ResourceId::new("id-1")),
                    outputs: PropertyBag::new(),
                })
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn urn_and_id_depend_on_the_resource() {
        let calls = Arc::new(AtomicUsize::new(0));
        let r = registered(ResourceHeader::new("t:m:T", "a", ResourceKind::Custom), calls.clone());
        let urn = r.urn().resolve().await.unwrap();
        assert_eq!(urn.value().unwrap().as_str(), "urn:cairn:dev::p::t:m:T::a");
        assert!(urn.dependencies().contains(&r));
        let id = r.id().unwrap().resolve().await.unwrap();
        assert_eq!(id.value().unwrap().as_str(), "id-1");
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn components_have_no_id() {
        let calls = Arc::new(AtomicUsize::new(0));
        let r = registered(ResourceHeader::new("t:m:C", "c", ResourceKind::Component), calls);
        assert!(r.id().is_none());
    }

    #[test]
    fn ancestors_walk_outward() {
        let calls = Arc::new(AtomicUsize::new(0));
        let root = registered(ResourceHeader::new("t:m:R", "root", ResourceKind::Component), calls.clone());
        let mut mid = ResourceHeader::new("t:m:M", "mid", ResourceKind::Component);
        mid.parent = Some(root.clone());
        let mid = registered(mid, calls.clone());
        let mut leaf = ResourceHeader::new("t:m:L", "leaf", ResourceKind::Custom);
        leaf.parent = Some(mid.clone());
        let leaf = registered(leaf, calls);
        let names: Vec<&str> = leaf.ancestors().map(|r| r.name()).collect();
        assert_eq!(names, vec!["mid", "root"]);
    }

    #[test]
    fn equality_is_by_declaration() {
        let calls = Arc::new(AtomicUsize::new(0));
        let a = registered(ResourceHeader::new("t:m:T", "same", ResourceKind::Custom), calls.clone());
        let b = registered(ResourceHeader::new("t:m:T", "same", ResourceKind::Custom), calls);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert!(a < b);
    }
}
