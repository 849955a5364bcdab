//! Declaring resources and reading back what the engine assigned.

use crate::error::DeployError;
use cairn0::id::{ResourceId, Urn};
use cairn0::output::{DependencySet, Output, OutputData, OutputValue};
use cairn0::property::{PropertyMap, PropertyValue};
use cairn0::resource::{Resource, ResourceKind, ResourceOptions, ResourceRef};
use cairn0::wire::WireValue;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Prefix of every provider resource's type token.
pub const PROVIDER_TYPE_PREFIX: &str = "cairn:providers:";

/// Everything needed to declare one resource.
#[derive(Debug, Clone)]
pub struct ResourceDecl {
    /// Type token.
    pub type_token: String,
    /// Declared name.
    pub name: String,
    /// Kind of node.
    pub kind: ResourceKind,
    /// Input properties.
    pub args: PropertyMap,
    /// Options.
    pub options: ResourceOptions,
    /// Output fields the program will read.
    pub outputs: Vec<String>,
}

impl ResourceDecl {
    fn new(type_token: String, name: String, kind: ResourceKind) -> Self {
        Self {
            type_token,
            name,
            kind,
            args: PropertyMap::new(),
            options: ResourceOptions::new(),
            outputs: Vec::new(),
        }
    }

    /// A provider-managed resource.
    pub fn custom(type_token: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(type_token.into(), name.into(), ResourceKind::Custom)
    }

    /// A logical grouping of child resources.
    pub fn component(type_token: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(type_token.into(), name.into(), ResourceKind::Component)
    }

    /// A provider instance for `package` (type `cairn:providers:<package>`).
    pub fn provider(package: &str, name: impl Into<String>) -> Self {
        Self::new(
            format!("{PROVIDER_TYPE_PREFIX}{package}"),
            name.into(),
            ResourceKind::Provider,
        )
    }

    /// Set one input property.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Replace every input property.
    pub fn args(mut self, args: PropertyMap) -> Self {
        self.args = args;
        self
    }

    /// Replace the options.
    pub fn options(mut self, options: ResourceOptions) -> Self {
        self.options = options;
        self
    }

    /// Declare the output fields the program reads.
    pub fn outputs<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.extend(fields.into_iter().map(Into::into));
        self
    }
}

/// A declared resource, as the program sees it.
///
/// Its URN, ID and output fields are Outputs that resolve once the
/// registration completes. Each of them depends on exactly this resource.
#[derive(Debug, Clone)]
pub struct DeployedResource {
    resource: ResourceRef,
    outputs: Arc<[String]>,
    dry_run: bool,
}

impl DeployedResource {
    pub(crate) fn new(resource: ResourceRef, outputs: Vec<String>, dry_run: bool) -> Self {
        Self {
            resource,
            outputs: outputs.into(),
            dry_run,
        }
    }

    /// The resource's URN.
    pub fn urn(&self) -> Output<Urn> {
        self.resource.urn()
    }

    /// The provider-assigned ID; unknown while previewing a create.
    pub fn id(&self) -> Result<Output<ResourceId>, DeployError> {
        self.resource.id().ok_or_else(|| DeployError::NotCustom {
            resource: self.resource.to_string(),
        })
    }

    /// Output fields the resource was declared with.
    pub fn declared_outputs(&self) -> &[String] {
        &self.outputs
    }

    /// One output field in wire form.
    ///
    /// A field the engine did not report is unknown while previewing and
    /// known-absent otherwise.
    pub fn output(&self, field: &str) -> Result<Output<WireValue>, DeployError> {
        if !self.outputs.iter().any(|f| f == field) {
            return Err(DeployError::UnknownOutputField {
                resource: self.resource.to_string(),
                field: field.to_owned(),
            });
        }
        let registration = self.resource.registration();
        let me = self.resource.clone();
        let field = field.to_owned();
        let dry_run = self.dry_run;
        Ok(Output::from_data(async move {
            let state = registration.await?;
            let data = match state.outputs.get(&field) {
                Some(value) => value.clone().into_output_data(),
                None if dry_run => OutputData::unknown(),
                None => OutputData::absent(),
            };
            Ok(data.with_dependencies(&DependencySet::singleton(me)))
        }))
    }

    /// One output field, deserialized.
    pub fn output_as<T>(&self, field: &str) -> Result<Output<T>, DeployError>
    where
        T: DeserializeOwned + OutputValue,
    {
        Ok(self
            .output(field)?
            .try_map(|value| Ok(value.deserialize_into()?)))
    }
}

impl Resource for DeployedResource {
    fn resource_ref(&self) -> &ResourceRef {
        &self.resource
    }
}
