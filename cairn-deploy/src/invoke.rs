//! Provider function calls.

use crate::registrar::provider_reference;
use cairn0::error::OutputError;
use cairn0::monitor::{InvokeRequest, Monitor};
use cairn0::output::OutputData;
use cairn0::property::PropertyMap;
use cairn0::resource::{Resource, ResourceRef};
use cairn0::wire::{PropertyBag, WireValue};
use std::sync::Arc;

/// Options for [`Deployment::invoke`](crate::Deployment::invoke).
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Resource the call is made on behalf of.
    pub parent: Option<ResourceRef>,
    /// Provider instance to call through.
    pub provider: Option<ResourceRef>,
    /// Provider plugin version.
    pub version: Option<String>,
}

impl InvokeOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Call on behalf of `parent`.
    pub fn with_parent(mut self, parent: &impl Resource) -> Self {
        self.parent = Some(parent.resource_ref().clone());
        self
    }

    /// Call through `provider`.
    pub fn with_provider(mut self, provider: &impl Resource) -> Self {
        self.provider = Some(provider.resource_ref().clone());
        self
    }

    /// Pin the provider plugin version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Resolve `args` and call `token`.
///
/// Unknown arguments skip the call: the result is unknown. Secret
/// arguments make the result secret. The result depends on whatever the
/// arguments depend on.
pub(crate) async fn invoke(
    monitor: Arc<dyn Monitor>,
    keep_secrets: bool,
    token: String,
    args: PropertyMap,
    options: InvokeOptions,
) -> Result<OutputData<PropertyBag>, OutputError> {
    let resolved = args.resolve().await?;
    if !resolved.known {
        tracing::debug!(token = %token, "invoke.skipped.unknown_args");
        return Ok(OutputData::new(
            None,
            false,
            resolved.secret,
            resolved.dependencies,
        ));
    }

    let values = if keep_secrets {
        resolved.values
    } else {
        resolved
            .values
            .into_iter()
            .map(|(k, v)| (k, v.strip_secrets()))
            .collect()
    };
    let mut request = InvokeRequest::new(token.clone(), values);
    request.provider_ref = match &options.provider {
        Some(provider) => Some(provider_reference(provider).await?),
        None => None,
    };
    request.version = options.version;

    let result = monitor
        .invoke(request)
        .await
        .map_err(|e| OutputError::Invoke {
            token: token.clone(),
            message: e.to_string(),
        })?;

    let (value, known, secret, _) = WireValue::from(result).into_output_data().into_parts();
    let value = value.and_then(|value| match value {
        WireValue::Object(map) => Some(map),
        _ => None,
    });
    Ok(OutputData::new(
        value,
        known,
        secret || resolved.secret,
        resolved.dependencies,
    ))
}
