//! One resource's registration, start to finish.
//!
//! Steps run strictly in order: transformations, aliases, input
//! resolution, the Monitor call, then output decoding. Independent
//! resources run these concurrently; a resource whose inputs come from
//! another resource's Outputs waits at input resolution until the upstream
//! registration has completed.

use crate::alias::resolve_aliases;
use crate::deployment::Deployment;
use cairn0::error::OutputError;
use cairn0::id::ResourceId;
use cairn0::monitor::RegisterResourceRequest;
use cairn0::output::DependencySet;
use cairn0::property::PropertyMap;
use cairn0::resource::{RegisteredState, ResourceRef};
use cairn0::wire::{UNKNOWN_SENTINEL, WireValue};
use cairn_transforms::TransformationChain;

/// Register `resource` with the deployment's Monitor.
///
/// Any failure is reported as a registration failure of this resource,
/// except transformation failures, which keep their own attribution.
pub(crate) async fn register(
    deployment: Deployment,
    resource: ResourceRef,
    args: PropertyMap,
) -> Result<RegisteredState, OutputError> {
    let log = deployment.log();
    log.debug("registering", Some(&resource));
    match run_steps(&deployment, &resource, args).await {
        Ok(state) => {
            log.debug(&format!("registered as {}", state.urn), Some(&resource));
            Ok(state)
        }
        Err(error) => {
            let error = match error {
                e @ OutputError::Transformation { .. } => e,
                e @ OutputError::Registration { .. }
                    if e.resource() == Some(resource.to_string().as_str()) =>
                {
                    e
                }
                other => OutputError::Registration {
                    resource: resource.to_string(),
                    message: other.to_string(),
                },
            };
            log.error(&error.to_string(), Some(&resource));
            Err(error)
        }
    }
}

async fn run_steps(
    deployment: &Deployment,
    resource: &ResourceRef,
    args: PropertyMap,
) -> Result<RegisteredState, OutputError> {
    // 1. transformations
    let chain = TransformationChain::for_resource(resource, &deployment.stack_transformations());
    let (args, options) = chain.apply(resource, args, resource.options().clone()).await?;

    // 2. aliases
    let aliases = resolve_aliases(&options.aliases).await?;

    // 3. inputs and everything the request refers to
    let inputs = args.resolve().await?;
    let mut dependencies = inputs.dependencies.clone();
    for dependency in &options.depends_on {
        // Explicit dependencies must finish registering first.
        dependency.urn().resolve().await?;
        dependencies.insert(dependency.clone());
    }
    let parent_urn = match resource.parent() {
        Some(parent) => parent.urn().resolve().await?.into_value(),
        None => None,
    };
    let provider_ref = match &options.provider {
        Some(provider) => Some(provider_reference(provider).await?),
        None => None,
    };
    let properties = if deployment.keep_secrets().await {
        inputs.values
    } else {
        inputs
            .values
            .into_iter()
            .map(|(k, v)| (k, v.strip_secrets()))
            .collect()
    };

    // 4. the Monitor call
    let mut request =
        RegisterResourceRequest::new(resource.type_token(), resource.name(), resource.kind().is_custom());
    request.parent = resource.parent().cloned();
    request.parent_urn = parent_urn;
    request.properties = properties;
    request.dependencies = to_vec(&dependencies);
    request.property_dependencies = inputs
        .property_dependencies
        .iter()
        .map(|(key, deps)| (key.clone(), to_vec(deps)))
        .collect();
    request.aliases = aliases;
    request.protect = options.protect;
    request.provider = options.provider.clone();
    request.provider_ref = provider_ref;
    request.ignore_changes = options.ignore_changes.clone();
    request.additional_secret_outputs = options.additional_secret_outputs.clone();
    request.delete_before_replace = options.delete_before_replace;
    request.retain_on_delete = options.retain_on_delete;
    request.replace_on_changes = options.replace_on_changes.clone();
    request.import_id = options.import_id.clone().map(ResourceId::new);
    request.version = options.version.clone();

    tracing::debug!(
        resource = %resource,
        dependencies = request.dependencies.len(),
        aliases = request.aliases.len(),
        "registrar.request"
    );
    let response = deployment
        .monitor()
        .register_resource(request)
        .await
        .map_err(|e| OutputError::Registration {
            resource: resource.to_string(),
            message: e.to_string(),
        })?;

    // 5. outputs
    let mut outputs = response.properties;
    for field in &options.additional_secret_outputs {
        if let Some(value) = outputs.remove(field) {
            outputs.insert(field.clone(), WireValue::secret(value));
        }
    }
    Ok(RegisteredState {
        urn: response.urn,
        id: response.id,
        outputs,
    })
}

fn to_vec(dependencies: &DependencySet) -> Vec<ResourceRef> {
    dependencies.iter().cloned().collect()
}

/// `<urn>::<id>` for a provider resource. An ID that is not known yet
/// (preview) is sent as the unknown sentinel.
pub(crate) async fn provider_reference(provider: &ResourceRef) -> Result<String, OutputError> {
    let urn = provider
        .urn()
        .resolve()
        .await?
        .into_value()
        .map(|urn| urn.to_string())
        .unwrap_or_default();
    let id = match provider.id() {
        Some(id) => id.resolve().await?.into_value(),
        None => None,
    };
    let id = id
        .map(|id| id.to_string())
        .unwrap_or_else(|| UNKNOWN_SENTINEL.to_owned());
    Ok(format!("{urn}::{id}"))
}
