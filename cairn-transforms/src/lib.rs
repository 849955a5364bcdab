#![deny(missing_docs)]
//! Transformation chains for cairn.
//!
//! A [`TransformationChain`] is the ordered list of [`Transformation`]s a
//! resource passes through before it is registered. The order goes from
//! most to least specific:
//!
//! 1. the resource's own transformations (custom and provider resources
//!    only; a component's own list is for its children),
//! 2. each ancestor's transformations, immediate parent first,
//! 3. the stack-level transformations, except for the root stack itself.
//!
//! A chain may rewrite args and any option except the parent: the
//! resource's place in the tree is fixed when it is declared, so a step
//! that moves it fails the chain.
//!
//! Steps run one after another. A step returning a replacement pair feeds
//! that pair to every later step; a step returning `None` passes the
//! current pair through. The first failing step stops the chain.
//!
//! Closures can stand in for full trait implementations through
//! [`transformation_fn`] and [`async_transformation_fn`].

use async_trait::async_trait;
use cairn0::error::OutputError;
use cairn0::id::STACK_TYPE;
use cairn0::property::PropertyMap;
use cairn0::resource::{ResourceOptions, ResourceRef};
use cairn0::transform::{TransformResult, Transformation};
use futures::future::BoxFuture;
use std::sync::Arc;

/// An ordered pipeline of transformations for one registration.
#[derive(Clone, Default)]
pub struct TransformationChain {
    steps: Vec<Arc<dyn Transformation>>,
}

impl TransformationChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step to the end of the chain.
    pub fn add(&mut self, step: Arc<dyn Transformation>) {
        self.steps.push(step);
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The effective chain for `resource`: its own list (unless it is a
    /// component), then each ancestor's, then `stack`. The stack-level
    /// list belongs to the root stack, so it skips the root itself.
    pub fn for_resource(resource: &ResourceRef, stack: &[Arc<dyn Transformation>]) -> Self {
        let mut chain = Self::new();
        if resource.kind().is_custom() {
            chain.steps.extend(resource.options().transformations.iter().cloned());
        }
        for ancestor in resource.ancestors() {
            chain
                .steps
                .extend(ancestor.options().transformations.iter().cloned());
        }
        if !is_root_stack(resource) {
            chain.steps.extend(stack.iter().cloned());
        }
        chain
    }

    /// Run every step in order and return the final pair.
    ///
    /// A failing step is reported as [`OutputError::Transformation`]
    /// attributed to `resource`, and so is a step whose replacement options
    /// name a different parent.
    pub async fn apply(
        &self,
        resource: &ResourceRef,
        mut args: PropertyMap,
        mut options: ResourceOptions,
    ) -> Result<(PropertyMap, ResourceOptions), OutputError> {
        for (index, step) in self.steps.iter().enumerate() {
            let replacement = step
                .transform(resource, &args, &options)
                .await
                .map_err(|e| attribute(resource, e))?;
            tracing::debug!(
                resource = %resource,
                step = index,
                replaced = replacement.is_some(),
                "transform.step"
            );
            if let Some(TransformResult {
                args: new_args,
                options: new_options,
            }) = replacement
            {
                if new_options.parent != options.parent {
                    return Err(OutputError::Transformation {
                        resource: resource.to_string(),
                        message: "transformations cannot change the parent of a resource".into(),
                    });
                }
                args = new_args;
                options = new_options;
            }
        }
        Ok((args, options))
    }
}

impl std::fmt::Debug for TransformationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformationChain")
            .field("steps", &self.steps.len())
            .finish()
    }
}

fn is_root_stack(resource: &ResourceRef) -> bool {
    resource.parent().is_none() && resource.type_token() == STACK_TYPE
}

fn attribute(resource: &ResourceRef, error: OutputError) -> OutputError {
    match error {
        e @ OutputError::Transformation { .. } => e,
        other => OutputError::Transformation {
            resource: resource.to_string(),
            message: other.to_string(),
        },
    }
}

struct TransformationFn<F> {
    f: F,
}

#[async_trait]
impl<F> Transformation for TransformationFn<F>
where
    F: Fn(&ResourceRef, &PropertyMap, &ResourceOptions) -> Option<TransformResult>
        + Send
        + Sync,
{
    async fn transform(
        &self,
        resource: &ResourceRef,
        args: &PropertyMap,
        options: &ResourceOptions,
    ) -> Result<Option<TransformResult>, OutputError> {
        Ok((self.f)(resource, args, options))
    }
}

/// Create a transformation from a synchronous closure.
///
/// # Example
///
/// ```
/// use cairn_transforms::transformation_fn;
/// use cairn0::transform::TransformResult;
///
/// let protect_everything = transformation_fn(|_resource, args, options| {
///     Some(TransformResult::new(
///         args.clone(),
///         options.clone().with_protect(true),
///     ))
/// });
/// # let _ = protect_everything;
/// ```
pub fn transformation_fn<F>(f: F) -> Arc<dyn Transformation>
where
    F: Fn(&ResourceRef, &PropertyMap, &ResourceOptions) -> Option<TransformResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(TransformationFn { f })
}

struct AsyncTransformationFn<F> {
    f: F,
}

#[async_trait]
impl<F> Transformation for AsyncTransformationFn<F>
where
    F: for<'a> Fn(
            &'a ResourceRef,
            &'a PropertyMap,
            &'a ResourceOptions,
        ) -> BoxFuture<'a, Result<Option<TransformResult>, OutputError>>
        + Send
        + Sync,
{
    async fn transform(
        &self,
        resource: &ResourceRef,
        args: &PropertyMap,
        options: &ResourceOptions,
    ) -> Result<Option<TransformResult>, OutputError> {
        (self.f)(resource, args, options).await
    }
}

/// Create a transformation from a closure returning a boxed future.
///
/// The closure must return a `Box::pin(async move { ... })` future.
pub fn async_transformation_fn<F>(f: F) -> Arc<dyn Transformation>
where
    F: for<'a> Fn(
            &'a ResourceRef,
            &'a PropertyMap,
            &'a ResourceOptions,
        ) -> BoxFuture<'a, Result<Option<TransformResult>, OutputError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(AsyncTransformationFn { f })
}
