//! The Transformation interface: rewriting a resource before it registers.

use crate::error::OutputError;
use crate::property::PropertyMap;
use crate::resource::{ResourceOptions, ResourceRef};
use async_trait::async_trait;

/// A replacement `(args, options)` pair.
#[derive(Debug, Clone)]
pub struct TransformResult {
    /// Replacement input properties.
    pub args: PropertyMap,
    /// Replacement options.
    pub options: ResourceOptions,
}

impl TransformResult {
    /// Create a replacement pair.
    pub fn new(args: PropertyMap, options: ResourceOptions) -> Self {
        Self { args, options }
    }
}

/// A rewrite applied to a resource's args and options before registration.
///
/// Returning `Ok(None)` keeps the current pair. Transformations attached to
/// a component apply to its children; attached to a custom resource they
/// apply to the resource itself. Stack-level transformations apply to
/// every resource, after all others.
#[async_trait]
pub trait Transformation: Send + Sync {
    /// Decide on a replacement pair for `resource`.
    async fn transform(
        &self,
        resource: &ResourceRef,
        args: &PropertyMap,
        options: &ResourceOptions,
    ) -> Result<Option<TransformResult>, OutputError>;
}
