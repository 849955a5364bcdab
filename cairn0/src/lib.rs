//! # cairn0: deferred values and protocol traits for resource programs
//!
//! This crate defines the vocabulary every other `cairn` crate speaks:
//! the deferred value type, the description of a declared resource, and
//! the two contracts that terminate the core at the external engine.
//!
//! ## The Building Blocks
//!
//! | Block | Types | What it does |
//! |-------|-------|-------------|
//! | ① Deferred value | [`Output`], [`OutputData`], [`DependencySet`] | Known/secret/dependency propagation |
//! | ② Wire | [`WireValue`], [`PropertyMap`] | Engine encoding, inputs with embedded Outputs |
//! | ③ Resource | [`ResourceRef`], [`ResourceOptions`], [`AliasSpec`] | Declared nodes of the resource tree |
//! | ④ Monitor | [`Monitor`] | Registers resources and invokes provider functions |
//! | ⑤ Log | [`Log`] | Fire-and-forget diagnostics |
//! | ⑥ Transformation | [`Transformation`] | Rewrites args/options before registration |
//!
//! ## Task Tracking
//!
//! Outputs built by combinators are driven eagerly. When a [`TaskTracker`]
//! is in scope (see [`task::scope`]), the background work is handed to it,
//! so whoever owns the tracker can wait for every callback a program set
//! in motion. Outside any tracker the work is spawned on the current tokio
//! runtime, and outside any runtime the Output stays lazy until awaited.
//!
//! ## Dependency Notes
//!
//! Protocol traits use `async-trait` (heap-allocated futures) so that
//! monitors and transformations can live behind `Arc<dyn _>`. Outputs are
//! built on `futures::future::Shared`, so cloning an Output never repeats
//! the computation behind it.

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod id;
pub mod log;
pub mod monitor;
pub mod output;
pub mod property;
pub mod resource;
pub mod task;
pub mod transform;
pub mod wire;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, MonitorError, OutputError};
pub use id::{ResourceId, STACK_TYPE, Urn};
pub use log::{Log, Severity, TracingLog};
pub use monitor::{InvokeRequest, Monitor, RegisterResourceRequest, RegisterResourceResponse};
pub use output::{DependencySet, Output, OutputData, OutputValue};
pub use property::{PropertyMap, PropertyValue, ResolvedProperties};
pub use resource::{
    AliasParent, AliasSpec, RegisteredState, Registration, RelativeAlias, Resource,
    ResourceHeader, ResourceKind, ResourceOptions, ResourceRef, ResolvedAlias,
};
pub use task::{TaskLabel, TaskTracker};
pub use transform::{TransformResult, Transformation};
pub use wire::{PropertyBag, WireValue};
