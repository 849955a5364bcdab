#![deny(missing_docs)]
//! Resource registration and program lifecycle for cairn.
//!
//! A [`Deployment`] is the explicit context a program runs against. It
//! registers the root stack, hands the program a handle for declaring
//! resources, tracks every registration through a
//! [`Runner`](cairn_runner::Runner), and finally resolves and registers the
//! stack outputs.
//!
//! ```text
//! Deployment::run(program)
//!   ├─ register stack component
//!   ├─ program(deployment)            (Running)
//!   │    └─ register_resource(decl) → DeployedResource
//!   │         └─ tracked: transformations → aliases → inputs → Monitor
//!   ├─ drain every tracked task        (Draining)
//!   └─ resolve + register stack outputs (Completed)
//! ```
//!
//! Registration failures never stop sibling resources. They are collected
//! and returned together as a [`RunError`](cairn_runner::RunError).

mod alias;
mod deployment;
mod error;
mod invoke;
mod registrar;
mod resource;
mod settings;

pub use alias::resolve_aliases;
pub use deployment::Deployment;
pub use error::DeployError;
pub use invoke::InvokeOptions;
pub use resource::{DeployedResource, PROVIDER_TYPE_PREFIX, ResourceDecl};
pub use settings::{DRY_RUN_ENV, DeploymentSettings, PROJECT_ENV, STACK_ENV};
