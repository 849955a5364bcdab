#![deny(missing_docs)]
//! # cairn: umbrella crate
//!
//! A single import surface for declaring resource trees. Re-exports the
//! protocol crate and the runtime pieces behind feature flags, plus a
//! `prelude` for the common case.
//!
//! ```ignore
//! use cairn::prelude::*;
//!
//! let deployment = Deployment::new(DeploymentSettings::from_env()?, monitor);
//! let exports = deployment
//!     .run(|d| async move {
//!         let bucket = d.register_resource(
//!             ResourceDecl::custom("aws:s3:Bucket", "logs").outputs(["arn"]),
//!         );
//!         Ok(PropertyMap::new().with("arn", bucket.output("arn")?))
//!     })
//!     .await?;
//! ```

#[cfg(feature = "core")]
pub use cairn0;
#[cfg(feature = "deploy")]
pub use cairn_deploy;
#[cfg(feature = "runner")]
pub use cairn_runner;
#[cfg(feature = "transforms")]
pub use cairn_transforms;

/// Happy-path imports for writing programs.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use cairn0::{
        AliasSpec, Config, Log, Monitor, Output, OutputData, OutputError, PropertyMap,
        PropertyValue, RelativeAlias, Resource, ResourceOptions, ResourceRef, TransformResult,
        Transformation, Urn, WireValue,
    };

    #[cfg(feature = "transforms")]
    pub use cairn_transforms::{TransformationChain, async_transformation_fn, transformation_fn};

    #[cfg(feature = "runner")]
    pub use cairn_runner::{RunError, Runner};

    #[cfg(feature = "deploy")]
    pub use cairn_deploy::{
        DeployError, DeployedResource, Deployment, DeploymentSettings, InvokeOptions, ResourceDecl,
    };
}
