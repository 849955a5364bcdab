//! Programming errors raised while declaring resources.

use cairn0::error::{ConfigError, OutputError};
use thiserror::Error;

/// Errors returned by `cairn-deploy`.
///
/// These are mistakes in the program itself. They are raised where they
/// happen instead of being deferred into an Output.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeployError {
    /// The resource was not declared with this output field.
    #[error("{resource} has no output field '{field}'")]
    UnknownOutputField {
        /// `type::name` of the resource.
        resource: String,
        /// Requested field.
        field: String,
    },

    /// Only custom and provider resources have IDs.
    #[error("{resource} is a component and has no ID")]
    NotCustom {
        /// `type::name` of the resource.
        resource: String,
    },

    /// Settings or configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<DeployError> for OutputError {
    fn from(error: DeployError) -> Self {
        OutputError::Program(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_mistakes_surface_as_program_failures() {
        let err: OutputError = DeployError::NotCustom {
            resource: "my:app:Service::svc".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "program failed: my:app:Service::svc is a component and has no ID"
        );
    }
}
