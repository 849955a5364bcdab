//! Error types for each concern.

use thiserror::Error;

/// Errors returned by a [`Monitor`](crate::monitor::Monitor).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The engine rejected the request (invalid type token, duplicate URN, ...).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The resource provider reported a failure.
    #[error("provider error: {0}")]
    Provider(String),

    /// The connection to the engine failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure carried by a deferred value.
///
/// Cloneable because one failed [`Output`](crate::output::Output) may be
/// awaited by any number of consumers, each of which sees the same failure.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    /// The Monitor refused or failed to register a resource.
    #[error("registration of {resource} failed: {message}")]
    Registration {
        /// `type::name` of the resource.
        resource: String,
        /// Error message.
        message: String,
    },

    /// A provider function invocation failed.
    #[error("invoke of {token} failed: {message}")]
    Invoke {
        /// Function token.
        token: String,
        /// Error message.
        message: String,
    },

    /// A transformation in a resource's chain failed.
    #[error("transformation of {resource} failed: {message}")]
    Transformation {
        /// `type::name` of the resource.
        resource: String,
        /// Error message.
        message: String,
    },

    /// A value could not be converted to or from its wire form.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A tracked task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),

    /// The program body returned an error.
    #[error("program failed: {0}")]
    Program(String),

    /// Catch-all.
    #[error("{0}")]
    Other(String),
}

impl OutputError {
    /// Build a catch-all error from anything displayable.
    pub fn other(error: impl std::fmt::Display) -> Self {
        Self::Other(error.to_string())
    }

    /// The `type::name` of the resource this failure is attributed to, if any.
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::Registration { resource, .. } | Self::Transformation { resource, .. } => {
                Some(resource)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Configuration errors. These are programming errors: they are raised
/// where the lookup happens, never deferred into an Output.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required key is not set.
    #[error("missing required configuration variable '{key}'")]
    Missing {
        /// Fully qualified key (`namespace:name`).
        key: String,
    },

    /// The value is set but cannot be parsed as the requested type.
    #[error("configuration variable '{key}' is invalid: {message}")]
    Invalid {
        /// Fully qualified key (`namespace:name`).
        key: String,
        /// Why parsing failed.
        message: String,
    },
}
