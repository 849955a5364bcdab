//! Program configuration.
//!
//! Keys are namespaced (`namespace:name`). Unqualified lookups use the
//! namespace the [`Config`] was created with, normally the project name.
//! A missing required key is a programming error, reported immediately
//! as a [`ConfigError`] rather than deferred into an Output.
//!
//! [`Config::from_env`] reads `CAIRN_CONFIG` (a JSON object of key to
//! value) and `CAIRN_CONFIG_SECRET_KEYS` (a JSON array of keys whose values
//! are secret).

use crate::error::ConfigError;
use crate::output::Output;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};

/// Environment variable holding the configuration map.
pub const CONFIG_ENV: &str = "CAIRN_CONFIG";

/// Environment variable listing the secret keys.
pub const CONFIG_SECRET_KEYS_ENV: &str = "CAIRN_CONFIG_SECRET_KEYS";

/// Namespaced configuration values.
#[derive(Debug, Clone, Default)]
pub struct Config {
    namespace: String,
    values: BTreeMap<String, String>,
    secret_keys: BTreeSet<String>,
}

impl Config {
    /// An empty configuration for `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            values: BTreeMap::new(),
            secret_keys: BTreeSet::new(),
        }
    }

    /// Load from the process environment.
    pub fn from_env(namespace: impl Into<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new(namespace);
        if let Ok(raw) = std::env::var(CONFIG_ENV) {
            let map: BTreeMap<String, serde_json::Value> =
                serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid {
                    key: CONFIG_ENV.into(),
                    message: e.to_string(),
                })?;
            for (key, value) in map {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                config.values.insert(key, value);
            }
        }
        if let Ok(raw) = std::env::var(CONFIG_SECRET_KEYS_ENV) {
            let keys: Vec<String> =
                serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid {
                    key: CONFIG_SECRET_KEYS_ENV.into(),
                    message: e.to_string(),
                })?;
            config.secret_keys.extend(keys);
        }
        Ok(config)
    }

    /// Builder-style set of a plain value.
    pub fn with_value(mut self, key: &str, value: impl Into<String>) -> Self {
        let key = self.full_key(key);
        self.values.insert(key, value.into());
        self
    }

    /// Builder-style set of a secret value.
    pub fn with_secret_value(mut self, key: &str, value: impl Into<String>) -> Self {
        let key = self.full_key(key);
        self.secret_keys.insert(key.clone());
        self.values.insert(key, value.into());
        self
    }

    /// The default namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Qualify `key` with the default namespace unless it already has one.
    pub fn full_key(&self, key: &str) -> String {
        if key.contains(':') {
            key.to_owned()
        } else {
            format!("{}:{key}", self.namespace)
        }
    }

    /// Whether `key` holds a secret.
    pub fn is_secret(&self, key: &str) -> bool {
        self.secret_keys.contains(&self.full_key(key))
    }

    fn raw(&self, key: &str) -> Option<&String> {
        self.values.get(&self.full_key(key))
    }

    /// A plain value. Reading a secret this way logs a warning; use
    /// [`get_secret`](Self::get_secret) to keep it wrapped.
    pub fn get(&self, key: &str) -> Option<String> {
        if self.is_secret(key) {
            tracing::warn!(
                key = %self.full_key(key),
                "configuration value is a secret; read it with get_secret to keep it out of logs"
            );
        }
        self.raw(key).cloned()
    }

    /// A plain value that must be set.
    pub fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key).ok_or_else(|| self.missing(key))
    }

    /// A boolean value.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.raw(key)
            .map(|raw| raw.parse::<bool>().map_err(|e| self.invalid(key, e)))
            .transpose()
    }

    /// A boolean value that must be set.
    pub fn require_bool(&self, key: &str) -> Result<bool, ConfigError> {
        self.get_bool(key)?.ok_or_else(|| self.missing(key))
    }

    /// An integer value.
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        self.raw(key)
            .map(|raw| raw.parse::<i64>().map_err(|e| self.invalid(key, e)))
            .transpose()
    }

    /// An integer value that must be set.
    pub fn require_i64(&self, key: &str) -> Result<i64, ConfigError> {
        self.get_i64(key)?.ok_or_else(|| self.missing(key))
    }

    /// A JSON value deserialized into `T`.
    pub fn get_object<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.raw(key)
            .map(|raw| serde_json::from_str(raw).map_err(|e| self.invalid(key, e)))
            .transpose()
    }

    /// A JSON value that must be set.
    pub fn require_object<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        self.get_object(key)?.ok_or_else(|| self.missing(key))
    }

    /// A value wrapped as a secret Output, whether or not it was marked
    /// secret.
    pub fn get_secret(&self, key: &str) -> Option<Output<String>> {
        self.raw(key).cloned().map(Output::secret)
    }

    /// A secret value that must be set.
    pub fn require_secret(&self, key: &str) -> Result<Output<String>, ConfigError> {
        self.get_secret(key).ok_or_else(|| self.missing(key))
    }

    /// A value as an Output: secret if the key is secret, plain otherwise.
    pub fn get_output(&self, key: &str) -> Option<Output<String>> {
        let value = self.raw(key).cloned()?;
        Some(if self.is_secret(key) {
            Output::secret(value)
        } else {
            Output::of(value)
        })
    }

    fn missing(&self, key: &str) -> ConfigError {
        ConfigError::Missing {
            key: self.full_key(key),
        }
    }

    fn invalid(&self, key: &str, error: impl std::fmt::Display) -> ConfigError {
        ConfigError::Invalid {
            key: self.full_key(key),
            message: error.to_string(),
        }
    }
}
