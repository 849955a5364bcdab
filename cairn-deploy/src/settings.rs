//! Deployment settings.

use crate::error::DeployError;
use cairn0::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Environment variable naming the project.
pub const PROJECT_ENV: &str = "CAIRN_PROJECT";

/// Environment variable naming the stack.
pub const STACK_ENV: &str = "CAIRN_STACK";

/// Environment variable selecting preview mode (`true`/`false`, `1`/`0`).
pub const DRY_RUN_ENV: &str = "CAIRN_DRY_RUN";

/// Which project and stack a deployment targets, and whether it previews.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSettings {
    /// Project name.
    pub project: String,
    /// Stack name.
    pub stack: String,
    /// Preview instead of update.
    pub dry_run: bool,
}

impl DeploymentSettings {
    /// Settings for an update of `project`/`stack`.
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            stack: stack.into(),
            dry_run: false,
        }
    }

    /// Preview instead of update.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Read `CAIRN_PROJECT`, `CAIRN_STACK` and `CAIRN_DRY_RUN`.
    pub fn from_env() -> Result<Self, DeployError> {
        let require = |key: &str| {
            std::env::var(key).map_err(|_| ConfigError::Missing { key: key.to_owned() })
        };
        let project = require(PROJECT_ENV)?;
        let stack = require(STACK_ENV)?;
        let dry_run = match std::env::var(DRY_RUN_ENV) {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| ConfigError::Invalid {
                key: DRY_RUN_ENV.to_owned(),
                message: format!("expected true or false, got '{raw}'"),
            })?,
            Err(_) => false,
        };
        Ok(Self::new(project, stack).with_dry_run(dry_run))
    }

    /// Name of the root stack component (`<project>-<stack>`).
    pub fn stack_resource_name(&self) -> String {
        format!("{}-{}", self.project, self.stack)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let settings = DeploymentSettings::new("web", "dev").with_dry_run(true);
        assert_eq!(settings.project, "web");
        assert_eq!(settings.stack, "dev");
        assert!(settings.dry_run);
        assert_eq!(settings.stack_resource_name(), "web-dev");
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" false "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
