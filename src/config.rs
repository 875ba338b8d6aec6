//! Configuration System
//!
//! Layered configuration: built-in defaults, then the global file, then the
//! workspace (or explicit) file, then `PERMADEPLOY__` environment overrides.
//! Every section deserializes with defaults, so an empty file is valid.

use crate::deploy::DeployConfig;
use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::store::StoreConfig;
use crate::tree::CollectorConfig;
use config::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod sources;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PermadeployConfig {
    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Collector(String),
    Deploy(String),
    Store(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Collector(msg) => write!(f, "collector: {}", msg),
            ValidationError::Deploy(msg) => write!(f, "deploy: {}", msg),
            ValidationError::Store(msg) => write!(f, "store: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PermadeployConfig {
    /// Check every section, reporting all violations at once
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.collector.validate() {
            errors.push(ValidationError::Collector(e));
        }
        if let Err(e) = self.deploy.validate() {
            errors.push(ValidationError::Deploy(e));
        }
        if let Err(e) = self.store.validate() {
            errors.push(ValidationError::Store(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads and validates [`PermadeployConfig`]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load using `permadeploy.toml` from `workspace_root` (if present)
    pub fn load(workspace_root: &Path) -> Result<PermadeployConfig, ConfigError> {
        let builder = sources::add_global_file(Config::builder());
        let builder = sources::add_workspace_file(builder, workspace_root);
        let builder = sources::add_environment(builder);
        Self::finish(builder.build()?)
    }

    /// Load using an explicit config file instead of the workspace file
    pub fn load_from_file(path: &Path) -> Result<PermadeployConfig, ConfigError> {
        let builder = sources::add_global_file(Config::builder());
        let builder = sources::add_explicit_file(builder, path);
        let builder = sources::add_environment(builder);
        Self::finish(builder.build()?)
    }

    fn finish(config: Config) -> Result<PermadeployConfig, ConfigError> {
        let config: PermadeployConfig = config.try_deserialize()?;
        config.validate().map_err(|errors| {
            ConfigError::Invalid(errors.iter().map(|e| e.to_string()).collect())
        })?;
        Ok(config)
    }
}
