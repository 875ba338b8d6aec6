//! Configuration sources, lowest precedence first:
//!
//! 1. Global file: `$XDG_CONFIG_HOME/permadeploy/config.toml`, else
//!    `~/.config/permadeploy/config.toml`
//! 2. Workspace file: `permadeploy.toml` in the working directory, or an
//!    explicit file passed with `--config`
//! 3. Environment: `PERMADEPLOY__SECTION__KEY`

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const WORKSPACE_CONFIG_FILE: &str = "permadeploy.toml";
pub const ENV_PREFIX: &str = "PERMADEPLOY";

/// Path to the global config file
pub fn global_config_path() -> Option<PathBuf> {
    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(config_home.join("permadeploy").join("config.toml"))
}

/// Add the global config file to the builder if it exists
pub fn add_global_file(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match global_config_path() {
        Some(path) if path.is_file() => {
            debug!(config_path = %path.display(), "Using global configuration");
            builder.add_source(File::from(path).required(false))
        }
        Some(path) => {
            debug!(config_path = %path.display(), "No global configuration file");
            builder
        }
        None => builder,
    }
}

/// Add `permadeploy.toml` from `workspace_root` if present
pub fn add_workspace_file(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    let path = workspace_root.join(WORKSPACE_CONFIG_FILE);
    if path.is_file() {
        debug!(config_path = %path.display(), "Using workspace configuration");
        builder.add_source(File::from(path).required(false))
    } else {
        builder
    }
}

/// Add an explicitly requested file; a missing file is an error
pub fn add_explicit_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path.to_path_buf()).required(true))
}

/// Add `PERMADEPLOY__*` environment overrides
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("collector.exclude")
            .with_list_parse_key("collector.allowed_extensions"),
    )
}
