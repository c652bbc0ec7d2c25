//! Configuration loading facade.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::ProvgenConfig;
use config::{Environment, File};
use std::path::{Path, PathBuf};

/// Loads `ProvgenConfig` from the layered sources
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the user file, then workspace files, then `PROVGEN__*` env vars
    pub fn load(workspace_root: &Path) -> Result<ProvgenConfig, config::ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        builder
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    /// Defaults overlaid with one explicit file (env vars still apply)
    pub fn load_from_file(path: &Path) -> Result<ProvgenConfig, config::ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    fn environment() -> Environment {
        Environment::with_prefix("PROVGEN")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }
}
