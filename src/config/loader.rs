// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "rebirth.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for the
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration the way the CLI does.
///
/// - An explicit path must exist.
/// - Without one, `rebirth.toml` under `workdir` is used if present, and the
///   built-in defaults otherwise.
pub fn load_for_workdir(explicit: Option<&Path>, workdir: &Path) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let path = default_config_path(workdir);
    if path.exists() {
        load_and_validate(&path)
    } else {
        info!(path = %path.display(), "no config file found; using defaults");
        Ok(ConfigFile::default())
    }
}

pub fn default_config_path(workdir: &Path) -> PathBuf {
    workdir.join(DEFAULT_CONFIG_FILE)
}
