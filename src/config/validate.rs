// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RebirthError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RebirthError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.host, raw.build, raw.run, raw.watch))
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        ConfigFile::new_unchecked(raw.host, raw.build, raw.run, raw.watch)
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_host(cfg)?;
    validate_build(cfg)?;
    validate_env("build", &cfg.build.env)?;
    validate_env("run", &cfg.run.env)?;
    validate_watch(cfg)?;
    Ok(())
}

fn validate_host(cfg: &RawConfigFile) -> Result<()> {
    if let Some(name) = &cfg.host.docker {
        if name.trim().is_empty() {
            return Err(RebirthError::ConfigError(
                "[host].docker must name a container (got an empty string)".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_build(cfg: &RawConfigFile) -> Result<()> {
    if cfg.build.main.trim().is_empty() {
        return Err(RebirthError::ConfigError(
            "[build].main must not be empty".to_string(),
        ));
    }
    if cfg.build.command.trim().is_empty() {
        return Err(RebirthError::ConfigError(
            "[build].command must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_env(section: &str, env: &BTreeMap<String, String>) -> Result<()> {
    for key in env.keys() {
        if key.is_empty() || key.contains('=') {
            return Err(RebirthError::ConfigError(format!(
                "[{section}].env has an invalid variable name '{key}'"
            )));
        }
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.quiet_period_ms == 0 {
        return Err(RebirthError::ConfigError(
            "[watch].quiet_period_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    let ext = cfg.watch.extension.trim_start_matches('.');
    if ext.is_empty() {
        return Err(RebirthError::ConfigError(
            "[watch].extension must not be empty".to_string(),
        ));
    }
    Ok(())
}
