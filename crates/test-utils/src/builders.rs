#![allow(dead_code)]

use std::path::PathBuf;

use rebirth::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_container(mut self, name: &str) -> Self {
        self.config.host.docker = Some(name.to_string());
        self
    }

    pub fn with_container_workdir(mut self, dir: &str) -> Self {
        self.config.host.workdir = Some(dir.to_string());
        self
    }

    pub fn with_supervisor_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.host.supervisor_binary = Some(path.into());
        self
    }

    pub fn with_main(mut self, main: &str) -> Self {
        self.config.build.main = main.to_string();
        self
    }

    pub fn with_build_env(mut self, key: &str, value: &str) -> Self {
        self.config.build.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_run_env(mut self, key: &str, value: &str) -> Self {
        self.config.run.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_watch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.watch.root = root.into();
        self
    }

    pub fn with_ignore(mut self, prefix: &str) -> Self {
        self.config.watch.ignore.push(prefix.to_string());
        self
    }

    pub fn with_quiet_period_ms(mut self, ms: u64) -> Self {
        self.config.watch.quiet_period_ms = ms;
        self
    }

    /// The unvalidated config, for exercising validation itself.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
