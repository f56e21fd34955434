//! Console configuration.
//!
//! Tool locations and daemon settings, read from YAML with every field
//! optional:
//!
//! ```yaml
//! hypervisor: /usr/bin/qemu-system-x86_64
//! disk_tool: /usr/bin/qemu-img
//! disk_format: qcow2
//! search_program: docker
//! log_file: /var/log/cloudmgr.log
//! docker_host: unix:///var/run/docker.sock
//! stop_timeout_secs: 10
//! ```
//!
//! ## Lookup Order
//!
//! 1. Path given explicitly (`--config`)
//! 2. `./cloudmgr.yaml`
//! 3. `<user config dir>/cloudmgr/config.yaml`
//!
//! An absent file means defaults. An explicit path that does not exist, or
//! any file that fails to parse, is an error.
//!
//! ## Environment Overrides
//!
//! | Variable              | Field        |
//! |-----------------------|--------------|
//! | `CLOUDMGR_HYPERVISOR` | `hypervisor` |
//! | `CLOUDMGR_DISK_TOOL`  | `disk_tool`  |
//! | `CLOUDMGR_LOG_FILE`   | `log_file`   |
//! | `DOCKER_HOST`         | `docker_host`|

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_DISK_FORMAT, DEFAULT_DISK_TOOL,
    DEFAULT_HYPERVISOR, DEFAULT_LOG_FILE, DEFAULT_SEARCH_PROGRAM, DEFAULT_STOP_TIMEOUT,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for the external tools and the container daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Hypervisor binary.
    pub hypervisor: PathBuf,
    /// Disk-image creation tool.
    pub disk_tool: PathBuf,
    /// Format of newly created disk images.
    pub disk_format: String,
    /// Program providing `search` against the public registry.
    pub search_program: PathBuf,
    /// Append-only log file.
    pub log_file: PathBuf,
    /// Daemon address; `None` uses the platform default socket.
    pub docker_host: Option<String>,
    /// Seconds the daemon waits before killing a stopped container.
    pub stop_timeout_secs: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            hypervisor: PathBuf::from(DEFAULT_HYPERVISOR),
            disk_tool: PathBuf::from(DEFAULT_DISK_TOOL),
            disk_format: DEFAULT_DISK_FORMAT.to_string(),
            search_program: PathBuf::from(DEFAULT_SEARCH_PROGRAM),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            docker_host: None,
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT.as_secs(),
        }
    }
}

impl ConsoleConfig {
    /// Loads configuration following the lookup order, then applies
    /// environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::discover() {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reads and parses one YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|reason| Error::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parses YAML text. An empty document yields defaults.
    pub fn from_yaml(content: &str) -> std::result::Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| format!("parse yaml error: {}", e))
    }

    /// Applies overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = lookup("CLOUDMGR_HYPERVISOR") {
            self.hypervisor = PathBuf::from(v);
        }
        if let Some(v) = lookup("CLOUDMGR_DISK_TOOL") {
            self.disk_tool = PathBuf::from(v);
        }
        if let Some(v) = lookup("CLOUDMGR_LOG_FILE") {
            self.log_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("DOCKER_HOST") {
            self.docker_host = Some(v);
        }
    }

    /// Stop grace period as a duration.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|d| d.join(CONFIG_DIR_NAME).join("config.yaml"))
            .filter(|p| p.exists())
    }
}
