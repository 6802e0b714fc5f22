//! Fixed on-disk locations used by mycli

use crate::utils::errors::ConfigError;
use crate::Result;
use std::path::{Path, PathBuf};

/// Environment variable that replaces the home directory as the base for every file
pub const HOME_OVERRIDE_ENV: &str = "MYCLI_HOME";

/// Resolved locations of every file mycli reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    home: PathBuf,
}

impl AppPaths {
    /// Resolve paths from `MYCLI_HOME` or the user's home directory
    pub fn discover() -> Result<Self> {
        if let Some(home) = std::env::var_os(HOME_OVERRIDE_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_home(PathBuf::from(home)));
        }

        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self::with_home(home))
    }

    /// Root every path at `home`
    pub fn with_home<P: Into<PathBuf>>(home: P) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Per-user data directory (`~/.mycli`)
    pub fn data_dir(&self) -> PathBuf {
        self.home.join(".mycli")
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join(".mycli-config.json")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.data_dir().join("credentials.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("cli.log")
    }

    pub fn audit_file(&self) -> PathBuf {
        self.logs_dir().join("audit.log")
    }

    pub fn ssh_connections_file(&self) -> PathBuf {
        self.data_dir().join("ssh-connections.json")
    }

    pub fn plugin_manifest_file(&self) -> PathBuf {
        self.data_dir().join("plugins.json")
    }
}
