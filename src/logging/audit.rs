//! Append-only audit trail for privileged actions
//!
//! Only actions with an external effect are recorded (spawning docker, ssh,
//! plugin executables, credential changes), not every command.

use super::timestamp_now;
use crate::utils::fs::append_line;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One line of `audit.log`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub user: String,
    pub command: String,
    pub arguments: Vec<String>,
}

/// Name of the invoking OS user
pub fn current_user() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown-user".to_string())
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry attributed to `user`, or the current OS user
    pub fn record<S: AsRef<str>>(&self, command: &str, arguments: &[S], user: Option<&str>) -> Result<AuditEntry> {
        let entry = AuditEntry {
            timestamp: timestamp_now(),
            user: user.map(str::to_string).unwrap_or_else(current_user),
            command: command.to_string(),
            arguments: arguments.iter().map(|a| a.as_ref().to_string()).collect(),
        };

        append_line(&self.path, &serde_json::to_string(&entry)?)?;
        Ok(entry)
    }

    /// Record without failing the caller; problems are logged as warnings
    pub fn record_best_effort<S: AsRef<str>>(&self, command: &str, arguments: &[S]) {
        if let Err(e) = self.record(command, arguments, None) {
            tracing::warn!(command, error = %e, "Failed to write audit entry");
        }
    }

    /// All entries in append order; unparsable lines are skipped
    pub fn entries(&self) -> Vec<AuditEntry> {
        std::fs::read_to_string(&self.path)
            .unwrap_or_default()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}
