//! Per-invocation application context
//!
//! Built once after the configuration is loaded and argv is parsed, then
//! handed to every hook and handler. Nothing in the crate reads config or
//! credentials through globals.

use crate::config::{AppPaths, Config, ConfigStore};
use crate::credentials::{CredentialVault, Secret, SecretResolver};
use crate::logging::{debug_enabled_from_env, AuditLog, StructuredLogger};
use crate::ui::{Interaction, OutputFormat, Palette, Reporter};
use crate::utils::errors::CliError;
use crate::Result;

/// Flags accepted before the command name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Non-interactive mode: prompts fail instead of blocking
    pub ci: bool,
    pub output: OutputFormat,
    /// Filter for stderr diagnostics
    pub log_level: Option<String>,
}

/// Everything a command handler may need
pub struct AppContext {
    paths: AppPaths,
    options: GlobalOptions,
    config: Config,
    config_store: ConfigStore,
    vault: CredentialVault,
    audit: AuditLog,
    logger: StructuredLogger,
}

impl AppContext {
    pub fn new(paths: AppPaths, config: Config, options: GlobalOptions) -> Self {
        Self {
            config_store: ConfigStore::new(paths.config_file()),
            vault: CredentialVault::new(paths.credentials_file()),
            audit: AuditLog::new(paths.audit_file()),
            logger: StructuredLogger::new(paths.log_file(), debug_enabled_from_env()),
            paths,
            options,
            config,
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn options(&self) -> &GlobalOptions {
        &self.options
    }

    /// Configuration as loaded at startup
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config_store
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn interaction(&self) -> Interaction {
        Interaction::new(self.options.ci)
    }

    pub fn palette(&self) -> Palette {
        Palette::for_theme(self.config.theme)
    }

    pub fn reporter(&self) -> Reporter {
        Reporter::new(self.options.output, self.palette())
    }

    /// Profile used for credential lookups
    pub fn active_profile(&self) -> &str {
        &self.config.default_profile
    }

    pub fn secrets(&self) -> SecretResolver<'_> {
        SecretResolver::new(&self.vault, self.active_profile())
    }

    /// Resolve a token or fail with an authentication error naming the env var
    pub fn require_secret(&self, provider: &str) -> Result<Secret> {
        self.secrets().secret(provider).ok_or_else(|| {
            let var = SecretResolver::env_vars(provider)
                .into_iter()
                .next()
                .unwrap_or_default();
            CliError::authentication(format!(
                "{} missing for provider '{}' (profile '{}')",
                var,
                provider,
                self.active_profile()
            ))
        })
    }
}
