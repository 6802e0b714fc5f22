//! Interactive prompts with a CI guard
//!
//! Every prompt goes through [`Interaction`]. In CI mode it fails at once with
//! [`CliError::InteractiveDisabled`] instead of waiting on stdin.

use crate::utils::errors::CliError;
use crate::Result;
use inquire::{Confirm, Password, PasswordDisplayMode, Select, Text};

/// Environment variable checked for CI mode
pub const CI_ENV: &str = "CI";

/// Whether `CI` is set to `true` (or `1`)
pub fn ci_from_env() -> bool {
    std::env::var(CI_ENV)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

/// Gatekeeper for terminal prompts
#[derive(Debug, Clone, Copy)]
pub struct Interaction {
    ci: bool,
}

impl Interaction {
    pub fn new(ci: bool) -> Self {
        Self { ci }
    }

    pub fn is_ci(&self) -> bool {
        self.ci
    }

    fn guard(&self, prompt: &str) -> Result<()> {
        if self.ci {
            tracing::warn!(prompt, "Interactive prompt refused in CI mode");
            return Err(CliError::interactive_disabled(prompt));
        }
        Ok(())
    }

    /// Free-text input with an optional default
    pub async fn text(&self, message: &str, default: Option<&str>) -> Result<String> {
        self.guard(message)?;
        let message = message.to_string();
        let default = default.map(str::to_string);

        tokio::task::spawn_blocking(move || {
            let mut prompt = Text::new(&message);
            if let Some(default) = default.as_deref() {
                prompt = prompt.with_default(default);
            }
            prompt.prompt()
        })
        .await
        .map_err(|e| CliError::prompt(format!("Prompt task failed: {}", e)))?
        .map_err(CliError::from)
    }

    /// Pick one of `options`
    pub async fn select(&self, message: &str, options: &[&str]) -> Result<String> {
        self.guard(message)?;
        let message = message.to_string();
        let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();

        tokio::task::spawn_blocking(move || Select::new(&message, options).prompt())
            .await
            .map_err(|e| CliError::prompt(format!("Prompt task failed: {}", e)))?
            .map_err(CliError::from)
    }

    /// Masked input for tokens; no confirmation round
    pub async fn secret(&self, message: &str) -> Result<String> {
        self.guard(message)?;
        let message = message.to_string();

        tokio::task::spawn_blocking(move || {
            Password::new(&message)
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt()
        })
        .await
        .map_err(|e| CliError::prompt(format!("Prompt task failed: {}", e)))?
        .map_err(CliError::from)
    }

    pub async fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        self.guard(message)?;
        let message = message.to_string();

        tokio::task::spawn_blocking(move || Confirm::new(&message).with_default(default).prompt())
            .await
            .map_err(|e| CliError::prompt(format!("Prompt task failed: {}", e)))?
            .map_err(CliError::from)
    }
}
