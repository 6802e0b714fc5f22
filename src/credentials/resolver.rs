//! Token resolution with environment precedence
//!
//! Environment variables win over the vault so automation can inject tokens
//! without ever running `auth login`.

use super::{CredentialVault, Secret};

/// Where a resolved secret came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    Environment(String),
    Vault,
}

/// Availability of a provider token, without its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretStatus {
    /// Token available from environment variable
    Environment(String),
    /// Token available from the vault
    Vault,
    /// Token missing, shows the preferred env var name
    Missing(String),
}

impl SecretStatus {
    pub fn is_available(&self) -> bool {
        !matches!(self, SecretStatus::Missing(_))
    }

    pub fn display(&self) -> String {
        match self {
            SecretStatus::Environment(var) => format!("environment ({})", var),
            SecretStatus::Vault => "vault".to_string(),
            SecretStatus::Missing(var) => format!("missing (set {} or run `mycli auth login`)", var),
        }
    }
}

/// Resolves provider tokens for the active profile
pub struct SecretResolver<'a> {
    vault: &'a CredentialVault,
    profile: &'a str,
}

impl<'a> SecretResolver<'a> {
    pub fn new(vault: &'a CredentialVault, profile: &'a str) -> Self {
        Self { vault, profile }
    }

    /// Environment variables consulted for `provider`, highest priority first
    pub fn env_vars(provider: &str) -> Vec<String> {
        match provider.to_lowercase().as_str() {
            "huggingface" => vec!["HUGGING_FACE_TOKEN".to_string(), "HF_TOKEN".to_string()],
            "github" => vec!["GITHUB_TOKEN".to_string(), "GH_TOKEN".to_string()],
            other => {
                let normalized: String = other
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
                    .collect();
                vec![format!("{}_TOKEN", normalized)]
            }
        }
    }

    /// First non-blank token from the environment, then the vault
    pub fn resolve(&self, provider: &str) -> Option<(Secret, SecretSource)> {
        for var in Self::env_vars(provider) {
            if let Ok(value) = std::env::var(&var) {
                if !value.trim().is_empty() {
                    tracing::debug!(provider, source = %var, "Token resolved from environment");
                    return Some((Secret::new(value), SecretSource::Environment(var)));
                }
            }
        }

        self.vault.retrieve(self.profile, provider).map(|secret| {
            tracing::debug!(provider, profile = self.profile, "Token resolved from vault");
            (secret, SecretSource::Vault)
        })
    }

    /// Resolved token value only
    pub fn secret(&self, provider: &str) -> Option<Secret> {
        self.resolve(provider).map(|(secret, _)| secret)
    }

    pub fn status(&self, provider: &str) -> SecretStatus {
        match self.resolve(provider) {
            Some((_, SecretSource::Environment(var))) => SecretStatus::Environment(var),
            Some((_, SecretSource::Vault)) => SecretStatus::Vault,
            None => SecretStatus::Missing(
                Self::env_vars(provider)
                    .into_iter()
                    .next()
                    .unwrap_or_default(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Each test uses its own provider name so env mutations don't race.

    #[test]
    fn test_env_var_names() {
        assert_eq!(
            SecretResolver::env_vars("huggingface"),
            vec!["HUGGING_FACE_TOKEN", "HF_TOKEN"]
        );
        assert_eq!(SecretResolver::env_vars("github"), vec!["GITHUB_TOKEN", "GH_TOKEN"]);
        assert_eq!(SecretResolver::env_vars("my-cloud"), vec!["MY_CLOUD_TOKEN"]);
    }

    #[test]
    fn test_environment_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let vault = CredentialVault::new(dir.path().join("credentials.json"));
        vault.store("default", "envwins", &Secret::new("vault-token")).unwrap();

        std::env::set_var("ENVWINS_TOKEN", "env-token");
        let resolver = SecretResolver::new(&vault, "default");
        let (secret, source) = resolver.resolve("envwins").unwrap();
        std::env::remove_var("ENVWINS_TOKEN");

        assert_eq!(secret.expose(), "env-token");
        assert_eq!(source, SecretSource::Environment("ENVWINS_TOKEN".to_string()));
    }

    #[test]
    fn test_blank_env_falls_back_to_vault() {
        let dir = TempDir::new().unwrap();
        let vault = CredentialVault::new(dir.path().join("credentials.json"));
        vault.store("default", "blankenv", &Secret::new("vault-token")).unwrap();

        std::env::set_var("BLANKENV_TOKEN", "   ");
        let resolver = SecretResolver::new(&vault, "default");
        let resolved = resolver.resolve("blankenv");
        std::env::remove_var("BLANKENV_TOKEN");

        let (secret, source) = resolved.unwrap();
        assert_eq!(secret.expose(), "vault-token");
        assert_eq!(source, SecretSource::Vault);
    }

    #[test]
    fn test_status_reports_missing_with_hint() {
        let dir = TempDir::new().unwrap();
        let vault = CredentialVault::new(dir.path().join("credentials.json"));
        let resolver = SecretResolver::new(&vault, "default");

        let status = resolver.status("nowhere");
        assert_eq!(status, SecretStatus::Missing("NOWHERE_TOKEN".to_string()));
        assert!(!status.is_available());
        assert!(status.display().contains("NOWHERE_TOKEN"));
    }

    #[test]
    fn test_profile_scoping() {
        let dir = TempDir::new().unwrap();
        let vault = CredentialVault::new(dir.path().join("credentials.json"));
        vault.store("work", "scoped", &Secret::new("work-token")).unwrap();

        assert!(SecretResolver::new(&vault, "default").secret("scoped").is_none());
        assert_eq!(
            SecretResolver::new(&vault, "work").status("scoped"),
            SecretStatus::Vault
        );
    }
}
