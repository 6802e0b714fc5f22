//! Profile-scoped credential storage
//!
//! Tokens are kept in their own JSON document, separate from preferences,
//! with owner-only permissions. Reads never fail: a missing or damaged vault
//! behaves like an empty one.

use crate::utils::fs::{ensure_private_dir, read_json, write_json_atomic, JsonRead, PRIVATE_FILE_MODE};
use crate::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod resolver;

pub use resolver::{SecretResolver, SecretSource, SecretStatus};

/// profile -> provider -> token
pub type VaultDocument = BTreeMap<String, BTreeMap<String, String>>;

/// A secret token that never prints its value
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// The raw token, for handing to an HTTP client or child process
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// JSON-file credential vault
#[derive(Debug, Clone)]
pub struct CredentialVault {
    path: PathBuf,
}

impl CredentialVault {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> VaultDocument {
        match read_json(&self.path) {
            JsonRead::Parsed(document) => document,
            JsonRead::Missing => VaultDocument::new(),
            JsonRead::Invalid(reason) => {
                tracing::warn!(path = %self.path.display(), error = %reason, "Credential vault unreadable, treating as empty");
                VaultDocument::new()
            }
        }
    }

    fn write(&self, document: &VaultDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_private_dir(parent)?;
        }
        write_json_atomic(&self.path, document, PRIVATE_FILE_MODE)
    }

    /// Store `secret` under `profile`/`provider`, overwriting any previous value
    pub fn store(&self, profile: &str, provider: &str, secret: &Secret) -> Result<()> {
        let mut document = self.load();
        document
            .entry(profile.to_string())
            .or_default()
            .insert(provider.to_string(), secret.expose().to_string());
        self.write(&document)?;

        tracing::info!(profile, provider, "Credential stored");
        Ok(())
    }

    /// Look up a secret; `None` covers every kind of absence
    pub fn retrieve(&self, profile: &str, provider: &str) -> Option<Secret> {
        self.load()
            .get(profile)
            .and_then(|providers| providers.get(provider))
            .map(Secret::new)
    }

    /// Remove one entry; empty profiles are dropped with it
    pub fn remove(&self, profile: &str, provider: &str) -> Result<bool> {
        let mut document = self.load();
        let removed = match document.get_mut(profile) {
            Some(providers) => providers.remove(provider).is_some(),
            None => false,
        };

        if removed {
            if document.get(profile).is_some_and(BTreeMap::is_empty) {
                document.remove(profile);
            }
            self.write(&document)?;
            tracing::info!(profile, provider, "Credential removed");
        }
        Ok(removed)
    }

    /// Profile names in sorted order
    pub fn profiles(&self) -> Vec<String> {
        self.load().into_keys().collect()
    }

    /// Provider keys stored under `profile`, sorted
    pub fn providers(&self, profile: &str) -> Vec<String> {
        self.load()
            .remove(profile)
            .map(|providers| providers.into_keys().collect())
            .unwrap_or_default()
    }
}
