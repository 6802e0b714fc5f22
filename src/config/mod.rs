//! Configuration management for mycli
//!
//! Preferences live in a single JSON document. The known fields are typed;
//! every other key is carried through untouched in [`Config::extra`].

use crate::utils::errors::{CliError, ConfigError};
use crate::utils::fs::{read_json, write_json_atomic, JsonRead, PRIVATE_FILE_MODE};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod paths;

pub use paths::AppPaths;

/// Pass-through key holding the telemetry collector URL
pub const TELEMETRY_ENDPOINT_KEY: &str = "telemetryEndpoint";

/// Terminal color preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::Light, Theme::Dark];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ConfigError::InvalidValue {
                key: "theme".to_string(),
                message: format!("'{}' is not one of: light, dark", other),
            }),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub theme: Theme,
    pub telemetry_enabled: bool,
    /// Profile used to look up credentials
    pub default_profile: String,
    /// Keys this version does not know about
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            telemetry_enabled: false,
            default_profile: "default".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Keys with a typed field
    pub const KNOWN_KEYS: [&'static str; 3] = ["theme", "telemetryEnabled", "defaultProfile"];

    /// Validate an arbitrary JSON object, filling in defaults for missing fields
    pub fn from_json(value: Value) -> std::result::Result<Self, ConfigError> {
        if !value.is_object() {
            return Err(ConfigError::NotAnObject);
        }

        let config: Config =
            serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.default_profile.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "defaultProfile".to_string(),
                message: "profile name must not be empty".to_string(),
            });
        }

        if let Some(endpoint) = self.extra.get(TELEMETRY_ENDPOINT_KEY) {
            let endpoint = endpoint.as_str().ok_or_else(|| ConfigError::InvalidValue {
                key: TELEMETRY_ENDPOINT_KEY.to_string(),
                message: "must be a string".to_string(),
            })?;
            url::Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
                key: TELEMETRY_ENDPOINT_KEY.to_string(),
                message: e.to_string(),
            })?;
        }

        Ok(())
    }

    /// Read any key, typed or pass-through, as JSON
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "theme" => Some(Value::String(self.theme.to_string())),
            "telemetryEnabled" => Some(Value::Bool(self.telemetry_enabled)),
            "defaultProfile" => Some(Value::String(self.default_profile.clone())),
            other => self.extra.get(other).cloned(),
        }
    }

    /// Set a key from its command-line spelling
    ///
    /// Typed fields are parsed and validated. Other keys accept any JSON
    /// literal and fall back to a plain string.
    pub fn set(&mut self, key: &str, raw: &str) -> std::result::Result<(), ConfigError> {
        let mut updated = self.clone();
        match key {
            "theme" => updated.theme = raw.parse()?,
            "telemetryEnabled" => {
                updated.telemetry_enabled =
                    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("'{}' is not true or false", raw),
                    })?
            }
            "defaultProfile" => updated.default_profile = raw.trim().to_string(),
            other => {
                if other.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: other.to_string(),
                        message: "key must not be empty".to_string(),
                    });
                }
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
                updated.extra.insert(other.to_string(), value);
            }
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Drop a pass-through key; typed fields reset to their default
    pub fn unset(&mut self, key: &str) -> bool {
        let defaults = Config::default();
        match key {
            "theme" => self.theme = defaults.theme,
            "telemetryEnabled" => self.telemetry_enabled = defaults.telemetry_enabled,
            "defaultProfile" => self.default_profile = defaults.default_profile,
            other => return self.extra.remove(other).is_some(),
        }
        true
    }

    /// Collector URL, if one is configured
    pub fn telemetry_endpoint(&self) -> Option<&str> {
        self.extra.get(TELEMETRY_ENDPOINT_KEY).and_then(Value::as_str)
    }
}

/// Loads and saves the preferences document
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, falling back to defaults
    ///
    /// A missing, unreadable or schema-invalid file yields `Config::default()`.
    /// This never fails and never writes.
    pub fn load(&self) -> Config {
        match read_json::<Value>(&self.path) {
            JsonRead::Missing => Config::default(),
            JsonRead::Parsed(value) => match Config::from_json(value) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Ignoring invalid configuration");
                    Config::default()
                }
            },
            JsonRead::Invalid(reason) => {
                tracing::warn!(path = %self.path.display(), error = %reason, "Ignoring unreadable configuration");
                Config::default()
            }
        }
    }

    /// Validate and write `config`, replacing the whole file
    ///
    /// There is no merge with what is on disk: keys missing from `config` are
    /// lost. Load, modify and save the full value to keep them.
    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        write_json_atomic(&self.path, config, PRIVATE_FILE_MODE).map_err(|e| match e {
            CliError::FileSystem { path, source } => ConfigError::WriteError { path, source }.into(),
            other => other,
        })?;
        tracing::debug!(path = %self.path.display(), "Configuration saved");
        Ok(())
    }

    /// Validate a partial JSON object, fill defaults, and save it
    pub fn save_json(&self, value: Value) -> Result<Config> {
        let config = Config::from_json(value)?;
        self.save(&config)?;
        Ok(config)
    }
}
