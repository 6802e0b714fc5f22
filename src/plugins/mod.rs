//! Statically declared external commands
//!
//! `~/.mycli/plugins.json` lists executables as `[{name, path, description?}]`.
//! Each entry becomes a command that forwards its trailing arguments to the
//! executable with the terminal attached.

use crate::context::AppContext;
use crate::dispatch::{CliCommand, CommandRegistry};
use crate::ui::CommandOutput;
use crate::utils::fs::{read_json, JsonRead};
use crate::utils::process::run_inherited;
use crate::Result;
use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Plugins declared for this user
#[derive(Debug, Clone, Default)]
pub struct PluginManifest {
    entries: Vec<PluginEntry>,
}

impl PluginManifest {
    /// Load the manifest; a missing or unreadable file means no plugins
    ///
    /// Relative paths are resolved against the manifest's directory. Entries
    /// with an unusable name or a duplicate name are skipped.
    pub fn load(path: &Path) -> Self {
        let raw: Vec<PluginEntry> = match read_json(path) {
            JsonRead::Missing => return Self::default(),
            JsonRead::Parsed(entries) => entries,
            JsonRead::Invalid(reason) => {
                tracing::warn!(path = %path.display(), error = %reason, "Ignoring invalid plugin manifest");
                return Self::default();
            }
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(raw.len());

        for mut entry in raw {
            let name = entry.name.trim().to_string();
            if name.is_empty() || name.starts_with('-') || name.contains(char::is_whitespace) {
                tracing::warn!(name = %entry.name, "Skipping plugin with invalid name");
                continue;
            }
            if !seen.insert(name.clone()) {
                tracing::warn!(name = %name, "Skipping duplicate plugin entry");
                continue;
            }

            entry.name = name;
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
            entries.push(entry);
        }

        tracing::debug!(count = entries.len(), "Plugin manifest loaded");
        Self { entries }
    }

    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register every plugin whose name is free; returns how many were added
    pub fn register_into(&self, registry: &mut CommandRegistry) -> usize {
        let mut added = 0;
        for entry in &self.entries {
            if registry.contains(&entry.name) {
                tracing::warn!(name = %entry.name, "Plugin shadows a built-in command and was ignored");
                continue;
            }
            match registry.register(ExternalCommand::new(entry.clone())) {
                Ok(()) => added += 1,
                Err(e) => tracing::warn!(name = %entry.name, error = %e, "Plugin not registered"),
            }
        }
        added
    }
}

/// Command backed by an external executable
pub struct ExternalCommand {
    entry: PluginEntry,
}

impl ExternalCommand {
    pub fn new(entry: PluginEntry) -> Self {
        Self { entry }
    }
}

#[async_trait]
impl CliCommand for ExternalCommand {
    fn name(&self) -> &str {
        &self.entry.name
    }

    fn definition(&self) -> clap::Command {
        let about = self
            .entry
            .description
            .clone()
            .unwrap_or_else(|| format!("Plugin ({})", self.entry.path.display()));

        clap::Command::new(self.entry.name.clone())
            .about(about)
            .disable_help_flag(true)
            .arg(
                Arg::new("args")
                    .value_name("ARGS")
                    .num_args(0..)
                    .trailing_var_arg(true)
                    .allow_hyphen_values(true)
                    .action(ArgAction::Append),
            )
    }

    async fn run(&self, ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
        let arguments: Vec<String> = args
            .get_many::<String>("args")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        ctx.audit()
            .record_best_effort(&format!("plugin {}", self.entry.name), &arguments);

        let program = self.entry.path.to_string_lossy().to_string();
        let exit_code = run_inherited(&program, &arguments).await?;

        Ok(CommandOutput::new(json!({
            "status": "success",
            "plugin": self.entry.name,
            "exitCode": exit_code,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppPaths, Config};
    use crate::context::GlobalOptions;
    use crate::dispatch::Dispatcher;
    use std::fs;
    use tempfile::TempDir;

    fn write_manifest(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("plugins.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_or_invalid_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(PluginManifest::load(&dir.path().join("plugins.json")).is_empty());

        let path = write_manifest(&dir, "{\"not\": \"a list\"}");
        assert!(PluginManifest::load(&path).is_empty());
    }

    #[test]
    fn test_entries_are_normalized() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            r#"[
                {"name": "deploy", "path": "bin/deploy.sh", "description": "Ship it"},
                {"name": "deploy", "path": "/usr/bin/other"},
                {"name": "", "path": "/usr/bin/empty"},
                {"name": "--sneaky", "path": "/usr/bin/flag"},
                {"name": "lint", "path": "/usr/local/bin/lint"}
            ]"#,
        );

        let manifest = PluginManifest::load(&path);
        let names: Vec<_> = manifest.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["deploy", "lint"]);
        assert_eq!(manifest.entries()[0].path, dir.path().join("bin/deploy.sh"));
        assert_eq!(manifest.entries()[1].description, None);
    }

    #[test]
    fn test_builtin_names_win() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            r#"[{"name": "greet", "path": "/bin/true"}, {"name": "hello", "path": "/bin/true"}]"#,
        );

        let mut registry = crate::commands::builtin_registry();
        let before = registry.len();
        assert_eq!(PluginManifest::load(&path).register_into(&mut registry), 1);
        assert_eq!(registry.len(), before + 1);
        assert!(registry.contains("hello"));
    }

    #[cfg(unix)]
    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_plugin_exit_status_is_observed() {
        let dir = TempDir::new().unwrap();
        let ok = script(&dir, "ok.sh", "exit 0");
        let bad = script(&dir, "bad.sh", "exit 3");

        let mut registry = CommandRegistry::new();
        registry
            .register(ExternalCommand::new(PluginEntry {
                name: "ok".to_string(),
                path: ok,
                description: None,
            }))
            .unwrap();
        registry
            .register(ExternalCommand::new(PluginEntry {
                name: "bad".to_string(),
                path: bad,
                description: None,
            }))
            .unwrap();
        let dispatcher = Dispatcher::new(registry);
        let paths = AppPaths::with_home(dir.path());
        let ctx = AppContext::new(paths.clone(), Config::default(), GlobalOptions::default());

        let parsed = dispatcher.parse(["mycli", "ok", "--flag", "value"]).unwrap();
        assert_eq!(dispatcher.execute(&ctx, &parsed).await, 0);

        let parsed = dispatcher.parse(["mycli", "bad"]).unwrap();
        assert_eq!(dispatcher.execute(&ctx, &parsed).await, 1);

        let audit = crate::logging::AuditLog::new(paths.audit_file()).entries();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].command, "plugin ok");
        assert_eq!(audit[0].arguments, vec!["--flag", "value"]);
    }
}
