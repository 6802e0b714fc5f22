use crate::context::AppContext;
use crate::dispatch::CliCommand;
use crate::plugins::PluginManifest;
use crate::ui::CommandOutput;
use crate::Result;
use async_trait::async_trait;
use clap::ArgMatches;
use serde_json::json;

/// `plugins`: list the manifest
pub struct PluginsCommand;

#[async_trait]
impl CliCommand for PluginsCommand {
    fn name(&self) -> &str {
        "plugins"
    }

    fn definition(&self) -> clap::Command {
        clap::Command::new("plugins").about("List external commands declared in the plugin manifest")
    }

    async fn run(&self, ctx: &AppContext, _args: &ArgMatches) -> Result<CommandOutput> {
        let manifest_path = ctx.paths().plugin_manifest_file();
        let manifest = PluginManifest::load(&manifest_path);
        let builtins = crate::commands::builtin_registry();

        let entries: Vec<_> = manifest
            .entries()
            .iter()
            .map(|entry| {
                json!({
                    "name": entry.name,
                    "path": entry.path.display().to_string(),
                    "description": entry.description,
                    "shadowed": builtins.contains(&entry.name),
                })
            })
            .collect();

        let output = CommandOutput::new(json!({
            "status": "success",
            "manifest": manifest_path.display().to_string(),
            "plugins": entries,
        }));

        if manifest.is_empty() {
            return Ok(output.warning(format!("No plugins declared in {}", manifest_path.display())));
        }

        Ok(manifest.entries().iter().fold(output.info("Plugins"), |output, entry| {
            let line = format!(
                "  {:<16} {}",
                entry.name,
                entry.description.as_deref().unwrap_or("")
            );
            if builtins.contains(&entry.name) {
                output.dim(format!("{} (ignored: shadows a built-in command)", line.trim_end()))
            } else {
                output.plain(line.trim_end().to_string()).dim(format!("  {:<16} {}", "", entry.path.display()))
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_and_flags_shadowed_entries() {
        let dir = TempDir::new().unwrap();
        let ctx = testing::context(&dir);
        let manifest = ctx.paths().plugin_manifest_file();
        std::fs::create_dir_all(manifest.parent().unwrap()).unwrap();
        std::fs::write(
            &manifest,
            r#"[{"name":"deploy","path":"/opt/deploy","description":"Ship it"},{"name":"time","path":"/bin/date"}]"#,
        )
        .unwrap();

        let output = testing::run(&PluginsCommand, &ctx, &[]).await.unwrap();
        let plugins = output.data["plugins"].as_array().unwrap();
        assert_eq!(plugins.len(), 2);
        assert_eq!(plugins[0]["shadowed"], false);
        assert_eq!(plugins[1]["shadowed"], true);
    }

    #[tokio::test]
    async fn test_empty_manifest() {
        let dir = TempDir::new().unwrap();
        let output = testing::run(&PluginsCommand, &testing::context(&dir), &[]).await.unwrap();
        assert_eq!(output.data["plugins"], json!([]));
    }
}
