use super::{string_arg, subcommand};
use crate::config::Theme;
use crate::context::AppContext;
use crate::dispatch::CliCommand;
use crate::ui::CommandOutput;
use crate::utils::errors::CliError;
use crate::Result;
use async_trait::async_trait;
use clap::{Arg, ArgMatches};
use serde_json::{json, Value};

/// `config show | get | set | unset | path | edit`
pub struct ConfigCommand;

#[async_trait]
impl CliCommand for ConfigCommand {
    fn name(&self) -> &str {
        "config"
    }

    fn definition(&self) -> clap::Command {
        clap::Command::new("config")
            .about("Manage your mycli configuration")
            .subcommand_required(true)
            .subcommand(clap::Command::new("show").about("Print the whole configuration"))
            .subcommand(
                clap::Command::new("get")
                    .about("Print one key")
                    .arg(Arg::new("key").required(true)),
            )
            .subcommand(
                clap::Command::new("set")
                    .about("Set one key (JSON literals are parsed, anything else is a string)")
                    .arg(Arg::new("key").required(true))
                    .arg(Arg::new("value").required(true)),
            )
            .subcommand(
                clap::Command::new("unset")
                    .about("Remove a key, or reset a built-in key to its default")
                    .arg(Arg::new("key").required(true)),
            )
            .subcommand(clap::Command::new("path").about("Print the configuration file location"))
            .subcommand(clap::Command::new("edit").about("Interactively update username and theme"))
    }

    async fn run(&self, ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
        let (action, sub) = subcommand(self, args)?;
        match action {
            "show" => Ok(show(ctx)),
            "get" => get(ctx, string_arg(sub, "key").unwrap_or_default()),
            "set" => set(
                ctx,
                string_arg(sub, "key").unwrap_or_default(),
                string_arg(sub, "value").unwrap_or_default(),
            ),
            "unset" => unset(ctx, string_arg(sub, "key").unwrap_or_default()),
            "path" => {
                let path = ctx.config_store().path().display().to_string();
                Ok(CommandOutput::new(json!({ "status": "success", "path": path })).plain(path))
            }
            "edit" => edit(ctx).await,
            other => Err(CliError::usage(format!("unknown config action '{}'", other))),
        }
    }
}

fn show(ctx: &AppContext) -> CommandOutput {
    let config = serde_json::to_value(ctx.config()).unwrap_or(Value::Null);
    let pretty = serde_json::to_string_pretty(&config).unwrap_or_default();

    pretty.lines().fold(
        CommandOutput::new(json!({ "status": "success", "config": config }))
            .info("Current config:"),
        |output, line| output.plain(line),
    )
}

fn get(ctx: &AppContext, key: &str) -> Result<CommandOutput> {
    let value = ctx
        .config()
        .get(key)
        .ok_or_else(|| CliError::not_found(format!("config key '{}'", key)))?;

    let human = match &value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(CommandOutput::new(json!({ "status": "success", "key": key, "value": value })).plain(human))
}

fn set(ctx: &AppContext, key: &str, raw: &str) -> Result<CommandOutput> {
    let store = ctx.config_store();
    let mut config = store.load();
    config.set(key, raw)?;
    store.save(&config)?;

    let value = config.get(key).unwrap_or(Value::Null);
    tracing::info!(key, "Configuration key updated");
    Ok(CommandOutput::new(json!({ "status": "success", "key": key, "value": value }))
        .success(format!("✔ {} = {}", key, value)))
}

fn unset(ctx: &AppContext, key: &str) -> Result<CommandOutput> {
    let store = ctx.config_store();
    let mut config = store.load();
    if !config.unset(key) {
        return Err(CliError::not_found(format!("config key '{}'", key)));
    }
    store.save(&config)?;

    Ok(CommandOutput::new(json!({ "status": "success", "key": key })).success(format!("✔ {} removed", key)))
}

async fn edit(ctx: &AppContext) -> Result<CommandOutput> {
    let store = ctx.config_store();
    let mut config = store.load();
    let interaction = ctx.interaction();

    let current_username = config
        .get("username")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let username = interaction.text("Your username:", Some(&current_username)).await?;
    let theme = interaction
        .text("Preferred theme:", Some(config.theme.as_str()))
        .await?
        .parse::<Theme>()?;

    config.theme = theme;
    config.extra.insert("username".to_string(), Value::String(username));
    store.save(&config)?;

    Ok(CommandOutput::new(json!({ "status": "success", "config": config }))
        .success("Configuration saved successfully!"))
}
