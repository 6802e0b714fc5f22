use super::{string_arg, subcommand};
use crate::context::AppContext;
use crate::credentials::{Secret, SecretStatus};
use crate::dispatch::CliCommand;
use crate::ui::CommandOutput;
use crate::utils::errors::CliError;
use crate::Result;
use async_trait::async_trait;
use clap::{Arg, ArgMatches};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// Providers offered by `auth login` (label, vault key)
const PROVIDERS: [(&str, &str); 3] = [("HuggingFace", "huggingface"), ("GitHub", "github"), ("AWS", "aws")];

/// `auth login | profile | status | logout`
pub struct AuthCommand;

#[async_trait]
impl CliCommand for AuthCommand {
    fn name(&self) -> &str {
        "auth"
    }

    fn definition(&self) -> clap::Command {
        let provider = Arg::new("provider")
            .long("provider")
            .short('p')
            .value_name("PROVIDER")
            .help("Provider key, e.g. huggingface or github");

        clap::Command::new("auth")
            .about("Identity management: login | profile | status | logout")
            .subcommand_required(true)
            .subcommand(
                clap::Command::new("login")
                    .about("Store a token for the active profile")
                    .arg(provider.clone()),
            )
            .subcommand(
                clap::Command::new("profile")
                    .about("Show or switch the active profile")
                    .arg(Arg::new("name").help("Profile to switch to")),
            )
            .subcommand(clap::Command::new("status").about("Show which tokens are available"))
            .subcommand(
                clap::Command::new("logout")
                    .about("Remove a stored token from the active profile")
                    .arg(provider.required(true)),
            )
    }

    async fn run(&self, ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
        let (action, sub) = subcommand(self, args)?;
        match action {
            "login" => login(ctx, string_arg(sub, "provider")).await,
            "profile" => profile(ctx, string_arg(sub, "name")).await,
            "status" => Ok(status(ctx)),
            "logout" => logout(ctx, string_arg(sub, "provider").unwrap_or_default()),
            other => Err(CliError::usage(format!("unknown auth action '{}'", other))),
        }
    }
}

fn normalize_provider(raw: &str) -> Result<String> {
    let provider = raw.trim().to_lowercase();
    if provider.is_empty() {
        return Err(CliError::validation("provider", "must not be empty"));
    }
    Ok(provider)
}

async fn login(ctx: &AppContext, provider: Option<&str>) -> Result<CommandOutput> {
    let interaction = ctx.interaction();
    let provider = match provider {
        Some(provider) => normalize_provider(provider)?,
        None => {
            let labels: Vec<&str> = PROVIDERS.iter().map(|(label, _)| *label).collect();
            let chosen = interaction.select("Select API provider:", &labels).await?;
            normalize_provider(&chosen)?
        }
    };

    let token = interaction.secret("Enter secure token:").await?;
    if token.trim().is_empty() {
        return Err(CliError::validation("token", "must not be empty"));
    }

    let profile = ctx.active_profile();
    ctx.vault().store(profile, &provider, &Secret::new(token.trim()))?;
    ctx.audit().record_best_effort("auth login", &[profile, provider.as_str()]);
    tracing::info!(profile, provider = %provider, "Credential stored");

    Ok(CommandOutput::new(json!({ "status": "success", "profile": profile, "provider": provider }))
        .success(format!("✔ Token for {} stored for profile: {}", provider, profile)))
}

async fn profile(ctx: &AppContext, name: Option<&str>) -> Result<CommandOutput> {
    let current = ctx.active_profile();
    let chosen = match name {
        Some(name) => name.trim().to_string(),
        None if ctx.options().ci => {
            return Ok(CommandOutput::new(json!({ "status": "success", "profile": current }))
                .plain(format!("Current profile: {}", current)));
        }
        None => {
            ctx.interaction()
                .text("Enter profile name to switch to:", Some(current))
                .await?
        }
    };

    let store = ctx.config_store();
    let mut config = store.load();
    config.set("defaultProfile", &chosen)?;
    store.save(&config)?;

    Ok(CommandOutput::new(json!({ "status": "success", "profile": config.default_profile }))
        .success(format!("✔ Active profile switched to: {}", config.default_profile)))
}

fn status(ctx: &AppContext) -> CommandOutput {
    let profile = ctx.active_profile();
    let resolver = ctx.secrets();

    let providers: BTreeSet<String> = PROVIDERS
        .iter()
        .map(|(_, key)| key.to_string())
        .chain(ctx.vault().providers(profile))
        .collect();

    let mut data = Map::new();
    let mut output = CommandOutput::empty().info(format!("Profile: {}", profile));
    for provider in &providers {
        let status = resolver.status(provider);
        let source = match &status {
            SecretStatus::Environment(var) => format!("env:{}", var),
            SecretStatus::Vault => "vault".to_string(),
            SecretStatus::Missing(_) => "missing".to_string(),
        };
        data.insert(provider.clone(), Value::String(source));

        let line = format!("  {:<12} {}", provider, status.display());
        output = if status.is_available() {
            output.success(line)
        } else {
            output.dim(line)
        };
    }

    output.data = json!({
        "status": "success",
        "profile": profile,
        "profiles": ctx.vault().profiles(),
        "providers": data,
    });
    output
}

fn logout(ctx: &AppContext, provider: &str) -> Result<CommandOutput> {
    let provider = normalize_provider(provider)?;
    let profile = ctx.active_profile();

    if !ctx.vault().remove(profile, &provider)? {
        return Err(CliError::not_found(format!(
            "stored token for '{}' in profile '{}'",
            provider, profile
        )));
    }
    ctx.audit().record_best_effort("auth logout", &[profile, provider.as_str()]);

    Ok(CommandOutput::new(json!({ "status": "success", "profile": profile, "provider": provider }))
        .success(format!("✔ Removed {} token from profile: {}", provider, profile)))
}
