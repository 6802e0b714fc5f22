use super::{string_arg, subcommand};
use crate::context::AppContext;
use crate::dispatch::CliCommand;
use crate::ui::CommandOutput;
use crate::utils::errors::CliError;
use crate::utils::fs::{read_json, write_json_atomic, JsonRead, PRIVATE_FILE_MODE};
use crate::utils::process::run_inherited;
use crate::Result;
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgMatches};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};

const DEFAULT_SSH_PORT: u16 = 22;

/// A saved SSH target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConnection {
    pub name: String,
    pub host: String,
    pub user: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
}

impl SshConnection {
    /// Arguments for `ssh`, key first
    pub fn ssh_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(key) = self.key_path.as_deref().filter(|k| !k.trim().is_empty()) {
            args.push("-i".to_string());
            args.push(key.to_string());
        }
        args.push("-p".to_string());
        args.push(self.port.to_string());
        args.push(format!("{}@{}", self.user, self.host));
        args
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [("name", &self.name), ("host", &self.host), ("user", &self.user)] {
            if value.trim().is_empty() {
                return Err(CliError::validation(field, "is required"));
            }
            if value.starts_with('-') || value.contains(char::is_whitespace) {
                return Err(CliError::validation(field, format!("'{}' is not allowed", value)));
            }
        }
        if self.port == 0 {
            return Err(CliError::validation("port", "must be between 1 and 65535"));
        }
        Ok(())
    }
}

/// Older files stored the port as a string
fn port_from_number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// JSON array of [`SshConnection`] records
#[derive(Debug, Clone)]
pub struct SshStore {
    path: PathBuf,
}

impl SshStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved connections; a missing or damaged file reads as empty
    pub fn load(&self) -> Vec<SshConnection> {
        match read_json(&self.path) {
            JsonRead::Missing => Vec::new(),
            JsonRead::Parsed(connections) => connections,
            JsonRead::Invalid(reason) => {
                tracing::warn!(path = %self.path.display(), error = %reason, "Could not load SSH connections");
                Vec::new()
            }
        }
    }

    pub fn save(&self, connections: &[SshConnection]) -> Result<()> {
        write_json_atomic(&self.path, connections, PRIVATE_FILE_MODE)
    }

    pub fn find(&self, name: &str) -> Option<SshConnection> {
        self.load().into_iter().find(|c| c.name == name)
    }

    /// Append a connection; names are unique
    pub fn add(&self, connection: SshConnection) -> Result<()> {
        connection.validate()?;
        let mut connections = self.load();
        if connections.iter().any(|c| c.name == connection.name) {
            return Err(CliError::already_exists(format!("SSH connection '{}'", connection.name)));
        }
        connections.push(connection);
        self.save(&connections)
    }

    /// Returns false when no connection had that name
    pub fn remove(&self, name: &str) -> Result<bool> {
        let mut connections = self.load();
        let before = connections.len();
        connections.retain(|c| c.name != name);
        if connections.len() == before {
            return Ok(false);
        }
        self.save(&connections)?;
        Ok(true)
    }
}

/// `ssh list | add | remove | connect`
pub struct SshCommand;

#[async_trait]
impl CliCommand for SshCommand {
    fn name(&self) -> &str {
        "ssh"
    }

    fn definition(&self) -> clap::Command {
        let name = Arg::new("name").required(true).help("Connection name");

        clap::Command::new("ssh")
            .about("SSH connection manager")
            .subcommand_required(true)
            .subcommand(
                clap::Command::new("list")
                    .visible_alias("ls")
                    .about("List saved SSH connections"),
            )
            .subcommand(
                clap::Command::new("add")
                    .about("Save a new SSH connection (prompts for missing fields)")
                    .arg(Arg::new("name").long("name").help("Connection name"))
                    .arg(Arg::new("host").long("host").help("Host name or address"))
                    .arg(Arg::new("user").long("user").help("Remote user"))
                    .arg(
                        Arg::new("port")
                            .long("port")
                            .value_parser(value_parser!(u16).range(1..))
                            .help("Port (default 22)"),
                    )
                    .arg(Arg::new("key").long("key").value_name("PATH").help("Private key file")),
            )
            .subcommand(
                clap::Command::new("remove")
                    .visible_alias("rm")
                    .about("Remove a saved SSH connection")
                    .arg(name.clone()),
            )
            .subcommand(
                clap::Command::new("connect")
                    .about("Open an interactive session to a saved connection")
                    .arg(name),
            )
    }

    async fn run(&self, ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
        let store = SshStore::new(ctx.paths().ssh_connections_file());
        let (action, sub) = subcommand(self, args)?;
        match action {
            "list" => Ok(list(&store)),
            "add" => add(ctx, &store, sub).await,
            "remove" => remove(&store, string_arg(sub, "name").unwrap_or_default()),
            "connect" => connect(ctx, &store, string_arg(sub, "name").unwrap_or_default()).await,
            other => Err(CliError::usage(format!("unknown ssh action '{}'", other))),
        }
    }
}

fn list(store: &SshStore) -> CommandOutput {
    let connections = store.load();
    let output = CommandOutput::new(json!({ "status": "success", "connections": connections }));
    if connections.is_empty() {
        return output.warning("No saved connections. Use \"mycli ssh add\" to add one.");
    }

    connections
        .iter()
        .enumerate()
        .fold(output.info("Saved SSH connections"), |output, (i, c)| {
            let output = output
                .plain(format!("{}. {}", i + 1, c.name))
                .dim(format!("   {}@{}:{}", c.user, c.host, c.port));
            match &c.key_path {
                Some(key) => output.dim(format!("   Key: {}", key)),
                None => output,
            }
        })
}

async fn add(ctx: &AppContext, store: &SshStore, args: &ArgMatches) -> Result<CommandOutput> {
    let interaction = ctx.interaction();

    let mut fields = Vec::with_capacity(3);
    for (id, prompt) in [("name", "Connection name:"), ("host", "Host:"), ("user", "Username:")] {
        let value = match string_arg(args, id) {
            Some(value) => value.to_string(),
            None => interaction.text(prompt, None).await?,
        };
        fields.push(value.trim().to_string());
    }
    let [name, host, user]: [String; 3] = fields
        .try_into()
        .map_err(|_| CliError::unknown("SSH fields missing"))?;

    let port = match args.get_one::<u16>("port") {
        Some(port) => *port,
        None if ctx.options().ci => DEFAULT_SSH_PORT,
        None => {
            let answer = interaction.text("Port:", Some("22")).await?;
            answer
                .trim()
                .parse()
                .map_err(|_| CliError::validation("port", format!("'{}' is not a valid port", answer.trim())))?
        }
    };

    let key_path = match string_arg(args, "key") {
        Some(key) => Some(key.to_string()),
        None if ctx.options().ci => None,
        None => Some(interaction.text("SSH key path (optional):", None).await?),
    }
    .filter(|k| !k.trim().is_empty());

    let connection = SshConnection {
        name,
        host,
        user,
        port,
        key_path,
    };
    store.add(connection.clone())?;
    tracing::info!(name = %connection.name, "SSH connection saved");

    Ok(CommandOutput::new(json!({ "status": "success", "connection": connection }))
        .success(format!("✔ Added connection: {}", connection.name)))
}

fn remove(store: &SshStore, name: &str) -> Result<CommandOutput> {
    if !store.remove(name)? {
        return Err(CliError::not_found(format!("SSH connection '{}'", name)));
    }
    Ok(CommandOutput::new(json!({ "status": "success", "removed": name }))
        .success(format!("✔ Removed connection: {}", name)))
}

async fn connect(ctx: &AppContext, store: &SshStore, name: &str) -> Result<CommandOutput> {
    let connection = store
        .find(name)
        .ok_or_else(|| CliError::not_found(format!("SSH connection '{}'", name)))?;
    connection.validate()?;

    let port = connection.port.to_string();
    ctx.audit().record_best_effort(
        "ssh connect",
        &[connection.host.as_str(), connection.user.as_str(), port.as_str()],
    );
    tracing::info!(name = %connection.name, host = %connection.host, "Opening SSH session");

    let exit_code = run_inherited("ssh", &connection.ssh_args()).await?;

    Ok(CommandOutput::new(json!({ "status": "success", "connection": connection.name, "exitCode": exit_code }))
        .dim(format!("Remote session terminated (exit code: {})", exit_code)))
}
