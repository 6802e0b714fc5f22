//! Built-in command handlers
//!
//! Handlers are thin: they read their arguments, call into the config,
//! credential, process or HTTP helpers, and return a [`CommandOutput`].
//!
//! [`CommandOutput`]: crate::ui::CommandOutput

use crate::dispatch::{CliCommand, CommandRegistry};
use clap::ArgMatches;
use std::sync::Arc;

pub mod ask;
pub mod auth;
pub mod config;
pub mod docker;
pub mod greet;
pub mod plugins;
pub mod ssh;
pub mod telemetry;
pub mod theme;
pub mod time;

/// Registry holding every built-in command, in `--help` order
pub fn builtin_registry() -> CommandRegistry {
    let builtins: Vec<Arc<dyn CliCommand>> = vec![
        Arc::new(greet::GreetCommand),
        Arc::new(time::TimeCommand),
        Arc::new(config::ConfigCommand),
        Arc::new(theme::ThemeCommand),
        Arc::new(telemetry::TelemetryCommand),
        Arc::new(auth::AuthCommand),
        Arc::new(docker::DockerCommand),
        Arc::new(ssh::SshCommand),
        Arc::new(ask::AskCommand::default()),
        Arc::new(plugins::PluginsCommand),
    ];

    let mut registry = CommandRegistry::new();
    for command in builtins {
        if let Err(e) = registry.register_arc(command) {
            tracing::error!(error = %e, "Built-in command not registered");
        }
    }
    registry
}

/// Value of a string argument the definition declares
fn string_arg<'a>(args: &'a ArgMatches, id: &str) -> Option<&'a str> {
    args.get_one::<String>(id).map(String::as_str)
}

/// Subcommand name and matches, for commands that declare `subcommand_required`
fn subcommand<'a>(command: &dyn CliCommand, args: &'a ArgMatches) -> crate::Result<(&'a str, &'a ArgMatches)> {
    args.subcommand().ok_or_else(|| {
        crate::utils::errors::CliError::usage(format!("'{}' requires an action", command.name()))
    })
}
