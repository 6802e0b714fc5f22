//! Command capability trait and the ordered registry of commands

use crate::context::AppContext;
use crate::ui::CommandOutput;
use crate::utils::errors::CliError;
use crate::Result;
use async_trait::async_trait;
use clap::ArgMatches;
use indexmap::IndexMap;
use std::sync::Arc;

/// A command the dispatcher can route to
///
/// `definition` must return a clap command whose name equals `name()`.
#[async_trait]
pub trait CliCommand: Send + Sync {
    fn name(&self) -> &str;

    /// Arguments, flags and help text
    fn definition(&self) -> clap::Command;

    /// Execute with the matches for this command only
    async fn run(&self, ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput>;
}

/// Commands in registration order, which is also the `--help` order
#[derive(Default, Clone)]
pub struct CommandRegistry {
    commands: IndexMap<String, Arc<dyn CliCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command; a second command with the same name is rejected
    pub fn register<C: CliCommand + 'static>(&mut self, command: C) -> Result<()> {
        self.register_arc(Arc::new(command))
    }

    pub fn register_arc(&mut self, command: Arc<dyn CliCommand>) -> Result<()> {
        let name = command.name().to_string();
        if self.commands.contains_key(&name) {
            return Err(CliError::already_exists(format!("command '{}'", name)));
        }
        tracing::debug!(command = %name, "Registered command");
        self.commands.insert(name, command);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CliCommand>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CliCommand>> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl CliCommand for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn definition(&self) -> clap::Command {
            clap::Command::new(self.0)
        }

        async fn run(&self, _ctx: &AppContext, _args: &ArgMatches) -> Result<CommandOutput> {
            Ok(CommandOutput::empty())
        }
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = CommandRegistry::new();
        registry.register(Named("zeta")).unwrap();
        registry.register(Named("alpha")).unwrap();
        registry.register(Named("mid")).unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("alpha"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register(Named("greet")).unwrap();
        let err = registry.register(Named("greet")).unwrap_err();
        assert!(matches!(err, CliError::AlreadyExists { .. }));
        assert_eq!(registry.len(), 1);
    }
}
