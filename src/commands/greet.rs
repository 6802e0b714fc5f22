use crate::context::AppContext;
use crate::dispatch::CliCommand;
use crate::ui::CommandOutput;
use crate::Result;
use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches};
use serde_json::json;

/// `greet <name> [-u]`
pub struct GreetCommand;

#[async_trait]
impl CliCommand for GreetCommand {
    fn name(&self) -> &str {
        "greet"
    }

    fn definition(&self) -> clap::Command {
        clap::Command::new("greet")
            .about("Greet a user by name")
            .arg(Arg::new("name").required(true).help("Who to greet"))
            .arg(
                Arg::new("uppercase")
                    .short('u')
                    .long("uppercase")
                    .action(ArgAction::SetTrue)
                    .help("Print the greeting in uppercase"),
            )
    }

    async fn run(&self, _ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
        let name = super::string_arg(args, "name").unwrap_or_default();
        let mut message = format!("Hello, {}!", name);
        if args.get_flag("uppercase") {
            message = message.to_uppercase();
        }

        Ok(CommandOutput::new(json!({ "status": "success", "message": message })).success(message))
    }
}
