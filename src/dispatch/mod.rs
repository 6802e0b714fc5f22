//! Command dispatch
//!
//! The [`Dispatcher`] builds the clap tree from the [`CommandRegistry`],
//! splits argv into global options and a command invocation, fires the
//! pre-action hooks and runs the handler with failure containment.
//!
//! Exit codes: 0 on success, 1 when a handler fails or panics, 2 for an
//! unknown command or invalid arguments.

use crate::context::{AppContext, GlobalOptions};
use crate::config::Theme;
use crate::ui::{ci_from_env, OutputFormat, Palette, Reporter};
use crate::utils::errors::{CliError, EXIT_SUCCESS, EXIT_USAGE};
use crate::{APP_NAME, VERSION};
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches};
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::ffi::OsString;
use std::panic::AssertUnwindSafe;

pub mod hooks;
pub mod registry;

pub use hooks::{LoggingHook, PreActionHook, TelemetryHook};
pub use registry::{CliCommand, CommandRegistry};

const ABOUT: &str = "A multi-command terminal toolkit";

/// Global flags that take a value in the next token
const VALUE_FLAGS: [&str; 2] = ["--output", "--log-level"];

/// Resolved command path and the raw arguments that followed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Space-joined command path, e.g. `config set`
    pub command: String,
    pub arguments: Vec<String>,
}

/// Successfully parsed command line
#[derive(Debug, Clone)]
pub struct ParsedInvocation {
    pub options: GlobalOptions,
    pub invocation: Invocation,
    command_name: String,
    matches: ArgMatches,
}

impl ParsedInvocation {
    /// Name of the top-level command
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    /// Matches scoped to the top-level command
    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }
}

pub struct Dispatcher {
    registry: CommandRegistry,
    hooks: Vec<Box<dyn PreActionHook>>,
}

impl Dispatcher {
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry,
            hooks: Vec::new(),
        }
    }

    /// Hooks fire in the order they were added
    pub fn add_hook<H: PreActionHook + 'static>(&mut self, hook: H) {
        tracing::debug!(hook = hook.name(), "Added pre-action hook");
        self.hooks.push(Box::new(hook));
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Root clap command with global flags and every registered command
    pub fn root_command(&self) -> clap::Command {
        let root = clap::Command::new(APP_NAME)
            .version(VERSION)
            .about(ABOUT)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new("ci")
                    .long("ci")
                    .action(ArgAction::SetTrue)
                    .help("Never prompt; fail instead (also enabled by CI=true)"),
            )
            .arg(
                Arg::new("output")
                    .long("output")
                    .value_name("FORMAT")
                    .value_parser(["human", "json"])
                    .default_value("human")
                    .help("Output format"),
            )
            .arg(
                Arg::new("log-level")
                    .long("log-level")
                    .value_name("FILTER")
                    .help("Print diagnostics to stderr (e.g. debug, warn)"),
            );

        self.registry
            .iter()
            .fold(root, |root, command| root.subcommand(command.definition()))
    }

    /// Parse argv (including the program name)
    pub fn parse<I, T>(&self, args: I) -> std::result::Result<ParsedInvocation, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let mut root = self.root_command();
        let matches = root.try_get_matches_from_mut(args.iter().cloned())?;

        let options = GlobalOptions {
            ci: matches.get_flag("ci") || ci_from_env(),
            output: matches
                .get_one::<String>("output")
                .map(|format| format.parse().unwrap_or_default())
                .unwrap_or_default(),
            log_level: matches.get_one::<String>("log-level").cloned(),
        };

        let Some((name, sub_matches)) = matches.subcommand() else {
            return Err(root.error(ErrorKind::MissingSubcommand, "a command is required"));
        };

        let path = command_path(name, sub_matches);
        let arguments = trailing_arguments(&args, path.len());

        Ok(ParsedInvocation {
            options,
            invocation: Invocation {
                command: path.join(" "),
                arguments,
            },
            command_name: name.to_string(),
            matches: sub_matches.clone(),
        })
    }

    /// Run the parsed command and return the process exit code
    ///
    /// Output goes to stdout; errors are logged with their source chain and
    /// rendered to stderr.
    pub async fn execute(&self, ctx: &AppContext, parsed: &ParsedInvocation) -> i32 {
        let invocation = &parsed.invocation;
        let Some(command) = self.registry.get(&parsed.command_name) else {
            let error = CliError::usage(format!("unknown command '{}'", parsed.command_name));
            return self.report_failure(ctx, invocation, &error);
        };

        for hook in &self.hooks {
            hook.before(ctx, invocation);
        }

        let result = AssertUnwindSafe(command.run(ctx, &parsed.matches))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(CliError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            });

        match result {
            Ok(output) => {
                if let Some(text) = ctx.reporter().render_output(&output) {
                    println!("{}", text);
                }
                tracing::debug!(command = %invocation.command, "Command completed");
                EXIT_SUCCESS
            }
            Err(error) => self.report_failure(ctx, invocation, &error),
        }
    }

    fn report_failure(&self, ctx: &AppContext, invocation: &Invocation, error: &CliError) -> i32 {
        ctx.logger().error(
            "Command failed",
            json!({
                "command": invocation.command,
                "category": error.category(),
                "chain": error.chain(),
            }),
        );
        eprintln!("{}", ctx.reporter().render_error(error));
        error.exit_code()
    }
}

/// Print a clap error (or help/version text) and pick the exit code
///
/// In JSON mode a real parse failure is rendered like any other usage error;
/// help and version text are always printed as-is.
pub fn report_parse_error(error: &clap::Error, format: OutputFormat) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ if format == OutputFormat::Json => {
            let reporter = Reporter::new(format, Palette::for_theme(Theme::default()));
            eprintln!("{}", reporter.render_error(&usage_error(error)));
            EXIT_USAGE
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE
        }
    }
}

/// Usage error carrying the first line of clap's message
pub fn usage_error(error: &clap::Error) -> CliError {
    let text = error.to_string();
    let message = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string());
    CliError::usage(message)
}

/// Output format requested among the leading global flags of raw argv
///
/// Used when clap rejected the command line and no [`GlobalOptions`] exist.
pub fn requested_output_format(args: &[OsString]) -> OutputFormat {
    let tokens: Vec<String> = args
        .iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy().to_string())
        .collect();

    let mut format = OutputFormat::default();
    let mut index = 0;
    while let Some(token) = tokens.get(index) {
        if token == "--output" {
            if let Some(value) = tokens.get(index + 1) {
                format = value.parse().unwrap_or(format);
            }
            index += 2;
        } else if let Some(value) = token.strip_prefix("--output=") {
            format = value.parse().unwrap_or(format);
            index += 1;
        } else if VALUE_FLAGS.contains(&token.as_str()) {
            index += 2;
        } else if token.starts_with('-') {
            index += 1;
        } else {
            break;
        }
    }
    format
}

fn command_path(name: &str, matches: &ArgMatches) -> Vec<String> {
    let mut path = vec![name.to_string()];
    let mut current = matches;
    while let Some((sub, next)) = current.subcommand() {
        path.push(sub.to_string());
        current = next;
    }
    path
}

/// Raw tokens after the command path, with leading global flags skipped
fn trailing_arguments(args: &[OsString], path_len: usize) -> Vec<String> {
    let tokens: Vec<String> = args
        .iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy().to_string())
        .collect();

    let mut index = 0;
    while let Some(token) = tokens.get(index) {
        if VALUE_FLAGS.contains(&token.as_str()) {
            index += 2;
        } else if token.starts_with('-') {
            index += 1;
        } else {
            break;
        }
    }

    tokens
        .get(index + path_len..)
        .map(<[String]>::to_vec)
        .unwrap_or_default()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
