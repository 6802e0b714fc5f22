//! Rendering of command results and errors
//!
//! Handlers return a [`CommandOutput`]; the [`Reporter`] turns it into colored
//! lines or a single line of JSON depending on `--output`.

use super::theme::Palette;
use crate::utils::errors::CliError;
use serde_json::{json, Value};
use std::str::FromStr;

/// Format of everything the dispatcher prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => Err(CliError::usage(format!(
                "unknown output format '{}' (expected human or json)",
                other
            ))),
        }
    }
}

/// Tone of a human-readable line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Success,
    Info,
    Warning,
    Dim,
}

/// Result of a command, in both renderings
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub lines: Vec<(Tone, String)>,
    pub data: Value,
}

impl CommandOutput {
    /// Output with a JSON payload and no human lines yet
    pub fn new(data: Value) -> Self {
        Self {
            lines: Vec::new(),
            data,
        }
    }

    /// `{"status": "success"}` and nothing to print
    pub fn empty() -> Self {
        Self::new(json!({ "status": "success" }))
    }

    pub fn line<S: Into<String>>(mut self, tone: Tone, text: S) -> Self {
        self.lines.push((tone, text.into()));
        self
    }

    pub fn plain<S: Into<String>>(self, text: S) -> Self {
        self.line(Tone::Plain, text)
    }

    pub fn success<S: Into<String>>(self, text: S) -> Self {
        self.line(Tone::Success, text)
    }

    pub fn info<S: Into<String>>(self, text: S) -> Self {
        self.line(Tone::Info, text)
    }

    pub fn warning<S: Into<String>>(self, text: S) -> Self {
        self.line(Tone::Warning, text)
    }

    pub fn dim<S: Into<String>>(self, text: S) -> Self {
        self.line(Tone::Dim, text)
    }
}

/// Formats outputs and errors for the terminal
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    format: OutputFormat,
    palette: Palette,
}

impl Reporter {
    pub fn new(format: OutputFormat, palette: Palette) -> Self {
        Self { format, palette }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Text for stdout, without trailing newline; `None` when there is nothing to print
    pub fn render_output(&self, output: &CommandOutput) -> Option<String> {
        match self.format {
            OutputFormat::Json => Some(output.data.to_string()),
            OutputFormat::Human if output.lines.is_empty() => None,
            OutputFormat::Human => Some(
                output
                    .lines
                    .iter()
                    .map(|(tone, text)| match tone {
                        Tone::Plain => text.clone(),
                        Tone::Success => self.palette.success(text).to_string(),
                        Tone::Info => self.palette.info(text).to_string(),
                        Tone::Warning => self.palette.warning(text).to_string(),
                        Tone::Dim => self.palette.dim(text).to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }

    /// Text for stderr; never includes the error's source chain
    pub fn render_error(&self, error: &CliError) -> String {
        match self.format {
            OutputFormat::Json => json!({
                "status": "error",
                "category": error.category(),
                "message": error.to_string(),
                "exitCode": error.exit_code(),
            })
            .to_string(),
            OutputFormat::Human => {
                let mut text = format!("{}", self.palette.error(&format!("✖ {}", error)));
                if let Some(hint) = hint_for(error) {
                    text.push('\n');
                    text.push_str(&self.palette.warning(hint).to_string());
                }
                text
            }
        }
    }
}

fn hint_for(error: &CliError) -> Option<&'static str> {
    match error {
        CliError::Usage { .. } => Some("Run `mycli --help` to see available commands."),
        CliError::Authentication { .. } => Some("Run `mycli auth login` to store a token for the active profile."),
        CliError::InteractiveDisabled { .. } => Some("Pass the value as a flag or environment variable when running with --ci."),
        CliError::Panicked { .. } => Some("This is a bug; details were written to the log file."),
        _ => None,
    }
}
