use crate::context::AppContext;
use crate::dispatch::CliCommand;
use crate::ui::CommandOutput;
use crate::Result;
use async_trait::async_trait;
use chrono::{Local, SecondsFormat};
use clap::ArgMatches;
use serde_json::json;

/// `time`: local wall-clock time
pub struct TimeCommand;

#[async_trait]
impl CliCommand for TimeCommand {
    fn name(&self) -> &str {
        "time"
    }

    fn definition(&self) -> clap::Command {
        clap::Command::new("time").about("Show current system time")
    }

    async fn run(&self, _ctx: &AppContext, _args: &ArgMatches) -> Result<CommandOutput> {
        let now = Local::now();
        let human = format!("{} - {}", now.format("%H:%M:%S"), now.format("%a %b %d %Y"));

        Ok(CommandOutput::new(json!({
            "status": "success",
            "time": now.to_rfc3339_opts(SecondsFormat::Secs, false),
            "unix": now.timestamp(),
        }))
        .warning(human))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_time_payload() {
        let dir = TempDir::new().unwrap();
        let output = testing::run(&TimeCommand, &testing::context(&dir), &[]).await.unwrap();

        assert!(output.data["unix"].as_i64().unwrap() > 1_600_000_000);
        assert!(chrono::DateTime::parse_from_rfc3339(output.data["time"].as_str().unwrap()).is_ok());
        assert_eq!(output.lines.len(), 1);
    }
}
