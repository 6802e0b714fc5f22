use crate::context::AppContext;
use crate::dispatch::CliCommand;
use crate::telemetry::resolve_endpoint;
use crate::ui::CommandOutput;
use crate::Result;
use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches};
use serde_json::json;

/// `telemetry [--enable|--disable]`
pub struct TelemetryCommand;

#[async_trait]
impl CliCommand for TelemetryCommand {
    fn name(&self) -> &str {
        "telemetry"
    }

    fn definition(&self) -> clap::Command {
        clap::Command::new("telemetry")
            .about("Opt in or out of anonymous usage telemetry")
            .arg(
                Arg::new("enable")
                    .long("enable")
                    .action(ArgAction::SetTrue)
                    .conflicts_with("disable")
                    .help("Opt into anonymous telemetry"),
            )
            .arg(
                Arg::new("disable")
                    .long("disable")
                    .action(ArgAction::SetTrue)
                    .help("Opt out of telemetry"),
            )
    }

    async fn run(&self, ctx: &AppContext, args: &ArgMatches) -> Result<CommandOutput> {
        let requested = if args.get_flag("enable") {
            Some(true)
        } else if args.get_flag("disable") {
            Some(false)
        } else {
            None
        };

        let Some(enabled) = requested else {
            let enabled = ctx.config().telemetry_enabled;
            let endpoint = resolve_endpoint(ctx.config()).map(|url| url.to_string());
            let mut output = CommandOutput::new(json!({
                "status": "success",
                "telemetryEnabled": enabled,
                "endpoint": endpoint,
            }))
            .info("Telemetry status")
            .plain(format!("Enabled: {}", if enabled { "true" } else { "false" }));
            if let Some(endpoint) = endpoint {
                output = output.plain(format!("Endpoint: {}", endpoint));
            }
            return Ok(output.dim("Use --enable or --disable to modify."));
        };

        let store = ctx.config_store();
        let mut config = store.load();
        config.telemetry_enabled = enabled;
        store.save(&config)?;
        tracing::info!(enabled, "Telemetry preference changed");

        let output = CommandOutput::new(json!({ "status": "success", "telemetryEnabled": enabled }));
        Ok(if enabled {
            output.success("✔ Anonymous telemetry enabled. Thank you for helping improve the CLI!")
        } else {
            output.dim("ℹ Anonymous telemetry disabled. No analytics will be sent.")
        })
    }
}
