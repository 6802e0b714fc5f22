//! mycli - a multi-command terminal toolkit

use mycli::commands::builtin_registry;
use mycli::config::{AppPaths, ConfigStore};
use mycli::context::AppContext;
use mycli::dispatch::{
    report_parse_error, requested_output_format, Dispatcher, LoggingHook, TelemetryHook,
};
use mycli::logging::{debug_enabled_from_env, JsonLinesLayer, StructuredLogger};
use mycli::plugins::PluginManifest;
use mycli::telemetry::{resolve_endpoint, TelemetryClient};
use mycli::ui::{OutputFormat, Palette, Reporter};
use mycli::utils::errors::{CliError, EXIT_FAILURE};
use std::ffi::OsString;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

type StderrFilter = reload::Handle<EnvFilter, Registry>;

#[tokio::main]
async fn main() {
    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    let paths = match AppPaths::discover() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("✖ {}", e);
            return EXIT_FAILURE;
        }
    };

    let stderr_filter = init_logging(StructuredLogger::new(paths.log_file(), debug_enabled_from_env()));
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Command handler panicked");
    }));

    let config = ConfigStore::new(paths.config_file()).load();
    let manifest = PluginManifest::load(&paths.plugin_manifest_file());

    let mut registry = builtin_registry();
    manifest.register_into(&mut registry);
    let mut dispatcher = Dispatcher::new(registry);

    let args: Vec<OsString> = std::env::args_os().collect();
    let parsed = match dispatcher.parse(args.iter().cloned()) {
        Ok(parsed) => parsed,
        Err(e) => return report_parse_error(&e, requested_output_format(&args)),
    };

    if let Some(level) = parsed.options.log_level.as_deref() {
        if let Err(e) = set_stderr_filter(&stderr_filter, level) {
            let reporter = Reporter::new(parsed.options.output, Palette::for_theme(config.theme));
            eprintln!("{}", reporter.render_error(&e));
            return e.exit_code();
        }
    }

    tracing::debug!(version = mycli::VERSION, command = %parsed.invocation.command, "Starting");

    let endpoint = if config.telemetry_enabled {
        resolve_endpoint(&config)
    } else {
        None
    };
    let telemetry = TelemetryClient::start(endpoint);
    dispatcher.add_hook(LoggingHook);
    dispatcher.add_hook(TelemetryHook::new(telemetry.sender()));

    let ctx = AppContext::new(paths, config, parsed.options.clone());
    if ctx.options().output == OutputFormat::Json {
        colored::control::set_override(false);
    }

    let code = dispatcher.execute(&ctx, &parsed).await;
    telemetry.shutdown().await;
    code
}

/// File layer for this crate's events plus an stderr layer that stays off
/// until `--log-level` or `RUST_LOG` asks for it
fn init_logging(logger: StructuredLogger) -> StderrFilter {
    let initial = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    let (filter, handle) = reload::Layer::new(initial);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(JsonLinesLayer::new(logger))
        .try_init()
        .ok();

    handle
}

fn set_stderr_filter(handle: &StderrFilter, level: &str) -> mycli::Result<()> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| CliError::usage(format!("Invalid log level '{}': {}", level, e)))?;
    handle
        .reload(filter)
        .map_err(|e| CliError::unknown(format!("Failed to set log level: {}", e)))
}
