//! Pre-action hooks fired between argument parsing and the handler

use super::Invocation;
use crate::context::AppContext;
use crate::telemetry::{TelemetryEvent, TelemetrySender};

/// Callback run before every handler
///
/// Hooks are synchronous and must not block; anything slow belongs on a
/// background task.
pub trait PreActionHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn before(&self, ctx: &AppContext, invocation: &Invocation);
}

/// Records the invocation in the structured log, without argument values
pub struct LoggingHook;

impl PreActionHook for LoggingHook {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn before(&self, ctx: &AppContext, invocation: &Invocation) {
        tracing::info!(
            command = %invocation.command,
            argument_count = invocation.arguments.len() as u64,
            profile = ctx.active_profile(),
            ci = ctx.options().ci,
            "Command invoked"
        );
    }
}

/// Queues a telemetry event when the user opted in
pub struct TelemetryHook {
    sender: TelemetrySender,
}

impl TelemetryHook {
    pub fn new(sender: TelemetrySender) -> Self {
        Self { sender }
    }
}

impl PreActionHook for TelemetryHook {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn before(&self, ctx: &AppContext, invocation: &Invocation) {
        if !ctx.config().telemetry_enabled {
            return;
        }

        self.sender.send(TelemetryEvent::command(
            &invocation.command,
            invocation.arguments.len(),
            ctx.options().ci,
            self.sender.session_id(),
        ));
    }
}
