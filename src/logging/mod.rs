//! Structured JSON-lines logging
//!
//! [`StructuredLogger`] appends one JSON object per line to `cli.log`.
//! [`JsonLinesLayer`] plugs it into `tracing`, so the crate's ordinary
//! `tracing::info!`/`error!` calls end up in the same file and format.

use crate::utils::fs::append_line;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

pub mod audit;

pub use audit::{AuditEntry, AuditLog};

/// Environment variables that switch on DEBUG entries
pub const DEBUG_ENV_VARS: [&str; 2] = ["DEBUG", "MYCLI_DEBUG"];

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    fn from_tracing(level: &Level) -> Option<Self> {
        match *level {
            Level::ERROR => Some(LogLevel::Error),
            Level::WARN => Some(LogLevel::Warn),
            Level::INFO => Some(LogLevel::Info),
            Level::DEBUG => Some(LogLevel::Debug),
            Level::TRACE => None,
        }
    }
}

/// One line of `cli.log`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub meta: Value,
    pub timestamp: String,
}

/// Whether DEBUG entries are written, read from the environment
pub fn debug_enabled_from_env() -> bool {
    DEBUG_ENV_VARS.iter().any(|var| {
        std::env::var(var)
            .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(false)
    })
}

/// ISO-8601 UTC timestamp with millisecond precision
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Append-only JSON-lines writer for general diagnostics
///
/// Writes are best-effort: a failure is reported once on stderr and never
/// propagated to the caller.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    path: PathBuf,
    debug_enabled: bool,
    failure_reported: Arc<AtomicBool>,
}

impl StructuredLogger {
    pub fn new<P: Into<PathBuf>>(path: P, debug_enabled: bool) -> Self {
        Self {
            path: path.into(),
            debug_enabled,
            failure_reported: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    pub fn info(&self, message: &str, meta: Value) {
        self.write(LogLevel::Info, message, meta);
    }

    pub fn error(&self, message: &str, meta: Value) {
        self.write(LogLevel::Error, message, meta);
    }

    pub fn warn(&self, message: &str, meta: Value) {
        self.write(LogLevel::Warn, message, meta);
    }

    /// No-op unless debug logging is enabled
    pub fn debug(&self, message: &str, meta: Value) {
        if self.debug_enabled {
            self.write(LogLevel::Debug, message, meta);
        }
    }

    fn write(&self, level: LogLevel, message: &str, meta: Value) {
        let entry = LogEntry {
            level,
            message: message.to_string(),
            meta: if meta.is_null() { Value::Object(Map::new()) } else { meta },
            timestamp: timestamp_now(),
        };

        let result = serde_json::to_string(&entry)
            .map_err(crate::utils::errors::CliError::from)
            .and_then(|line| append_line(&self.path, &line));

        if let Err(e) = result {
            if !self.failure_reported.swap(true, Ordering::Relaxed) {
                eprintln!("warning: could not write log file: {}", e);
            }
        }
    }
}

/// `tracing` layer that forwards this crate's events to a [`StructuredLogger`]
pub struct JsonLinesLayer {
    logger: StructuredLogger,
    target_prefix: &'static str,
}

impl JsonLinesLayer {
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            logger,
            target_prefix: env!("CARGO_CRATE_NAME"),
        }
    }
}

impl<S: Subscriber> Layer<S> for JsonLinesLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(self.target_prefix) {
            return;
        }

        let level = match LogLevel::from_tracing(metadata.level()) {
            Some(LogLevel::Debug) if !self.logger.debug_enabled() => return,
            Some(level) => level,
            None => return,
        };

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        self.logger
            .write(level, &visitor.message, Value::Object(visitor.fields));
    }
}

#[derive(Default)]
struct JsonVisitor {
    message: String,
    fields: Map<String, Value>,
}

impl JsonVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for JsonVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use tracing_subscriber::layer::SubscriberExt;

    fn read_entries(path: &Path) -> Vec<LogEntry> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_info_and_error_lines() {
        let dir = TempDir::new().unwrap();
        let logger = StructuredLogger::new(dir.path().join("logs/cli.log"), false);

        logger.info("started", json!({ "command": "greet" }));
        logger.error("failed", Value::Null);

        let entries = read_entries(logger.path());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].meta, json!({ "command": "greet" }));
        assert_eq!(entries[1].level, LogLevel::Error);
        assert_eq!(entries[1].meta, json!({}));
        assert!(entries[1].timestamp.ends_with('Z'));
    }

    #[test]
    fn test_debug_is_gated() {
        let dir = TempDir::new().unwrap();
        let quiet = StructuredLogger::new(dir.path().join("quiet.log"), false);
        let chatty = StructuredLogger::new(dir.path().join("chatty.log"), true);

        quiet.debug("hidden", json!({}));
        chatty.debug("shown", json!({}));

        assert!(!quiet.path().exists());
        assert_eq!(read_entries(chatty.path())[0].message, "shown");
    }

    #[test]
    fn test_level_serializes_uppercase() {
        let line = serde_json::to_string(&LogLevel::Debug).unwrap();
        assert_eq!(line, "\"DEBUG\"");
    }

    #[test]
    fn test_unwritable_log_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // parent is a regular file, so the append fails
        let logger = StructuredLogger::new(blocker.join("cli.log"), false);
        logger.info("lost", json!({}));
        logger.info("lost again", json!({}));
    }

    #[test]
    fn test_layer_forwards_crate_events_with_fields() {
        let dir = TempDir::new().unwrap();
        let logger = StructuredLogger::new(dir.path().join("cli.log"), false);
        let subscriber =
            tracing_subscriber::registry().with(JsonLinesLayer::new(logger.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(command = "docker", attempts = 2_u64, "Handler finished");
            tracing::debug!("not recorded without debug");
            tracing::info!(target: "hyper::client", "foreign target is ignored");
        });

        let entries = read_entries(logger.path());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Handler finished");
        assert_eq!(entries[0].meta, json!({ "command": "docker", "attempts": 2 }));
    }
}
