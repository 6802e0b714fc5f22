//! Best-effort usage telemetry
//!
//! Events are queued on an unbounded channel and posted by a background task,
//! so recording one never blocks a command. At exit the worker gets a short
//! grace period to drain the queue and is then abandoned.

use crate::config::Config;
use crate::logging::timestamp_now;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

/// Overrides the `telemetryEndpoint` configuration key
pub const TELEMETRY_URL_ENV: &str = "MYCLI_TELEMETRY_URL";

/// How long `shutdown` waits for queued events
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(300);

/// Per-request timeout for the collector
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Payload posted to the collector; argument values are never included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub event: String,
    pub command: String,
    pub argument_count: usize,
    pub ci: bool,
    pub version: String,
    pub session_id: String,
    pub timestamp: String,
}

impl TelemetryEvent {
    pub fn command(command: &str, argument_count: usize, ci: bool, session_id: &str) -> Self {
        Self {
            event: "command".to_string(),
            command: command.to_string(),
            argument_count,
            ci,
            version: crate::VERSION.to_string(),
            session_id: session_id.to_string(),
            timestamp: timestamp_now(),
        }
    }
}

/// Collector URL from the environment, then the configuration
///
/// An unparsable URL is logged and treated as absent.
pub fn resolve_endpoint(config: &Config) -> Option<Url> {
    let raw = std::env::var(TELEMETRY_URL_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| config.telemetry_endpoint().map(str::to_string))?;

    match Url::parse(raw.trim()) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(endpoint = %raw, error = %e, "Ignoring invalid telemetry endpoint");
            None
        }
    }
}

enum Message {
    Event(TelemetryEvent),
    Shutdown,
}

/// Cloneable, non-blocking handle for queueing events
#[derive(Debug, Clone)]
pub struct TelemetrySender {
    tx: mpsc::UnboundedSender<Message>,
    session_id: String,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Event(event) => f.debug_tuple("Event").field(&event.command).finish(),
            Message::Shutdown => f.write_str("Shutdown"),
        }
    }
}

impl TelemetrySender {
    /// Random per-process identifier attached to every event
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Queue an event; silently dropped once the worker is gone
    pub fn send(&self, event: TelemetryEvent) {
        if self.tx.send(Message::Event(event)).is_err() {
            tracing::debug!("Telemetry worker stopped, event dropped");
        }
    }
}

/// Owner of the background worker
pub struct TelemetryClient {
    sender: TelemetrySender,
    worker: JoinHandle<()>,
}

impl TelemetryClient {
    /// Spawn the worker on the current tokio runtime
    ///
    /// Without an endpoint, events are accepted and only logged at debug level.
    pub fn start(endpoint: Option<Url>) -> Self {
        match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
            Ok(http) => Self::start_with_client(endpoint, http),
            Err(e) => {
                tracing::debug!(error = %e, "HTTP client unavailable, telemetry events will be dropped");
                Self::start_with_client(None, reqwest::Client::new())
            }
        }
    }

    pub fn start_with_client(endpoint: Option<Url>, http: reqwest::Client) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let session_id = uuid::Uuid::new_v4().to_string();
        let worker = tokio::spawn(run_worker(rx, endpoint, http));

        Self {
            sender: TelemetrySender { tx, session_id },
            worker,
        }
    }

    pub fn sender(&self) -> TelemetrySender {
        self.sender.clone()
    }

    /// Let the worker drain for at most [`SHUTDOWN_GRACE`], then abandon it
    pub async fn shutdown(self) {
        self.shutdown_with_grace(SHUTDOWN_GRACE).await;
    }

    pub async fn shutdown_with_grace(self, grace: Duration) {
        let _ = self.sender.tx.send(Message::Shutdown);
        let mut worker = self.worker;

        if tokio::time::timeout(grace, &mut worker).await.is_err() {
            tracing::debug!(grace_ms = grace.as_millis() as u64, "Telemetry worker abandoned");
            worker.abort();
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Message>,
    endpoint: Option<Url>,
    client: reqwest::Client,
) {
    while let Some(message) = rx.recv().await {
        let event = match message {
            Message::Event(event) => event,
            Message::Shutdown => break,
        };

        let Some(endpoint) = endpoint.as_ref() else {
            tracing::debug!(command = %event.command, "No telemetry endpoint configured, event dropped");
            continue;
        };

        match client.post(endpoint.clone()).json(&event).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(command = %event.command, "Telemetry event delivered");
            }
            Ok(response) => {
                tracing::debug!(status = response.status().as_u16(), "Telemetry collector rejected event");
            }
            Err(e) => {
                tracing::debug!(error = %e, "Telemetry delivery failed");
            }
        }
    }
}
