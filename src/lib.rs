//! mycli - a multi-command terminal toolkit
//!
//! The crate is organized around a small core: JSON-backed preferences and a
//! profile-scoped credential vault, retry and timeout combinators, audit and
//! structured logs, and a dispatcher that routes argv to command handlers
//! through an explicit [`context::AppContext`].

pub mod commands;
pub mod config;
pub mod context;
pub mod credentials;
pub mod dispatch;
pub mod logging;
pub mod plugins;
pub mod telemetry;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use config::{AppPaths, Config, ConfigStore, Theme};
pub use context::{AppContext, GlobalOptions};
pub use credentials::{CredentialVault, Secret, SecretResolver};
pub use dispatch::{CliCommand, CommandRegistry, Dispatcher};
pub use utils::errors::{CliError, ConfigError};
pub use utils::resilience::{with_retry, with_timeout, OperationTimeout, RetryPolicy};

/// The main result type used throughout the application
pub type Result<T> = std::result::Result<T, CliError>;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "mycli";
