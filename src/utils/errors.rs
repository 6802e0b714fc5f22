//! Error types used throughout the application

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a successful run
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for a handler or runtime failure
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for an unknown command or invalid arguments
pub const EXIT_USAGE: i32 = 2;

/// Main error type for mycli
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Usage error: {message}")]
    Usage { message: String },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Interactive prompt '{prompt}' is disabled in CI mode")]
    InteractiveDisabled { prompt: String },

    #[error("{program} exited with status {}: {stderr}", display_code(.code))]
    Process {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("File system error: {path}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Resource already exists: {resource}")]
    AlreadyExists { resource: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Prompt error: {message}")]
    Prompt { message: String },

    #[error("Command panicked: {message}")]
    Panicked { message: String },

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration must be a JSON object")]
    NotAnObject,

    #[error("Home directory could not be determined")]
    NoHomeDirectory,

    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

impl CliError {
    /// Create a new usage error
    pub fn usage<S: Into<String>>(message: S) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new CI-mode prompt rejection
    pub fn interactive_disabled<S: Into<String>>(prompt: S) -> Self {
        Self::InteractiveDisabled {
            prompt: prompt.into(),
        }
    }

    /// Create a new subprocess failure
    pub fn process<S1: Into<String>, S2: Into<String>>(
        program: S1,
        code: Option<i32>,
        stderr: S2,
    ) -> Self {
        Self::Process {
            program: program.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Create a new file system error
    pub fn file_system<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// Create a new not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a new already exists error
    pub fn already_exists<S: Into<String>>(resource: S) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Create a new prompt error
    pub fn prompt<S: Into<String>>(message: S) -> Self {
        Self::Prompt {
            message: message.into(),
        }
    }

    /// Create a new unknown error
    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    ///
    /// Usage problems map to 2 so scripts can tell them apart from a command
    /// that ran and failed (1).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. } => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    /// Get error category for logging and JSON output
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Usage { .. } => "usage",
            Self::Authentication { .. } => "auth",
            Self::Validation { .. } => "validation",
            Self::InteractiveDisabled { .. } => "interactive",
            Self::Process { .. } => "process",
            Self::FileSystem { .. } => "filesystem",
            Self::NotFound { .. } => "notfound",
            Self::AlreadyExists { .. } => "exists",
            Self::Timeout { .. } => "timeout",
            Self::Prompt { .. } => "prompt",
            Self::Panicked { .. } => "panic",
            Self::Json(_) => "json",
            Self::Http(_) => "http",
            Self::Io(_) => "io",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// Full source chain, outermost first
    pub fn chain(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        chain
    }
}

impl From<crate::utils::resilience::OperationTimeout> for CliError {
    fn from(timeout: crate::utils::resilience::OperationTimeout) -> Self {
        Self::timeout(timeout.duration_ms)
    }
}

impl From<inquire::InquireError> for CliError {
    fn from(error: inquire::InquireError) -> Self {
        CliError::prompt(format!("User input error: {}", error))
    }
}
