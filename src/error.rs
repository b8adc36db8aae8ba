//! Error kinds for each stage of the agent
//!
//! Collection, delivery and export errors are contained by the stage that
//! produced them and only ever logged. Configuration and agent state errors
//! surface to the process boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating the agent configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while reading a single metric category
#[derive(Debug, Error, PartialEq)]
pub enum CollectError {
    #[error("no CPUs reported by the operating system")]
    NoCpus,

    #[error("CPU usage sample is not a number")]
    InvalidCpuSample,

    #[error("total memory reported as zero")]
    MemoryUnavailable,

    #[error("no filesystem mounted at {0}")]
    MountNotFound(String),

    #[error("filesystem at {0} reports zero capacity")]
    EmptyFilesystem(String),
}

/// Errors raised while delivering an alert to the webhook
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("webhook request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("webhook responded with status {0}")]
    Status(reqwest::StatusCode),
}

/// Errors raised by a metrics exporter
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize metrics: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised by the agent lifecycle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("agent is already running")]
    AlreadyRunning,
}
