//! Error types for the agent.

use thiserror::Error;

/// Library-level error type for agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input or missing required configuration.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A collaborator could not be reached or answered with a non-2xx status.
    #[error("Network error: {0}")]
    Network(String),

    /// The model collaborator returned an error or retries were exhausted.
    #[error("Model error: {0}")]
    Upstream(String),

    /// Remote file deletion failed. Never fatal.
    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl AgentError {
    /// Build a network error for a failed request against `url`.
    pub fn network(url: &str, detail: impl std::fmt::Display) -> Self {
        AgentError::Network(format!("{}: {}", url, detail))
    }
}

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
