//! Error types
//!
//! Every transport-facing operation reports failure as a [`ToolError`] value.
//! Startup misconfiguration is the only fatal path and uses [`ConfigError`].

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Classification of a failed tool dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The subprocess executable could not be located or spawned
    TransportUnavailable,
    /// The initialize exchange with the subprocess did not complete
    HandshakeFailure,
    /// Operation attempted outside its legal session state
    InvalidState,
    /// Tool name not present in the discovered set
    UnknownTool,
    /// HTTP transport error (connection, timeout, unparsable body)
    NetworkFailure,
    /// The subprocess returned unusable data or the pipe broke
    MalformedResponse,
    /// No reply from the subprocess within the configured bound
    Timeout,
    /// The interpreter produced no structured request
    InterpretationFailed,
    /// The structured request carried no tool name
    MissingToolName,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransportUnavailable => "transport_unavailable",
            Self::HandshakeFailure => "handshake_failure",
            Self::InvalidState => "invalid_state",
            Self::UnknownTool => "unknown_tool",
            Self::NetworkFailure => "network_failure",
            Self::MalformedResponse => "malformed_response",
            Self::Timeout => "timeout",
            Self::InterpretationFailed => "interpretation_failed",
            Self::MissingToolName => "missing_tool_name",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed dispatch failure
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportUnavailable, message)
    }

    pub fn handshake(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HandshakeFailure, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownTool,
            format!("Tool '{}' not found on stdio server", name),
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkFailure, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, message)
    }
}

/// Outcome of exactly one transport call
pub type ToolResult = Result<Value, ToolError>;

/// Render a result the way it is printed and written to the transcript
pub fn result_to_value(result: &ToolResult) -> Value {
    match result {
        Ok(output) => output.clone(),
        Err(e) => serde_json::json!({ "error": e }),
    }
}

/// Fatal startup errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid sandbox root {path}: {reason}")]
    SandboxRoot { path: PathBuf, reason: String },

    #[error("Invalid routing keywords: {0}")]
    Keywords(#[from] regex::Error),

    #[error("Invalid HTTP endpoint '{0}'")]
    Endpoint(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
