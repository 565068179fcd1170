// Error types for the resolution engine

use serde::Serialize;
use std::fmt;

/// Stable error taxonomy exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Malformed request or a URL the declared platform cannot handle
    InvalidInput,
    /// The extractor backend could not produce data
    UpstreamFailure,
    /// Anything unexpected inside the engine
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid input"),
            Self::UpstreamFailure => write!(f, "upstream failure"),
            Self::InternalError => write!(f, "internal error"),
        }
    }
}

/// The only error type that crosses the dispatcher boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ResolutionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ResolutionError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::UpstreamFailure,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InternalError,
            message: message.into(),
        }
    }
}

/// Adapter-level failures. Never returned to callers as-is.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractError {
    /// URL is not a recognizable link for the adapter's platform
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// yt-dlp binary could not be spawned
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Spawning or waiting on the subprocess failed
    #[error("Execution error: {0}")]
    Execution(String),

    /// Subprocess exited unsuccessfully
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// Output did not match the expected schema
    #[error("Parse error: {0}")]
    Parse(String),

    /// HTTP request to the metadata service failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Service answered but refused to serve the video
    #[error("Video unplayable: {0}")]
    Unplayable(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl ExtractError {
    /// Taxonomy bucket for this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::UpstreamFailure,
        }
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Http(format!("request timed out: {}", e));
        }
        Self::Http(e.to_string())
    }
}
