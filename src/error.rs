//! Error types for legmap-dl
//!
//! This module provides the error taxonomy for an export run:
//! - Remote failures (non-success status, transport, malformed body)
//! - Missing data (absent or empty schedule / leg structure)
//! - Input validation and user cancellation
//! - Output failures (CSV serialization, I/O)

use thiserror::Error;

/// Result type alias for legmap-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for legmap-dl
///
/// Per-flight and per-leg failures are isolated by the pipeline and only show up
/// in logs and events. A value of this type escapes [`crate::LegMapExporter::export`]
/// only for input validation or a genuinely unexpected failure.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote service answered with a non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Network {
        /// HTTP status code returned by the service
        status: u16,
        /// Response body text (may be empty)
        body: String,
    },

    /// The request never produced a response (connect failure, timeout, ...)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not valid JSON
    #[error("malformed response from {context}: {source}")]
    Decode {
        /// The endpoint or lookup that produced the body
        context: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Schedule or leg structure absent or empty
    #[error("missing data: {0}")]
    MissingData(String),

    /// The user declined to start the run (no date range chosen)
    #[error("export cancelled")]
    Cancelled,

    /// Invalid caller input (no flights, inverted date range, bad date text)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// Endpoint URL could not be built
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Network { .. } => "network_error",
            Error::Transport(_) => "transport_error",
            Error::Decode { .. } => "decode_error",
            Error::MissingData(_) => "missing_data",
            Error::Cancelled => "cancelled",
            Error::InvalidInput(_) => "invalid_input",
            Error::Config { .. } => "config_error",
            Error::Url(_) => "invalid_url",
            Error::Csv(_) => "csv_error",
            Error::Io(_) => "io_error",
            Error::Other(_) => "internal_error",
        }
    }

    /// True for failures caused by the remote service (status, transport, body)
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::Network { .. } | Error::Transport(_) | Error::Decode { .. }
        )
    }

    /// True when a lookup succeeded but carried no usable data
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Error::MissingData(_))
    }

    /// HTTP status carried by a [`Error::Network`] failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Network { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
