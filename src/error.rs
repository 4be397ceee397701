/// Error types for the DataTable engine.

use thiserror::Error;

/// All errors surfaced by the engine.
///
/// Mutation operations never return `NotFound` to the caller; they log it and
/// leave the view untouched. The variant exists for the lookup helpers and the
/// sync replay report.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("no record found with id: {0}")]
    NotFound(String),

    #[error("identification is disabled")]
    IdentifyDisabled,

    #[error("sort unavailable for key '{0}'")]
    SortUnavailable(String),

    // Transport errors
    #[error("client error {status}: {message}")]
    TransportClient { status: u16, message: String },

    #[error("server error {status}: {message}")]
    TransportServer { status: u16, message: String },

    #[error("transient transport failure: {0}")]
    TransportTransient(String),

    // Configuration and input errors
    #[error("invalid filter pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
