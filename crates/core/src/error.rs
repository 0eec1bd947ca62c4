//! Unified error types for hypernews.
//!
//! Display strings follow the `CODE: detail` form so that MCP clients can
//! match on the prefix.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the hypernews workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty question).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Partition store operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Network failure or non-success HTTP answer.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// The backend refused a paid call (HTTP 402).
    #[error("PAYMENT_REQUIRED: {0}")]
    PaymentRequired(String),

    /// The ledger balance does not cover the feature cost.
    #[error("INSUFFICIENT_TOKENS: {feature} costs {cost}, balance is {balance}")]
    InsufficientTokens { feature: String, cost: u64, balance: u64 },

    /// A shell asset could not be pre-cached; the version must not activate.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::InvalidUrl(_) => -32003,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::HttpError(_) => -32008,
            Error::PaymentRequired(_) => -32013,
            Error::InsufficientTokens { .. } => -32014,
            Error::InstallFailed(_) => -32015,
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
