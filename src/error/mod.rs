//! Error types for dispatch, registration, and the API transport.
//!
//! Absence of a JSON field is never an error here - lazy queries degrade to
//! absent views (see [`crate::json`]). Only unresolvable dispatch and
//! registration-time misuse surface as [`Error`]; transport problems are
//! [`ApiError`] and are retried locally by the polling loop.

use thiserror::Error as ThisError;

/// Crate-level error.
#[derive(Debug, ThisError)]
pub enum Error {
    /// No registered handler matched the update at any precedence tier.
    #[error("no handler found for update")]
    NoHandlerFound,

    /// A callback pattern failed to compile at registration time.
    #[error("invalid callback pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// An inbound payload was not valid JSON.
    #[error("malformed update payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure talking to the platform API.
#[derive(Debug, ThisError)]
pub enum ApiError {
    /// The HTTP round trip itself failed.
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with `ok: false`.
    #[error("telegram error {code}: {description}")]
    Telegram {
        code: i64,
        description: String,
        parameters: serde_json::Value,
    },

    /// A response body was executed without a `method` key.
    #[error("response body has no method")]
    MissingMethod,
}

pub type Result<T> = std::result::Result<T, Error>;
