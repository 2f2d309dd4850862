//! # Errors
//!
//! Hard failures raised while configuring, dispatching or decoding a request.
//!
//! Assertion failures are deliberately absent here: they are reported through
//! [`crate::assertions::Reporter`] and never unwind on their own.

use std::time::Duration;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request cannot be materialized from its configuration
    #[error("invalid request configuration: {0}")]
    InvalidRequestConfiguration(String),

    /// `authorize` was called without a token or a username/password pair
    #[error("missing credentials: provide a token or both username and password")]
    MissingCredentials,

    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },

    /// The value passed to `query` does not flatten into key/value pairs
    #[error("invalid query parameters: {0}")]
    InvalidQuery(String),

    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The per-request timeout elapsed before the response headers arrived
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    /// The caller's ambient cancellation fired first
    #[error("request was cancelled")]
    Cancelled,

    /// The response was already taken by an earlier check
    #[error("response was already consumed")]
    ResponseConsumed,

    #[error("failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),

    #[error("failed to deserialize the response content into {type_name}: {source}")]
    Deserialize {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to deserialize the response content into {type_name}: body was empty or null")]
    EmptyBody { type_name: &'static str },
}

impl Error {
    /// True for failures caused by the request configuration rather than the network
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequestConfiguration(_)
                | Error::MissingCredentials
                | Error::InvalidHeader { .. }
                | Error::InvalidQuery(_)
                | Error::Serialize(_)
        )
    }

    /// True when the request was abandoned by a timeout or a cancellation signal
    pub fn is_timeout_or_cancelled(&self) -> bool {
        matches!(self, Error::TimedOut(_) | Error::Cancelled)
    }
}
