//! Error types for the TownPass bridge.

use thiserror::Error;

use crate::transport::Transport;

/// Message stored in the auth state when no transport answered in time.
pub const TIMEOUT_MESSAGE: &str = "TownPass authentication timeout";

/// Failure of a public bridge operation.
///
/// The `Display` output of each variant is exactly what ends up in
/// [`AuthState::error`](crate::AuthState::error).
#[derive(Error, Debug)]
pub enum BridgeError {
    /// No transport delivered an identity before the deadline
    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    /// The session was torn down by `reset()` or a newer `request_user()`
    #[error("TownPass resolution cancelled")]
    Cancelled,

    /// The backend answered with a non-2xx status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Network-level failure talking to the backend
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered 2xx but the body was not JSON
    #[error("{0}")]
    Decode(String),

    /// The configured endpoint cannot be turned into an absolute URL
    #[error("Invalid auth endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// A host primitive could not be used.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    /// The transport is not exposed by this host
    #[error("{0} is not available")]
    Unavailable(Transport),

    /// The transport has no inbound side to listen on
    #[error("{0} does not deliver replies")]
    NotListenable(Transport),

    /// The host threw while the primitive was exercised
    #[error("{transport} failed: {message}")]
    Script { transport: Transport, message: String },
}

/// An inbound payload that does not carry a usable identity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("identity has no id")]
    MissingId,

    #[error("identity id is not a non-empty string")]
    InvalidId,

    #[error("payload is not valid JSON: {0}")]
    Json(String),

    /// Well-formed message that is not an identity reply (other app traffic)
    #[error("message is not an identity reply")]
    Unrelated,

    /// Envelope matched but carried no identity
    #[error("reply carried no identity")]
    Empty,

    #[error("{0} does not deliver replies")]
    NoInbound(Transport),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Json(err.to_string())
    }
}
