//! Error types for the local client bridge.

use thiserror::Error;

/// Errors that can occur while talking to the local client API.
///
/// Transport- and discovery-level failures are normally absorbed by
/// [`ConnectionManager`](crate::connection::ConnectionManager) and surfaced as
/// [`LcuEvent::Error`](crate::event::LcuEvent::Error). Request-level failures are
/// returned to the caller, which can branch on [`LcuError::status`].
#[derive(Debug, Error)]
pub enum LcuError {
    /// No lockfile or running client process could be found.
    #[error("local client credentials not found")]
    CredentialsNotFound,

    /// The local client answered with a non-2xx status.
    #[error("local client returned HTTP {status}")]
    Http {
        /// HTTP status code of the response.
        status: u16,
        /// Raw response body, usually a JSON error document.
        body: String,
    },

    /// The HTTP request could not be performed (connection refused, timeout, ...).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Failed to send a frame through the event transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the event transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The event transport was already closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// The TLS connector could not be built.
    #[error("tls error: {0}")]
    Tls(String),

    /// The credentials produced a header value that is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Failed to serialize or deserialize a JSON payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an active connection.
    #[error("not connected to the local client")]
    NotConnected,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LcuError {
    /// HTTP status carried by this error, if it came from a REST response.
    pub fn status(&self) -> Option<u16> {
        match self {
            LcuError::Http { status, .. } => Some(*status),
            LcuError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// `true` for a 404, which session-dependent endpoints return when their
    /// precondition (e.g. being in champion select) does not hold.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// A specialized [`Result`] type for local client operations.
pub type Result<T> = std::result::Result<T, LcuError>;
