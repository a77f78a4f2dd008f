//! Transport abstraction for the local client's event channel.
//!
//! The [`Transport`] trait is a bidirectional text-frame channel. The event
//! protocol uses JSON arrays (see [`protocol`](crate::protocol)); a transport
//! only moves complete frames and never interprets them.
//!
//! # Connection Setup
//!
//! Connection setup is NOT part of this trait. A
//! [`Connector`](crate::connector::Connector) turns [`Credentials`](crate::credentials::Credentials)
//! into a connected transport, which the
//! [`ConnectionManager`](crate::connection::ConnectionManager) then owns.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use lcu_link::error::LcuError;
//! use lcu_link::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, frame: String) -> Result<(), LcuError> {
//!         // Write one JSON frame
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, LcuError>> {
//!         // Read the next JSON frame; None once the connection is closed
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), LcuError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::LcuError;

/// A bidirectional text frame transport.
///
/// Each call to [`send`](Transport::send) transmits one complete frame and each
/// call to [`recv`](Transport::recv) returns one complete frame.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe: the socket task polls it
/// inside `tokio::select!` next to the outbound queue and the shutdown signal.
/// Channel-based implementations are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one frame.
    ///
    /// # Errors
    ///
    /// Returns [`LcuError::TransportSend`] if the frame could not be written, or
    /// [`LcuError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, frame: String) -> Result<(), LcuError>;

    /// Receive the next frame.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received (it may be blank)
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the connection was closed
    async fn recv(&mut self) -> Option<Result<String, LcuError>>;

    /// Close the connection. Must be idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails; resources are released anyway.
    async fn close(&mut self) -> Result<(), LcuError>;
}
