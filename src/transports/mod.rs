//! Transport implementations for the local client's event channel.
//!
//! | Feature                | Transport              |
//! |------------------------|------------------------|
//! | `transport-websocket`  | [`WebSocketTransport`] |
//!
//! # Example
//!
//! ```rust,ignore
//! # async fn example() -> Result<(), lcu_link::LcuError> {
//! use lcu_link::{Credentials, Transport, WebSocketTransport};
//!
//! let credentials = Credentials::new(52437, "token", "https");
//! let mut ws = WebSocketTransport::connect(&credentials).await?;
//! ws.send(r#"[5,"OnJsonApiEvent"]"#.to_string()).await?;
//!
//! if let Some(Ok(frame)) = ws.recv().await {
//!     println!("client said: {frame}");
//! }
//!
//! ws.close().await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "transport-websocket")]
pub mod websocket;

#[cfg(feature = "transport-websocket")]
pub use websocket::WebSocketTransport;
