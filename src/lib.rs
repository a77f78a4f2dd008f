//! # lcu-link
//!
//! Async bridge to the local game client API.
//!
//! The client exposes an undocumented HTTPS + WebSocket control API on
//! `127.0.0.1`, guarded by Basic auth credentials it writes to a lockfile. This
//! crate discovers those credentials and is built from four components:
//!
//! - [`ConnectionManager`]: credential discovery, REST requests, event
//!   subscriptions, liveness checks and reconnects
//! - [`GameflowTracker`]: the match-lifecycle phase, champion lock-in, the
//!   queue id and ready-check auto-accept
//! - [`TeamCompositionTracker`]: the local team's composition and the
//!   checkpointed smart-apply trigger
//! - [`DraftAutomation`]: automated pick and ban from priority lists
//!
//! The three dependents talk only through the connection manager and their own
//! `tokio::sync::broadcast` channels. [`LcuRuntime`] wires them together.
//!
//! ## Features
//!
//! - **`transport-websocket`** (default): the [`WebSocketTransport`], the
//!   [`LcuConnector`] built on it and [`ConnectionManager::new`]. Without it,
//!   supply your own [`Connector`] through [`ConnectionManager::with_parts`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lcu_link::{ConnectionConfig, ConnectionManager, LcuRuntime, MemorySettings, RuntimeConfig};
//! use lcu_link::gameflow::GameflowEvent;
//!
//! # async fn run() {
//! let settings = Arc::new(MemorySettings::new().with("autoAcceptEnabled", true));
//! let connection = ConnectionManager::new(ConnectionConfig::new());
//! let (_runtime, mut channels) = LcuRuntime::start(connection, settings, RuntimeConfig::new());
//!
//! while let Ok(event) = channels.gameflow.recv().await {
//!     if let GameflowEvent::PhaseChanged { phase, previous } = event {
//!         println!("{previous} -> {phase}");
//!     }
//! }
//! # }
//! ```

pub mod connection;
pub mod connector;
pub mod credentials;
pub mod dedup;
pub mod draft;
pub mod error;
pub mod event;
pub mod gameflow;
pub mod http;
pub mod models;
pub mod protocol;
pub mod runtime;
pub mod settings;
pub mod team;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
#[cfg(feature = "transport-websocket")]
pub use connector::LcuConnector;
pub use connector::Connector;
pub use credentials::{CredentialSource, Credentials, LockfileLocator};
pub use draft::{DraftAutomation, DraftConfig, DraftEvent};
pub use error::{LcuError, Result};
pub use event::LcuEvent;
pub use gameflow::{GameflowConfig, GameflowEvent, GameflowTracker};
pub use http::{LcuHttpClient, RequestChannel};
pub use models::{ChampSelectSession, GameflowPhase};
pub use runtime::{LcuRuntime, RuntimeChannels, RuntimeConfig};
pub use settings::{MemorySettings, SettingsStore};
pub use team::{TeamComposition, TeamCompositionTracker, TeamConfig, TeamEvent};
pub use transport::Transport;
#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
