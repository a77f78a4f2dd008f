//! Opening the two channels that make up a connection.

use std::sync::Arc;
#[cfg(feature = "transport-websocket")]
use std::time::Duration;

use async_trait::async_trait;

use crate::credentials::Credentials;
use crate::error::Result;
use crate::http::RequestChannel;
use crate::transport::Transport;

/// Turns a set of [`Credentials`] into a request channel and an event transport.
///
/// The [`ConnectionManager`](crate::connection::ConnectionManager) calls
/// [`open_requests`](Connector::open_requests) first, verifies it with a health
/// check, and only then calls [`open_events`](Connector::open_events).
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open_requests(&self, credentials: &Credentials) -> Result<Arc<dyn RequestChannel>>;

    async fn open_events(&self, credentials: &Credentials) -> Result<Box<dyn Transport>>;
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn send(&mut self, frame: String) -> Result<()> {
        (**self).send(frame).await
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        (**self).recv().await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

/// Default [`Connector`]: `reqwest` for requests, a WebSocket for events.
#[cfg(feature = "transport-websocket")]
#[derive(Debug, Clone)]
pub struct LcuConnector {
    request_timeout: Duration,
    connect_timeout: Duration,
}

#[cfg(feature = "transport-websocket")]
impl LcuConnector {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            request_timeout,
            connect_timeout,
        }
    }
}

#[cfg(feature = "transport-websocket")]
#[async_trait]
impl Connector for LcuConnector {
    async fn open_requests(&self, credentials: &Credentials) -> Result<Arc<dyn RequestChannel>> {
        let client = crate::http::LcuHttpClient::new(credentials, self.request_timeout)?;
        Ok(Arc::new(client))
    }

    async fn open_events(&self, credentials: &Credentials) -> Result<Box<dyn Transport>> {
        let transport = crate::transports::WebSocketTransport::connect_with_timeout(
            credentials,
            self.connect_timeout,
        )
        .await?;
        Ok(Box::new(transport))
    }
}
