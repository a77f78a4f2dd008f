//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! This module provides [`WebSocketTransport`], a [`Transport`] implementation
//! for the local client's event socket. The client serves `wss://` with a
//! self-signed certificate, so certificate and hostname validation are
//! disabled; every upgrade request carries the same Basic auth header as the
//! REST channel.
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature is enabled
//! (it is enabled by default).

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::Connector;

use crate::credentials::Credentials;
use crate::error::LcuError;
use crate::transport::Transport;

/// Type alias for the underlying WebSocket stream.
///
/// Made public so that callers can construct a [`WebSocketTransport`] from an
/// existing stream via [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] implementation backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method is cancel-safe. Dropping the future
/// returned by `recv` before it completes will not consume or lose any frames.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open the event socket described by `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`LcuError::InvalidHeader`] if the credentials cannot form an
    /// `Authorization` header, [`LcuError::Tls`] if the TLS connector cannot be
    /// built, and [`LcuError::Io`] if the upgrade fails. I/O error kinds are
    /// preserved; all other errors map to [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(credentials: &Credentials) -> Result<Self, LcuError> {
        let url = credentials.websocket_url();
        tracing::debug!(url = %url, "connecting to client event socket");

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| LcuError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
        let mut auth = HeaderValue::from_str(&credentials.basic_auth_header())
            .map_err(|e| LcuError::InvalidHeader(e.to_string()))?;
        auth.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, auth);

        let connector = if credentials.is_tls() {
            let tls = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| LcuError::Tls(e.to_string()))?;
            Connector::NativeTls(tls)
        } else {
            Connector::Plain
        };

        let (stream, _response) =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, Some(connector))
                .await
                .map_err(|e| {
                    let kind = match &e {
                        tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                        _ => std::io::ErrorKind::Other,
                    };
                    LcuError::Io(std::io::Error::new(kind, e))
                })?;

        tracing::info!(url = %url, "client event socket established");

        Ok(Self {
            stream,
            closed: false,
        })
    }

    /// Create a [`WebSocketTransport`] from an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    /// Like [`connect`](Self::connect), but fails with [`LcuError::Timeout`]
    /// if the socket is not open within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`LcuError::Timeout`] if the deadline elapses, or any error
    /// that [`connect`](Self::connect) may return.
    pub async fn connect_with_timeout(
        credentials: &Credentials,
        timeout: std::time::Duration,
    ) -> Result<Self, LcuError> {
        tokio::time::timeout(timeout, Self::connect(credentials))
            .await
            .map_err(|_| LcuError::Timeout)?
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: String) -> Result<(), LcuError> {
        if self.closed {
            return Err(LcuError::TransportClosed);
        }
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| LcuError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, LcuError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(LcuError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                // tungstenite queues the pong itself.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), LcuError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| LcuError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_port() {
        let credentials = Credentials::new(1, "pw", "http");
        let err = WebSocketTransport::connect(&credentials).await.unwrap_err();
        assert!(matches!(err, LcuError::Io(_)));
    }

    // ── Mock-stream helpers ──────────────────────────────────────────────

    /// Start a local plain WebSocket server that records the upgrade's
    /// `Authorization` header, then runs `handler` on the connection.
    async fn start_mock_server<F, Fut>(handler: F) -> (Credentials, oneshot::Receiver<Option<String>>)
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (auth_tx, auth_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let auth = req
                    .headers()
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let _ = auth_tx.send(auth);
                Ok(resp)
            };
            let ws = tokio_tungstenite::accept_hdr_async(tcp, callback)
                .await
                .unwrap();
            handler(ws).await;
        });

        (Credentials::new(port, "secret", "http"), auth_rx)
    }

    // ── Mock-stream tests ────────────────────────────────────────────────

    #[tokio::test]
    async fn upgrade_carries_basic_auth() {
        let (credentials, auth_rx) = start_mock_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let _transport = WebSocketTransport::connect(&credentials).await.unwrap();
        let auth = auth_rx.await.unwrap();
        assert_eq!(auth.as_deref(), Some("Basic cmlvdDpzZWNyZXQ="));
    }

    #[tokio::test]
    async fn recv_receives_text_frames_including_blank_ones() {
        let (credentials, _auth) = start_mock_server(|mut ws| async move {
            ws.send(Message::Text("".into())).await.unwrap();
            ws.send(Message::Text(r#"[8,"OnJsonApiEvent",{}]"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&credentials).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().unwrap(), "");
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"[8,"OnJsonApiEvent",{}]"#
        );
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let (credentials, _auth) = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text("after_binary".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&credentials).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, "after_binary");
    }

    #[tokio::test]
    async fn subscribe_frame_reaches_server() {
        let (credentials, _auth) = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&credentials).await.unwrap();
        transport
            .send(crate::protocol::subscribe_frame("OnJsonApiEvent"))
            .await
            .unwrap();
        let echoed = transport.recv().await.unwrap().unwrap();
        assert_eq!(echoed, r#"[5,"OnJsonApiEvent"]"#);
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let (credentials, _auth) =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&credentials).await.unwrap();
        transport.close().await.unwrap();
        // Second close is a no-op.
        transport.close().await.unwrap();

        let err = transport.send("oops".to_string()).await.unwrap_err();
        assert!(matches!(err, LcuError::TransportClosed));
    }

    #[tokio::test]
    async fn connect_with_timeout_times_out() {
        // Non-routable address guarantees the deadline is hit first.
        let mut credentials = Credentials::new(1, "pw", "http");
        credentials.host = "192.0.2.1".into();
        let err = WebSocketTransport::connect_with_timeout(
            &credentials,
            std::time::Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LcuError::Timeout));
    }
}
