//! REST side of the local client API.
//!
//! [`RequestChannel`] is the seam the [`ConnectionManager`](crate::connection::ConnectionManager)
//! issues point requests through. [`LcuHttpClient`] is the production
//! implementation on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use tracing::trace;

use crate::credentials::Credentials;
use crate::error::{LcuError, Result};

/// An authenticated request/response channel to the local client.
///
/// Implementations resolve `path` against the client's base URL and return the
/// decoded JSON body. An empty body decodes to [`Value::Null`]; a non-2xx
/// status is returned as [`LcuError::Http`].
#[async_trait]
pub trait RequestChannel: Send + Sync + 'static {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value>;
}

/// `reqwest`-backed [`RequestChannel`].
///
/// Certificate validation is disabled: the local client always presents a
/// self-signed certificate for `127.0.0.1`.
#[derive(Debug, Clone)]
pub struct LcuHttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl LcuHttpClient {
    /// Build a client that authenticates every request with `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`LcuError::InvalidHeader`] if the credentials cannot form an
    /// `Authorization` header and [`LcuError::Request`] if the TLS backend
    /// fails to initialize.
    pub fn new(credentials: &Credentials, timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&credentials.basic_auth_header())
            .map_err(|e| LcuError::InvalidHeader(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: credentials.base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RequestChannel for LcuHttpClient {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        trace!(%method, %url, "client request");

        let mut builder = self.client.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(LcuError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve exactly one HTTP/1.1 exchange and hand back the raw request text.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (Credentials, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (request_tx, request_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }
            let _ = request_tx.send(String::from_utf8_lossy(&raw).to_string());

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        (Credentials::new(port, "secret", "http"), request_rx)
    }

    fn client(credentials: &Credentials) -> LcuHttpClient {
        LcuHttpClient::new(credentials, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn json_body_is_decoded_and_auth_is_sent() {
        let (credentials, request_rx) = serve_once("200 OK", r#""ChampSelect""#).await;
        let value = client(&credentials)
            .request(Method::GET, "/lol-gameflow/v1/gameflow-phase", None)
            .await
            .unwrap();
        assert_eq!(value, json!("ChampSelect"));

        let request = request_rx.await.unwrap();
        assert!(request.starts_with("GET /lol-gameflow/v1/gameflow-phase HTTP/1.1"));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: basic cmlvdDpzZWNyZXQ="));
    }

    #[tokio::test]
    async fn non_success_status_is_tagged() {
        let (credentials, _request) = serve_once(
            "404 Not Found",
            r#"{"errorCode":"RPC_ERROR","httpStatus":404,"message":"No active delegate"}"#,
        )
        .await;
        let err = client(&credentials)
            .request(Method::GET, "/lol-champ-select/v1/session", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        match err {
            LcuError::Http { body, .. } => assert!(body.contains("No active delegate")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_body_is_null() {
        let (credentials, request_rx) = serve_once("204 No Content", "").await;
        let value = client(&credentials)
            .request(Method::POST, "/lol-matchmaking/v1/ready-check/accept", None)
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
        assert!(request_rx
            .await
            .unwrap()
            .starts_with("POST /lol-matchmaking/v1/ready-check/accept"));
    }

    #[tokio::test]
    async fn patch_body_is_sent_as_json() {
        let (credentials, request_rx) = serve_once("204 No Content", "").await;
        let body = json!({ "championId": 157, "completed": true });
        client(&credentials)
            .request(Method::PATCH, "/lol-champ-select/v1/session/actions/4", Some(&body))
            .await
            .unwrap();

        let request = request_rx.await.unwrap();
        let (_, sent_body) = request.split_once("\r\n\r\n").unwrap();
        let sent: Value = serde_json::from_str(sent_body).unwrap();
        assert_eq!(sent, body);
    }

    #[tokio::test]
    async fn unreachable_client_is_a_request_error() {
        let credentials = Credentials::new(1, "secret", "http");
        let err = client(&credentials)
            .request(Method::GET, "/riotclient/region-locale", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LcuError::Request(_)));
        assert_eq!(err.status(), None);
    }
}
