#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for lcu-link integration tests.
//!
//! [`MockLcu`] plays the local client: it is both the [`Connector`] and the
//! [`RequestChannel`], answers REST calls from a scripted route table, and
//! hands out channel-backed [`MockSocket`]s whose inbound frames the test
//! pushes explicitly.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use lcu_link::connection::{ConnectionConfig, ConnectionManager};
use lcu_link::credentials::{CredentialSource, Credentials};
use lcu_link::http::RequestChannel;
use lcu_link::models::{Action, ActionKind, ChampSelectSession, TeamMember, Timer};
use lcu_link::protocol::HEALTH_CHECK_PATH;
use lcu_link::{Connector, LcuError, Transport};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};

pub const TEST_PORT: u16 = 54321;

// ── Scripted REST ───────────────────────────────────────────────────

/// A scripted REST answer.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
}

/// One REST call seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

// ── MockSocket ──────────────────────────────────────────────────────

enum Inbound {
    Frame(String),
    Hangup,
}

struct SocketHandle {
    inbound: mpsc::UnboundedSender<Inbound>,
    closed: Arc<AtomicBool>,
}

/// Channel-backed event socket. `recv` is cancel-safe because it only awaits
/// an mpsc receiver.
pub struct MockSocket {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockSocket {
    async fn send(&mut self, frame: String) -> Result<(), LcuError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LcuError::TransportClosed);
        }
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, LcuError>> {
        match self.inbound.recv().await {
            Some(Inbound::Frame(text)) => Some(Ok(text)),
            Some(Inbound::Hangup) | None => None,
        }
    }

    async fn close(&mut self) -> Result<(), LcuError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// ── MockLcu ─────────────────────────────────────────────────────────

#[derive(Default)]
struct MockState {
    routes: StdMutex<HashMap<(Method, String), Reply>>,
    calls: StdMutex<Vec<Call>>,
    sent: Arc<StdMutex<Vec<String>>>,
    sockets: StdMutex<Vec<SocketHandle>>,
    unhealthy: AtomicBool,
    events_delay: StdMutex<Option<Duration>>,
}

/// A scripted local client. Cloning shares the script and the recordings.
#[derive(Clone, Default)]
pub struct MockLcu {
    state: Arc<MockState>,
}

impl MockLcu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with `reply` from now on.
    pub fn route(&self, method: Method, path: &str, reply: Reply) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), reply);
    }

    pub fn route_json(&self, method: Method, path: &str, value: Value) {
        self.route(method, path, Reply::Json(value));
    }

    /// The health check answers 503 while unhealthy.
    pub fn set_healthy(&self, healthy: bool) {
        self.state.unhealthy.store(!healthy, Ordering::Release);
    }

    /// Delay before each event socket opens.
    pub fn set_events_delay(&self, delay: Duration) {
        *self.state.events_delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, method: Method, path: &str) -> usize {
        self.state
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    /// Bodies of every `method path` call, in order.
    pub fn bodies(&self, method: Method, path: &str) -> Vec<Value> {
        self.state
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .filter_map(|call| call.body.clone())
            .collect()
    }

    /// Frames written to any socket.
    pub fn sent_frames(&self) -> Vec<String> {
        self.state.sent.lock().unwrap().clone()
    }

    pub fn has_sent(&self, frame: &str) -> bool {
        self.sent_frames().iter().any(|sent| sent == frame)
    }

    pub fn socket_count(&self) -> usize {
        self.state.sockets.lock().unwrap().len()
    }

    pub fn socket_closed(&self, index: usize) -> bool {
        self.state.sockets.lock().unwrap()[index]
            .closed
            .load(Ordering::Acquire)
    }

    /// Push a raw text frame to the newest socket.
    pub fn push_raw(&self, text: &str) {
        let sockets = self.state.sockets.lock().unwrap();
        let socket = sockets.last().expect("no socket open");
        let _ = socket.inbound.send(Inbound::Frame(text.to_string()));
    }

    /// Push an `OnJsonApiEvent` frame for `uri` to the newest socket.
    pub fn push_event(&self, uri: &str, event_type: &str, data: Value) {
        self.push_raw(&event_frame(uri, event_type, data));
    }

    /// Make the newest socket report that the client closed it.
    pub fn hang_up(&self) {
        let sockets = self.state.sockets.lock().unwrap();
        let socket = sockets.last().expect("no socket open");
        let _ = socket.inbound.send(Inbound::Hangup);
    }

    fn answer(&self, method: &Method, path: &str) -> Reply {
        if let Some(reply) = self
            .state
            .routes
            .lock()
            .unwrap()
            .get(&(method.clone(), path.to_string()))
        {
            return reply.clone();
        }
        if *method == Method::GET && path == HEALTH_CHECK_PATH {
            if self.state.unhealthy.load(Ordering::Acquire) {
                return Reply::Status(503);
            }
            return Reply::Json(json!({ "locale": "en_US", "region": "EUW" }));
        }
        Reply::Status(404)
    }
}

#[async_trait]
impl RequestChannel for MockLcu {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, LcuError> {
        self.state.calls.lock().unwrap().push(Call {
            method: method.clone(),
            path: path.to_string(),
            body: body.cloned(),
        });
        match self.answer(&method, path) {
            Reply::Json(value) => Ok(value),
            Reply::Status(status) => Err(LcuError::Http {
                status,
                body: String::new(),
            }),
        }
    }
}

#[async_trait]
impl Connector for MockLcu {
    async fn open_requests(
        &self,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn RequestChannel>, LcuError> {
        Ok(Arc::new(self.clone()))
    }

    async fn open_events(
        &self,
        _credentials: &Credentials,
    ) -> Result<Box<dyn Transport>, LcuError> {
        let delay = *self.state.events_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        self.state.sockets.lock().unwrap().push(SocketHandle {
            inbound: tx,
            closed: Arc::clone(&closed),
        });
        Ok(Box::new(MockSocket {
            inbound: rx,
            sent: Arc::clone(&self.state.sent),
            closed,
        }))
    }
}

// ── Credential sources ──────────────────────────────────────────────

pub fn test_credentials() -> Credentials {
    Credentials::new(TEST_PORT, "secret", "https")
}

/// No client installed and none running.
pub struct NoCredentials;

#[async_trait]
impl CredentialSource for NoCredentials {
    async fn locate(&self) -> Option<Credentials> {
        None
    }
}

/// Finds credentials only once the test flips `available`.
#[derive(Clone, Default)]
pub struct ToggleCredentials {
    pub available: Arc<AtomicBool>,
}

#[async_trait]
impl CredentialSource for ToggleCredentials {
    async fn locate(&self) -> Option<Credentials> {
        self.available
            .load(Ordering::Acquire)
            .then(test_credentials)
    }
}

// ── Builders ────────────────────────────────────────────────────────

pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::new()
        .with_fallback_lockfiles(Vec::new())
        .with_process_scan(false)
}

pub fn manager(mock: &MockLcu) -> ConnectionManager {
    ConnectionManager::with_parts(test_config(), test_credentials(), mock.clone())
}

/// `[8, "OnJsonApiEvent", {uri, eventType, data}]`
pub fn event_frame(uri: &str, event_type: &str, data: Value) -> String {
    json!([8, "OnJsonApiEvent", { "uri": uri, "eventType": event_type, "data": data }]).to_string()
}

pub fn member(cell_id: i64, champion_id: i64) -> TeamMember {
    TeamMember {
        cell_id,
        champion_id,
        champion_pick_intent: 0,
    }
}

pub fn action(id: i64, actor: i64, kind: ActionKind, champion_id: i64, completed: bool) -> Action {
    Action {
        id,
        actor_cell_id: actor,
        kind,
        champion_id,
        completed,
        is_in_progress: !completed,
    }
}

/// A session where the local player (cell 0) hovers or has locked `champion_id`.
pub fn local_pick_session(champion_id: i64, completed: bool) -> ChampSelectSession {
    ChampSelectSession {
        local_player_cell_id: 0,
        my_team: vec![member(0, champion_id), member(1, 0)],
        actions: vec![vec![action(1, 0, ActionKind::Pick, champion_id, completed)]],
        timer: Timer {
            phase: "BAN_PICK".into(),
            time_left_ms: 25_000,
        },
        ..ChampSelectSession::default()
    }
}

pub fn to_json(session: &ChampSelectSession) -> Value {
    serde_json::to_value(session).unwrap()
}

// ── Waiting ─────────────────────────────────────────────────────────

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Receive until `pred` matches, skipping everything else.
pub async fn next_matching<T, F>(rx: &mut broadcast::Receiver<T>, pred: F) -> T
where
    T: Clone + std::fmt::Debug,
    F: Fn(&T) -> bool,
{
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Everything already queued on `rx`.
pub fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Poll `cond` until it holds.
pub async fn wait_until<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(60), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached");
}

/// Run `fut` to completion under a generous deadline.
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(60), fut)
        .await
        .expect("future did not complete")
}
