//! Connection supervision for the local client API.
//!
//! [`ConnectionManager`] is a cheap, cloneable handle. It owns the only REST
//! channel and the only event socket; every other component goes through it.
//! Each successful handshake produces a *session* with its own socket task and
//! liveness task. Sessions never outlive the manager: background tasks hold
//! weak references and the last handle to drop tears everything down.
//!
//! ```rust,ignore
//! let manager = ConnectionManager::new(ConnectionConfig::new());
//! let mut events = manager.events();
//! manager.start_auto_connect(Duration::from_secs(5));
//!
//! while let Ok(event) = events.recv().await {
//!     if let LcuEvent::Connected = event {
//!         manager.subscribe("OnJsonApiEvent_lol-gameflow_v1_gameflow-phase");
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::connector::Connector;
use crate::credentials::{default_fallback_lockfiles, CredentialSource, Credentials};
use crate::error::{LcuError, Result};
use crate::event::LcuEvent;
use crate::http::RequestChannel;
use crate::protocol::{decode_frame, subscribe_frame, unsubscribe_frame, HEALTH_CHECK_PATH};
use crate::transport::Transport;

const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`ConnectionManager`].
///
/// ```
/// use lcu_link::connection::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new()
///     .with_install_dir("D:/Games/League of Legends")
///     .with_liveness_interval(Duration::from_secs(10))
///     .with_event_channel_capacity(0);
/// assert_eq!(config.event_channel_capacity, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Game install directory; `<dir>/lockfile` is tried first.
    pub install_dir: Option<PathBuf>,
    /// Lockfiles tried after the install directory, in order.
    pub fallback_lockfiles: Vec<PathBuf>,
    /// Read the client's command line when no lockfile is found.
    pub scan_process: bool,
    /// Cadence of the health check while connected. Defaults to **3 seconds**.
    pub liveness_interval: Duration,
    /// Delay before the single reconnect attempt after a lost connection.
    /// Defaults to **5 seconds**.
    pub reconnect_delay: Duration,
    /// Timeout applied to every REST request. Defaults to **5 seconds**.
    pub request_timeout: Duration,
    /// Timeout for opening the event socket. Defaults to **5 seconds**.
    pub connect_timeout: Duration,
    /// Capacity of the event broadcast channel. Slow receivers observe
    /// `Lagged` instead of blocking the socket task.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Time the socket task is given to close the socket gracefully.
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self {
            install_dir: None,
            fallback_lockfiles: default_fallback_lockfiles(),
            scan_process: true,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_fallback_lockfiles(mut self, paths: Vec<PathBuf>) -> Self {
        self.fallback_lockfiles = paths;
        self
    }

    #[must_use]
    pub fn with_process_scan(mut self, scan: bool) -> Self {
        self.scan_process = scan;
        self
    }

    /// Zero is clamped to one millisecond.
    #[must_use]
    pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// No session is open and at least one attempt is in flight.
    Connecting,
    Connected,
}

// ── Shared state ────────────────────────────────────────────────────

/// Whether a failed attempt is reported as [`LcuEvent::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reporting {
    Loud,
    /// Auto-connect: the client is usually just not running yet.
    Quiet,
}

/// Channels produced by a successful handshake, before they are installed.
struct OpenedSession {
    credentials: Credentials,
    requests: Arc<dyn RequestChannel>,
    transport: Box<dyn Transport>,
}

/// One live connection. Replaced wholesale by the next handshake.
struct ActiveSession {
    id: u64,
    credentials: Credentials,
    requests: Arc<dyn RequestChannel>,
    outbound: mpsc::UnboundedSender<String>,
    shutdown: Option<oneshot::Sender<()>>,
    liveness_task: JoinHandle<()>,
    subscriptions: HashSet<String>,
}

impl ActiveSession {
    /// Stop the liveness task and ask the socket task to close the socket.
    fn close(mut self) {
        self.liveness_task.abort();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Default)]
struct Link {
    session: Option<ActiveSession>,
}

struct Inner {
    config: ConnectionConfig,
    source: Box<dyn CredentialSource>,
    connector: Box<dyn Connector>,
    link: Mutex<Link>,
    /// Attempts between credential lookup and install.
    pending: AtomicUsize,
    next_session_id: AtomicU64,
    /// Bumped by every explicit disconnect; attempts started under an older
    /// epoch are discarded when they resolve.
    epoch: AtomicU64,
    events: broadcast::Sender<LcuEvent>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn lock_link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_supervisor(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.supervisor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: LcuEvent) {
        emit_event(&self.events, event);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let supervisor = self
            .supervisor
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = supervisor.take() {
            task.abort();
        }
        let link = self.link.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = link.session.take() {
            session.close();
        }
    }
}

/// Decrements the pending-attempt counter even if the attempt is cancelled.
struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

// ── Manager handle ──────────────────────────────────────────────────

/// Owner of the connection to the local client.
///
/// Discovery, handshake and transport failures never escape: [`connect`](Self::connect)
/// returns `false` and the failure is published as [`LcuEvent::Error`].
/// Request failures are returned from [`request`](Self::request) so callers can
/// branch on the HTTP status.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Manager that discovers credentials on disk or from the running process
    /// and connects over `reqwest` and a WebSocket.
    #[cfg(feature = "transport-websocket")]
    pub fn new(config: ConnectionConfig) -> Self {
        let source = crate::credentials::LockfileLocator::new(
            config.install_dir.clone(),
            config.fallback_lockfiles.clone(),
            config.scan_process,
        );
        let connector =
            crate::connector::LcuConnector::new(config.request_timeout, config.connect_timeout);
        Self::with_parts(config, source, connector)
    }

    /// Manager with an explicit credential source and connector.
    pub fn with_parts(
        config: ConnectionConfig,
        source: impl CredentialSource,
        connector: impl Connector,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                source: Box::new(source),
                connector: Box::new(connector),
                link: Mutex::new(Link::default()),
                pending: AtomicUsize::new(0),
                next_session_id: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                events,
                supervisor: Mutex::new(None),
            }),
        }
    }

    /// Subscribe to connection events. Only events sent after this call are received.
    pub fn events(&self) -> broadcast::Receiver<LcuEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        if self.inner.lock_link().session.is_some() {
            ConnectionState::Connected
        } else if self.inner.pending.load(Ordering::Acquire) > 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock_link().session.is_some()
    }

    /// Credentials of the live session.
    pub fn credentials(&self) -> Option<Credentials> {
        self.inner
            .lock_link()
            .session
            .as_ref()
            .map(|session| session.credentials.clone())
    }

    /// Event names subscribed on the live session.
    pub fn subscriptions(&self) -> HashSet<String> {
        self.inner
            .lock_link()
            .session
            .as_ref()
            .map(|session| session.subscriptions.clone())
            .unwrap_or_default()
    }

    /// Discover credentials, verify them and open the event socket.
    ///
    /// Returns `true` once the session is installed and [`LcuEvent::Connected`]
    /// has been published. On failure the manager stays disconnected and
    /// [`LcuEvent::Error`] is published.
    pub async fn connect(&self) -> bool {
        self.attempt(Reporting::Loud).await
    }

    /// Close the live session, if any.
    ///
    /// Synchronous and idempotent: the liveness task is stopped before this
    /// returns, and [`LcuEvent::Disconnected`] is published only when a session
    /// was actually closed. Attempts still in flight are discarded.
    pub fn disconnect(&self) {
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        let session = self.inner.lock_link().session.take();
        if let Some(session) = session {
            info!(session = session.id, "disconnected from local client");
            session.close();
            self.inner.emit(LcuEvent::Disconnected);
        }
    }

    /// Send `[5, event_name]`. Returns `false` when no socket is open.
    pub fn subscribe(&self, event_name: &str) -> bool {
        let mut link = self.inner.lock_link();
        let Some(session) = link.session.as_mut() else {
            return false;
        };
        if session.outbound.send(subscribe_frame(event_name)).is_err() {
            return false;
        }
        session.subscriptions.insert(event_name.to_string());
        debug!(event = event_name, "subscribed");
        true
    }

    /// Send `[6, event_name]`. Returns `false` when no socket is open.
    pub fn unsubscribe(&self, event_name: &str) -> bool {
        let mut link = self.inner.lock_link();
        let Some(session) = link.session.as_mut() else {
            return false;
        };
        if session.outbound.send(unsubscribe_frame(event_name)).is_err() {
            return false;
        }
        session.subscriptions.remove(event_name);
        debug!(event = event_name, "unsubscribed");
        true
    }

    /// Issue an authenticated request against the live session.
    ///
    /// # Errors
    ///
    /// Returns [`LcuError::NotConnected`] without a session, [`LcuError::Http`]
    /// for a non-2xx status (see [`LcuError::is_not_found`]), or the channel's
    /// transport error.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let requests = self
            .inner
            .lock_link()
            .session
            .as_ref()
            .map(|session| Arc::clone(&session.requests))
            .ok_or(LcuError::NotConnected)?;
        requests.request(method, path, body).await
    }

    /// `GET path` decoded into `T`.
    ///
    /// # Errors
    ///
    /// Everything [`request`](Self::request) returns, plus
    /// [`LcuError::Serialization`] when the body does not fit `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Start the auto-connect supervisor: try immediately, then every
    /// `interval` whenever not connected. Failures are not published.
    ///
    /// Replaces a supervisor that is already running.
    pub fn start_auto_connect(&self, interval: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let period = interval.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let manager = ConnectionManager { inner };
                if !manager.is_connected() {
                    manager.attempt(Reporting::Quiet).await;
                }
            }
        });
        if let Some(previous) = self.inner.lock_supervisor().replace(task) {
            previous.abort();
        }
        debug!(?period, "auto-connect started");
    }

    pub fn stop_auto_connect(&self) {
        if let Some(task) = self.inner.lock_supervisor().take() {
            task.abort();
            debug!("auto-connect stopped");
        }
    }

    pub fn is_auto_connecting(&self) -> bool {
        self.inner.lock_supervisor().is_some()
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn current_session_id(&self) -> Option<u64> {
        self.inner.lock_link().session.as_ref().map(|s| s.id)
    }

    async fn attempt(&self, reporting: Reporting) -> bool {
        let epoch = self.inner.epoch.load(Ordering::Acquire);
        let opened = {
            let _pending = PendingGuard::enter(&self.inner.pending);
            self.open_session().await
        };
        match opened {
            Ok(opened) => self.install(opened, epoch),
            Err(e) => {
                match reporting {
                    Reporting::Loud => {
                        warn!("connection attempt failed: {e}");
                        self.inner.emit(LcuEvent::Error(e.to_string()));
                    }
                    Reporting::Quiet => debug!("auto-connect attempt failed: {e}"),
                }
                false
            }
        }
    }

    async fn open_session(&self) -> Result<OpenedSession> {
        let credentials = self
            .inner
            .source
            .locate()
            .await
            .ok_or(LcuError::CredentialsNotFound)?;
        debug!(?credentials, "credentials located");

        let requests = self.inner.connector.open_requests(&credentials).await?;
        requests.request(Method::GET, HEALTH_CHECK_PATH, None).await?;
        let transport = self.inner.connector.open_events(&credentials).await?;

        Ok(OpenedSession {
            credentials,
            requests,
            transport,
        })
    }

    fn install(&self, opened: OpenedSession, epoch: u64) -> bool {
        let inner = &self.inner;
        let mut link = inner.lock_link();
        if inner.epoch.load(Ordering::Acquire) != epoch {
            drop(link);
            debug!("connection attempt outlived a disconnect; abandoning socket");
            let mut transport = opened.transport;
            tokio::spawn(async move {
                let _ = transport.close().await;
            });
            return false;
        }

        let id = inner.next_session_id.fetch_add(1, Ordering::AcqRel) + 1;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let weak = Arc::downgrade(inner);

        tokio::spawn(socket_loop(
            opened.transport,
            outbound_rx,
            shutdown_rx,
            inner.events.clone(),
            weak.clone(),
            id,
            inner.config.shutdown_timeout,
        ));
        let liveness_task = tokio::spawn(liveness_loop(
            weak,
            id,
            Arc::clone(&opened.requests),
            inner.config.liveness_interval,
        ));

        let port = opened.credentials.port;
        let previous = link.session.replace(ActiveSession {
            id,
            credentials: opened.credentials,
            requests: opened.requests,
            outbound: outbound_tx,
            shutdown: Some(shutdown_tx),
            liveness_task,
            subscriptions: HashSet::new(),
        });
        drop(link);

        if let Some(previous) = previous {
            debug!(previous = previous.id, session = id, "superseding earlier session");
            previous.close();
        }
        info!(session = id, port, "connected to local client");
        inner.emit(LcuEvent::Connected);
        true
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("session", &self.current_session_id())
            .field("auto_connect", &self.is_auto_connecting())
            .finish()
    }
}

// ── Background tasks ────────────────────────────────────────────────

/// Publish an event. Having no receivers is not an error.
fn emit_event(events: &broadcast::Sender<LcuEvent>, event: LcuEvent) {
    if events.send(event).is_err() {
        trace!("no event receivers");
    }
}

/// Why the socket loop ended.
enum SocketExit {
    Shutdown,
    Lost,
}

/// Multiplexes outbound control frames, the shutdown signal and inbound
/// frames of one session via `tokio::select!`.
async fn socket_loop(
    mut transport: impl Transport,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown: oneshot::Receiver<()>,
    events: broadcast::Sender<LcuEvent>,
    manager: Weak<Inner>,
    session_id: u64,
    shutdown_timeout: Duration,
) {
    debug!(session = session_id, "socket loop started");

    let exit = loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    trace!(session = session_id, %frame, "sending control frame");
                    if let Err(e) = transport.send(frame).await {
                        warn!(session = session_id, "socket send failed: {e}");
                        break SocketExit::Lost;
                    }
                }
                None => break SocketExit::Shutdown,
            },

            // Fires on an explicit signal and when the session is dropped.
            _ = &mut shutdown => break SocketExit::Shutdown,

            incoming = transport.recv() => match incoming {
                Some(Ok(text)) => match decode_frame(&text) {
                    Some(frame) => {
                        trace!(session = session_id, event = %frame.name, "event frame");
                        for event in LcuEvent::from_frame(frame) {
                            emit_event(&events, event);
                        }
                    }
                    None => trace!(session = session_id, "dropping non-event frame"),
                },
                Some(Err(e)) => {
                    warn!(session = session_id, "socket receive failed: {e}");
                    break SocketExit::Lost;
                }
                None => {
                    debug!(session = session_id, "socket closed by client");
                    break SocketExit::Lost;
                }
            },
        }
    };

    match exit {
        SocketExit::Shutdown => {
            if tokio::time::timeout(shutdown_timeout, transport.close())
                .await
                .is_err()
            {
                warn!(session = session_id, "socket did not close within timeout");
            }
        }
        SocketExit::Lost => {
            let _ = transport.close().await;
            tokio::spawn(recover(manager, session_id));
        }
    }
    debug!(session = session_id, "socket loop exited");
}

/// Health-checks the session on a fixed cadence; the first failure hands
/// over to [`recover`].
async fn liveness_loop(
    manager: Weak<Inner>,
    session_id: u64,
    requests: Arc<dyn RequestChannel>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if manager.strong_count() == 0 {
            return;
        }
        match requests.request(Method::GET, HEALTH_CHECK_PATH, None).await {
            Ok(_) => trace!(session = session_id, "liveness check ok"),
            Err(e) => {
                warn!(session = session_id, "liveness check failed: {e}");
                tokio::spawn(recover(manager, session_id));
                return;
            }
        }
    }
}

/// Tear down a lost session, wait the reconnect delay, then make exactly one
/// reconnect attempt unless something else reconnected or disconnected meanwhile.
async fn recover(manager: Weak<Inner>, session_id: u64) {
    let (epoch, delay) = {
        let Some(inner) = manager.upgrade() else {
            return;
        };
        let handle = ConnectionManager { inner };
        if handle.current_session_id() != Some(session_id) {
            return;
        }
        handle.disconnect();
        (
            handle.inner.epoch.load(Ordering::Acquire),
            handle.inner.config.reconnect_delay,
        )
    };

    tokio::time::sleep(delay).await;

    let Some(inner) = manager.upgrade() else {
        return;
    };
    let handle = ConnectionManager { inner };
    if handle.is_connected() || handle.inner.epoch.load(Ordering::Acquire) != epoch {
        debug!(session = session_id, "reconnect no longer needed");
        return;
    }
    info!(session = session_id, "reconnecting after lost connection");
    handle.attempt(Reporting::Loud).await;
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use async_trait::async_trait;

    struct Nowhere;

    #[async_trait]
    impl CredentialSource for Nowhere {
        async fn locate(&self) -> Option<Credentials> {
            None
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Connector for Unreachable {
        async fn open_requests(&self, _: &Credentials) -> Result<Arc<dyn RequestChannel>> {
            Err(LcuError::Timeout)
        }

        async fn open_events(&self, _: &Credentials) -> Result<Box<dyn Transport>> {
            Err(LcuError::Timeout)
        }
    }

    #[test]
    fn config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.liveness_interval, Duration::from_secs(3));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.event_channel_capacity, 256);
        assert!(config.scan_process);
        assert!(config.install_dir.is_none());
    }

    #[test]
    fn config_clamps_zero_values() {
        let config = ConnectionConfig::new()
            .with_event_channel_capacity(0)
            .with_liveness_interval(Duration::ZERO);
        assert_eq!(config.event_channel_capacity, 1);
        assert_eq!(config.liveness_interval, Duration::from_millis(1));
    }

    #[tokio::test]
    async fn idle_manager_is_disconnected() {
        let manager = ConnectionManager::with_parts(ConnectionConfig::new(), Nowhere, Unreachable);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.credentials().is_none());
        assert!(manager.subscriptions().is_empty());
        assert!(!manager.subscribe("OnJsonApiEvent"));
        assert!(!manager.unsubscribe("OnJsonApiEvent"));
    }

    #[tokio::test]
    async fn handshake_failure_publishes_error() {
        let manager = ConnectionManager::with_parts(
            ConnectionConfig::new(),
            Credentials::new(2999, "pw", "https"),
            Unreachable,
        );
        let mut events = manager.events();
        assert!(!manager.connect().await);
        assert!(matches!(events.try_recv(), Ok(LcuEvent::Error(_))));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn quiet_attempt_publishes_nothing() {
        let manager = ConnectionManager::with_parts(ConnectionConfig::new(), Nowhere, Unreachable);
        let mut events = manager.events();
        assert!(!manager.attempt(Reporting::Quiet).await);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn supervisor_start_and_stop() {
        let manager = ConnectionManager::with_parts(ConnectionConfig::new(), Nowhere, Unreachable);
        manager.start_auto_connect(Duration::from_secs(5));
        assert!(manager.is_auto_connecting());
        manager.stop_auto_connect();
        assert!(!manager.is_auto_connecting());
    }
}
