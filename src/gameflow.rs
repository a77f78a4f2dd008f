//! Gameflow phase tracking.
//!
//! [`GameflowState`] is a plain reducer over phase values, session snapshots
//! and lobby documents. [`GameflowTracker`] owns one and drives it from the
//! connection's events, a backup session poll while in champion select, and
//! the ready-check grace timer.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::connection::ConnectionManager;
use crate::dedup::LastValue;
use crate::error::LcuError;
use crate::event::LcuEvent;
use crate::models::{ChampSelectSession, GameflowPhase};
use crate::protocol::{
    json_api_event, CHAMP_SELECT_SESSION_PATH, GAMEFLOW_PHASE_PATH, LOBBY_PATH,
    READY_CHECK_ACCEPT_PATH,
};
use crate::settings::{flag, keys, SettingsStore};

const DEFAULT_SESSION_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_READY_CHECK_GRACE: Duration = Duration::from_secs(2);
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

// ── Events ──────────────────────────────────────────────────────────

/// The local player's locked-in champion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChampionSelection {
    pub champion_id: i64,
    pub is_locked: bool,
    pub session: Box<ChampSelectSession>,
    /// Queue of the current lobby, when one has been seen.
    pub queue_id: Option<i64>,
}

/// Signals published by the [`GameflowTracker`].
#[derive(Debug, Clone, PartialEq)]
pub enum GameflowEvent {
    PhaseChanged {
        phase: GameflowPhase,
        previous: GameflowPhase,
    },
    /// Emitted at most once per distinct locked champion per champion select.
    ChampionSelected(ChampionSelection),
    /// A queue id appeared in the lobby, ahead of champion select.
    QueueIdDetected { queue_id: i64 },
    ReadyCheckAccepted,
    /// A champion-select snapshot that differs from the previous one.
    SessionUpdated(Box<ChampSelectSession>),
}

// ── Reducer ─────────────────────────────────────────────────────────

/// Phase, lock and queue memory. Performs no I/O.
#[derive(Debug, Default)]
pub struct GameflowState {
    phase: GameflowPhase,
    last_locked: Option<i64>,
    session: LastValue<ChampSelectSession>,
    queue_id: Option<i64>,
}

impl GameflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &GameflowPhase {
        &self.phase
    }

    pub fn queue_id(&self) -> Option<i64> {
        self.queue_id
    }

    pub fn last_locked(&self) -> Option<i64> {
        self.last_locked
    }

    /// Move to `phase`. Returns `PhaseChanged` unless it equals the current phase.
    ///
    /// Leaving champion select forgets the locked champion and the last snapshot.
    pub fn transition(&mut self, phase: GameflowPhase) -> Option<GameflowEvent> {
        if phase == self.phase {
            return None;
        }
        let previous = std::mem::replace(&mut self.phase, phase.clone());
        if previous == GameflowPhase::ChampSelect {
            self.last_locked = None;
            self.session.clear();
        }
        Some(GameflowEvent::PhaseChanged { phase, previous })
    }

    /// Feed one champion-select snapshot.
    ///
    /// Snapshots outside champion select and exact repeats produce nothing.
    pub fn observe_session(&mut self, session: ChampSelectSession) -> Vec<GameflowEvent> {
        if self.phase != GameflowPhase::ChampSelect || !self.session.update(&session) {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);
        if let Some(champion_id) = session.locked_champion() {
            if self.last_locked != Some(champion_id) {
                self.last_locked = Some(champion_id);
                events.push(GameflowEvent::ChampionSelected(ChampionSelection {
                    champion_id,
                    is_locked: true,
                    session: Box::new(session.clone()),
                    queue_id: self.queue_id,
                }));
            }
        }
        events.insert(0, GameflowEvent::SessionUpdated(Box::new(session)));
        events
    }

    /// Feed a lobby document (`Value::Null` when the lobby is gone).
    pub fn observe_lobby(&mut self, lobby: &Value) -> Option<GameflowEvent> {
        if lobby.is_null() {
            self.queue_id = None;
            return None;
        }
        let queue_id = lobby
            .get("gameConfig")
            .and_then(|config| config.get("queueId"))
            .and_then(Value::as_i64)?;
        if self.queue_id == Some(queue_id) {
            return None;
        }
        self.queue_id = Some(queue_id);
        Some(GameflowEvent::QueueIdDetected { queue_id })
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`GameflowTracker`].
#[derive(Debug, Clone)]
pub struct GameflowConfig {
    /// Backup session poll cadence while in champion select. Defaults to **1 second**.
    pub session_poll_interval: Duration,
    /// Delay before accepting a ready check. Defaults to **2 seconds**.
    pub ready_check_grace: Duration,
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
}

impl GameflowConfig {
    pub fn new() -> Self {
        Self {
            session_poll_interval: DEFAULT_SESSION_POLL_INTERVAL,
            ready_check_grace: DEFAULT_READY_CHECK_GRACE,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Zero is clamped to one millisecond.
    #[must_use]
    pub fn with_session_poll_interval(mut self, interval: Duration) -> Self {
        self.session_poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn with_ready_check_grace(mut self, grace: Duration) -> Self {
        self.ready_check_grace = grace;
        self
    }

    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }
}

impl Default for GameflowConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tracker ─────────────────────────────────────────────────────────

/// Background task that keeps a [`GameflowState`] in sync with the client.
///
/// Dropping the tracker stops the task.
pub struct GameflowTracker {
    events: broadcast::Sender<GameflowEvent>,
    phase: watch::Receiver<GameflowPhase>,
    task: JoinHandle<()>,
}

impl GameflowTracker {
    /// Start tracking. The returned receiver sees every event from the first one.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        connection: ConnectionManager,
        settings: Arc<dyn SettingsStore>,
        config: GameflowConfig,
    ) -> (Self, broadcast::Receiver<GameflowEvent>) {
        let (events, events_rx) = broadcast::channel(config.event_channel_capacity.max(1));
        let (phase_tx, phase_rx) = watch::channel(GameflowPhase::None);
        let lcu_events = connection.events();

        let driver = Driver {
            connection,
            settings,
            config,
            state: GameflowState::new(),
            events: events.clone(),
            phase: phase_tx,
            session_poll: None,
            ready_check_at: None,
        };
        let task = tokio::spawn(driver.run(lcu_events));

        let tracker = Self {
            events,
            phase: phase_rx,
            task,
        };
        (tracker, events_rx)
    }

    pub fn current_phase(&self) -> GameflowPhase {
        self.phase.borrow().clone()
    }

    /// An additional receiver; it sees events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<GameflowEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for GameflowTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameflowTracker")
            .field("phase", &self.current_phase())
            .finish()
    }
}

impl Drop for GameflowTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Driver {
    connection: ConnectionManager,
    settings: Arc<dyn SettingsStore>,
    config: GameflowConfig,
    state: GameflowState,
    events: broadcast::Sender<GameflowEvent>,
    phase: watch::Sender<GameflowPhase>,
    session_poll: Option<Interval>,
    ready_check_at: Option<Instant>,
}

impl Driver {
    async fn run(mut self, mut lcu: broadcast::Receiver<LcuEvent>) {
        debug!("gameflow tracker started");
        if self.connection.is_connected() {
            self.on_connected().await;
        }

        loop {
            tokio::select! {
                event = lcu.recv() => match event {
                    Ok(event) => self.on_lcu_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "gameflow tracker lagged behind connection events");
                        if self.connection.is_connected() {
                            self.on_connected().await;
                        } else {
                            self.ready_check_at = None;
                            self.apply_phase(GameflowPhase::None).await;
                        }
                    }
                    Err(RecvError::Closed) => break,
                },

                _ = next_tick(&mut self.session_poll) => self.poll_session().await,

                _ = deadline(self.ready_check_at) => {
                    self.ready_check_at = None;
                    self.accept_ready_check().await;
                }
            }
        }
        debug!("gameflow tracker stopped");
    }

    fn emit(&self, event: GameflowEvent) {
        let _ = self.events.send(event);
    }

    async fn on_lcu_event(&mut self, event: LcuEvent) {
        match event {
            LcuEvent::Connected => self.on_connected().await,
            LcuEvent::Disconnected => {
                self.ready_check_at = None;
                self.apply_phase(GameflowPhase::None).await;
            }
            LcuEvent::GameflowPhase(phase) => self.apply_phase(phase).await,
            LcuEvent::ChampSelectSession(Some(session)) => self.handle_session(*session),
            LcuEvent::ChampSelectSession(None) => debug!("champ select session deleted"),
            LcuEvent::LobbySession(lobby) => self.handle_lobby(&lobby),
            LcuEvent::Error(_) | LcuEvent::Raw(_) => {}
        }
    }

    async fn on_connected(&mut self) {
        for path in [GAMEFLOW_PHASE_PATH, LOBBY_PATH] {
            if !self.connection.subscribe(&json_api_event(path)) {
                debug!(path, "subscribe skipped, socket not open");
            }
        }
        // A superseding handshake may arrive without a phase transition.
        if self.state.phase() == &GameflowPhase::ChampSelect
            && !self
                .connection
                .subscribe(&json_api_event(CHAMP_SELECT_SESSION_PATH))
        {
            debug!("session subscribe skipped, socket not open");
        }
        self.refresh_phase().await;
        self.refresh_lobby().await;
    }

    async fn refresh_phase(&mut self) {
        match self
            .connection
            .get_json::<GameflowPhase>(GAMEFLOW_PHASE_PATH)
            .await
        {
            Ok(phase) => self.apply_phase(phase).await,
            Err(e) => warn!("failed to fetch gameflow phase: {e}"),
        }
    }

    async fn refresh_lobby(&mut self) {
        match self.connection.request(Method::GET, LOBBY_PATH, None).await {
            Ok(lobby) => self.handle_lobby(&lobby),
            Err(e) if e.is_not_found() => debug!("not in a lobby"),
            Err(e) => warn!("failed to fetch lobby: {e}"),
        }
    }

    async fn apply_phase(&mut self, phase: GameflowPhase) {
        let previous = self.state.phase().clone();
        let Some(event) = self.state.transition(phase) else {
            return;
        };
        let current = self.state.phase().clone();
        info!(phase = %current, previous = %previous, "gameflow phase changed");
        self.phase.send_replace(current.clone());
        self.emit(event);

        if previous == GameflowPhase::ChampSelect {
            self.leave_champ_select();
        }
        self.ready_check_at = None;
        match current {
            GameflowPhase::ReadyCheck => {
                if flag(self.settings.as_ref(), keys::AUTO_ACCEPT_ENABLED, false) {
                    debug!(grace = ?self.config.ready_check_grace, "scheduling ready check accept");
                    self.ready_check_at = Some(Instant::now() + self.config.ready_check_grace);
                }
            }
            GameflowPhase::ChampSelect => self.enter_champ_select().await,
            _ => {}
        }
    }

    async fn enter_champ_select(&mut self) {
        self.connection
            .subscribe(&json_api_event(CHAMP_SELECT_SESSION_PATH));
        let period = self.config.session_poll_interval;
        let mut poll = tokio::time::interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.session_poll = Some(poll);
        self.poll_session().await;
    }

    fn leave_champ_select(&mut self) {
        self.connection
            .unsubscribe(&json_api_event(CHAMP_SELECT_SESSION_PATH));
        self.session_poll = None;
    }

    async fn poll_session(&mut self) {
        match self
            .connection
            .get_json::<ChampSelectSession>(CHAMP_SELECT_SESSION_PATH)
            .await
        {
            Ok(session) => self.handle_session(session),
            Err(e) if e.is_not_found() => debug!("no champ select session yet"),
            Err(LcuError::NotConnected) => debug!("session poll skipped, not connected"),
            Err(e) => warn!("failed to poll champ select session: {e}"),
        }
    }

    fn handle_session(&mut self, session: ChampSelectSession) {
        for event in self.state.observe_session(session) {
            if let GameflowEvent::ChampionSelected(selection) = &event {
                info!(champion = selection.champion_id, "champion locked in");
            }
            self.emit(event);
        }
    }

    fn handle_lobby(&mut self, lobby: &Value) {
        if let Some(event) = self.state.observe_lobby(lobby) {
            if let GameflowEvent::QueueIdDetected { queue_id } = &event {
                info!(queue_id, "queue id detected");
            }
            self.emit(event);
        }
    }

    async fn accept_ready_check(&mut self) {
        if self.state.phase() != &GameflowPhase::ReadyCheck {
            debug!("ready check no longer pending");
            return;
        }
        if !flag(self.settings.as_ref(), keys::AUTO_ACCEPT_ENABLED, false) {
            debug!("auto accept disabled during grace period");
            return;
        }
        match self
            .connection
            .get_json::<GameflowPhase>(GAMEFLOW_PHASE_PATH)
            .await
        {
            Ok(GameflowPhase::ReadyCheck) => {}
            Ok(phase) => {
                debug!(%phase, "ready check resolved during grace period");
                self.apply_phase(phase).await;
                return;
            }
            Err(e) => {
                warn!("could not confirm ready check: {e}");
                return;
            }
        }
        match self
            .connection
            .request(Method::POST, READY_CHECK_ACCEPT_PATH, None)
            .await
        {
            Ok(_) => {
                info!("ready check accepted");
                self.emit(GameflowEvent::ReadyCheckAccepted);
            }
            Err(e) => warn!("failed to accept ready check: {e}"),
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => pending().await,
    }
}
