//! Automated pick and ban.
//!
//! The planners are pure functions over a session snapshot and the user's
//! preferences. [`DraftAutomation`] polls the session on its own cadence and
//! submits whatever the planners choose; the fast cadence doubles as the
//! retry mechanism, so a failed submission is only logged.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::connection::ConnectionManager;
use crate::models::{ActionKind, ChampSelectSession};
use crate::protocol::{champ_select_action_path, CHAMP_SELECT_SESSION_PATH};
use crate::settings::{champion_list, flag, keys, SettingsStore};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

// ── Preferences ─────────────────────────────────────────────────────

/// Settings for one kind of action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    pub enabled: bool,
    /// Pick: take a champion even if someone else already has it.
    /// Ban: ban a champion even if a teammate intends to play it.
    pub force: bool,
    /// Candidates in priority order.
    pub champions: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftPreferences {
    pub pick: Policy,
    pub ban: Policy,
}

impl DraftPreferences {
    pub fn load(store: &(impl SettingsStore + ?Sized)) -> Self {
        Self {
            pick: Policy {
                enabled: flag(store, keys::AUTO_PICK_ENABLED, false),
                force: flag(store, keys::AUTO_PICK_FORCE, false),
                champions: champion_list(store, keys::AUTO_PICK_CHAMPIONS),
            },
            ban: Policy {
                enabled: flag(store, keys::AUTO_BAN_ENABLED, false),
                force: flag(store, keys::AUTO_BAN_FORCE, false),
                champions: champion_list(store, keys::AUTO_BAN_CHAMPIONS),
            },
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.pick.enabled || self.ban.enabled
    }
}

// ── Planning ────────────────────────────────────────────────────────

/// One submission the poller should make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedAction {
    pub action_id: i64,
    pub kind: ActionKind,
    pub champion_id: i64,
}

/// Resolve every open local action that has an eligible candidate, picks first.
pub fn plan_actions(session: &ChampSelectSession, prefs: &DraftPreferences) -> Vec<PlannedAction> {
    let mut open: Vec<_> = session
        .local_actions()
        .filter(|action| action.is_in_progress && !action.completed)
        .collect();
    open.sort_by_key(|action| match action.kind {
        ActionKind::Pick => 0,
        _ => 1,
    });

    open.into_iter()
        .filter_map(|action| {
            let champion_id = match action.kind {
                ActionKind::Pick if prefs.pick.enabled => choose_pick(session, &prefs.pick),
                ActionKind::Ban if prefs.ban.enabled => choose_ban(session, &prefs.ban),
                _ => None,
            }?;
            Some(PlannedAction {
                action_id: action.id,
                kind: action.kind,
                champion_id,
            })
        })
        .collect()
}

/// First candidate that is not banned and, unless forced, not already taken.
pub fn choose_pick(session: &ChampSelectSession, policy: &Policy) -> Option<i64> {
    let banned = session.banned_champions();
    let picked = session.picked_champions();
    policy
        .champions
        .iter()
        .copied()
        .find(|id| !banned.contains(id) && (policy.force || !picked.contains(id)))
}

/// First candidate that is not banned yet and, unless forced, not wanted by a teammate.
pub fn choose_ban(session: &ChampSelectSession, policy: &Policy) -> Option<i64> {
    let banned = session.banned_champions();
    let intents = session.teammate_intents();
    policy
        .champions
        .iter()
        .copied()
        .find(|id| !banned.contains(id) && (policy.force || !intents.contains(id)))
}

// ── Poller ──────────────────────────────────────────────────────────

/// Signals published by [`DraftAutomation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEvent {
    ActionPerformed { kind: ActionKind, champion_id: i64 },
}

/// Configuration for [`DraftAutomation`].
#[derive(Debug, Clone)]
pub struct DraftConfig {
    /// Defaults to **300 ms**.
    pub poll_interval: Duration,
    /// Defaults to **64**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
}

impl DraftConfig {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Zero is clamped to one millisecond.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls the champion-select session and submits planned picks and bans.
///
/// Idle while both features are disabled or the connection is down.
#[derive(Debug)]
pub struct DraftAutomation {
    events: broadcast::Sender<DraftEvent>,
    task: JoinHandle<()>,
}

impl DraftAutomation {
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        connection: ConnectionManager,
        settings: Arc<dyn SettingsStore>,
        config: DraftConfig,
    ) -> (Self, broadcast::Receiver<DraftEvent>) {
        let (events, events_rx) = broadcast::channel(config.event_channel_capacity.max(1));
        let poller = Poller {
            connection,
            settings,
            events: events.clone(),
        };
        let task = tokio::spawn(poller.run(config.poll_interval.max(Duration::from_millis(1))));
        (Self { events, task }, events_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DraftEvent> {
        self.events.subscribe()
    }
}

impl Drop for DraftAutomation {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Poller {
    connection: ConnectionManager,
    settings: Arc<dyn SettingsStore>,
    events: broadcast::Sender<DraftEvent>,
}

impl Poller {
    async fn run(self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    async fn tick(&self) {
        let prefs = DraftPreferences::load(self.settings.as_ref());
        if !prefs.any_enabled() || !self.connection.is_connected() {
            return;
        }

        let session = match self
            .connection
            .get_json::<ChampSelectSession>(CHAMP_SELECT_SESSION_PATH)
            .await
        {
            Ok(session) => session,
            Err(e) if e.is_not_found() => return,
            Err(e) => {
                warn!("draft poll failed: {e}");
                return;
            }
        };

        for planned in plan_actions(&session, &prefs) {
            let body = json!({ "championId": planned.champion_id, "completed": true });
            let path = champ_select_action_path(planned.action_id);
            match self
                .connection
                .request(Method::PATCH, &path, Some(&body))
                .await
            {
                Ok(_) => {
                    info!(kind = ?planned.kind, champion = planned.champion_id, "draft action submitted");
                    let _ = self.events.send(DraftEvent::ActionPerformed {
                        kind: planned.kind,
                        champion_id: planned.champion_id,
                    });
                }
                Err(e) => warn!(action = planned.action_id, "draft action rejected: {e}"),
            }
        }
        debug!("draft tick complete");
    }
}
