//! Team composition tracking and the smart-apply checkpoint trigger.
//!
//! Fed exclusively by the [`GameflowTracker`](crate::gameflow::GameflowTracker):
//! de-duplicated session snapshots and phase changes. Never talks to the
//! client directly.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dedup::LastValue;
use crate::gameflow::GameflowEvent;
use crate::models::{ChampSelectSession, GameflowPhase, FINALIZATION_TIMER_PHASE, FULL_TEAM_SIZE};
use crate::settings::{trigger_time, SettingsStore};

/// Remaining-time tiers, highest first, in milliseconds.
pub const CHECKPOINTS_MS: [i64; 4] = [20_000, 15_000, 10_000, 5_000];

const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// The local team as seen in one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamComposition {
    /// Non-zero champion ids in seat order.
    pub champion_ids: Vec<i64>,
    /// Every seat of a full team has a champion.
    pub all_locked: bool,
    pub in_finalization: bool,
    pub time_left_ms: i64,
}

impl TeamComposition {
    pub fn from_session(session: &ChampSelectSession) -> Self {
        let champion_ids = session.my_team_champions();
        let all_locked = champion_ids.len() == FULL_TEAM_SIZE;
        // The timer phase is sometimes stale or missing in custom lobbies.
        let in_finalization = session.timer.phase == FINALIZATION_TIMER_PHASE
            || (all_locked && session.all_actions_completed());
        Self {
            champion_ids,
            all_locked,
            in_finalization,
            time_left_ms: session.timer.time_left_ms,
        }
    }
}

/// Fire memory for the current decision point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointState {
    pub has_fired: bool,
    /// Tier of the last fire; 0 when it happened below the lowest tier.
    pub last_fired_checkpoint_ms: i64,
}

/// Largest checkpoint not above `time_left_ms`, or 0 below the lowest one.
pub fn checkpoint_tier(time_left_ms: i64) -> i64 {
    CHECKPOINTS_MS
        .iter()
        .copied()
        .find(|checkpoint| *checkpoint <= time_left_ms)
        .unwrap_or(0)
}

/// Signals published by the [`TeamCompositionTracker`].
#[derive(Debug, Clone, PartialEq)]
pub enum TeamEvent {
    CompositionUpdated(TeamComposition),
    ReadyForSmartApply(TeamComposition),
    /// Champion select ended; `phase` is the phase it ended into.
    TeamReset { phase: GameflowPhase },
}

// ── Reducer ─────────────────────────────────────────────────────────

/// Composition de-duplication and checkpoint memory for one champion select.
#[derive(Debug, Default)]
pub struct TeamCompositionState {
    last_emitted: LastValue<TeamComposition>,
    /// Champion ids the checkpoint memory belongs to.
    decision_point: LastValue<Vec<i64>>,
    checkpoint: CheckpointState,
}

impl TeamCompositionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint(&self) -> CheckpointState {
        self.checkpoint
    }

    /// Derive the composition from `session` and decide what to publish.
    pub fn observe(&mut self, session: &ChampSelectSession, trigger: Duration) -> Vec<TeamEvent> {
        let composition = TeamComposition::from_session(session);
        let mut events = Vec::with_capacity(2);

        if self.decision_point.update(&composition.champion_ids) {
            self.checkpoint = CheckpointState::default();
        }
        if self.last_emitted.update(&composition) {
            events.push(TeamEvent::CompositionUpdated(composition.clone()));
        }

        let trigger_ms = i64::try_from(trigger.as_millis()).unwrap_or(i64::MAX);
        if self.should_fire(&composition, session.all_actions_completed(), trigger_ms) {
            let tier = checkpoint_tier(composition.time_left_ms);
            self.checkpoint = CheckpointState {
                has_fired: true,
                last_fired_checkpoint_ms: tier,
            };
            events.push(TeamEvent::ReadyForSmartApply(composition));
        }
        events
    }

    fn should_fire(&self, composition: &TeamComposition, actions_done: bool, trigger_ms: i64) -> bool {
        let time_left = composition.time_left_ms;
        if composition.champion_ids.is_empty() || time_left > trigger_ms || time_left <= 0 {
            return false;
        }

        let small_lobby = composition.champion_ids.len() < FULL_TEAM_SIZE && time_left <= trigger_ms;
        let settled = composition.in_finalization || composition.all_locked || actions_done || small_lobby;
        if !settled {
            return false;
        }

        if !self.checkpoint.has_fired {
            return true;
        }
        let tier = checkpoint_tier(time_left);
        tier > 0 && tier < self.checkpoint.last_fired_checkpoint_ms
    }

    /// Leaving champion select clears all memory and yields `TeamReset`.
    /// Entering it clears memory silently.
    pub fn on_phase_changed(
        &mut self,
        phase: &GameflowPhase,
        previous: &GameflowPhase,
    ) -> Option<TeamEvent> {
        let was_in = *previous == GameflowPhase::ChampSelect;
        let is_in = *phase == GameflowPhase::ChampSelect;
        if was_in == is_in {
            return None;
        }
        *self = Self::default();
        was_in.then(|| TeamEvent::TeamReset {
            phase: phase.clone(),
        })
    }
}

// ── Tracker ─────────────────────────────────────────────────────────

/// Configuration for a [`TeamCompositionTracker`].
#[derive(Debug, Clone)]
pub struct TeamConfig {
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
}

impl TeamConfig {
    pub fn new() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task running a [`TeamCompositionState`] over gameflow events.
///
/// The trigger time is re-read from the settings on every snapshot.
#[derive(Debug)]
pub struct TeamCompositionTracker {
    events: broadcast::Sender<TeamEvent>,
    task: JoinHandle<()>,
}

impl TeamCompositionTracker {
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        gameflow: broadcast::Receiver<GameflowEvent>,
        settings: Arc<dyn SettingsStore>,
        config: TeamConfig,
    ) -> (Self, broadcast::Receiver<TeamEvent>) {
        let (events, events_rx) = broadcast::channel(config.event_channel_capacity.max(1));
        let task = tokio::spawn(run(gameflow, settings, events.clone()));
        (Self { events, task }, events_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TeamEvent> {
        self.events.subscribe()
    }
}

impl Drop for TeamCompositionTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut gameflow: broadcast::Receiver<GameflowEvent>,
    settings: Arc<dyn SettingsStore>,
    events: broadcast::Sender<TeamEvent>,
) {
    let mut state = TeamCompositionState::new();
    loop {
        let event = match gameflow.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "team tracker lagged behind gameflow events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let published = match event {
            GameflowEvent::SessionUpdated(session) => {
                state.observe(&session, trigger_time(settings.as_ref()))
            }
            GameflowEvent::PhaseChanged { phase, previous } => {
                state.on_phase_changed(&phase, &previous).into_iter().collect()
            }
            _ => Vec::new(),
        };

        for event in published {
            match &event {
                TeamEvent::ReadyForSmartApply(composition) => info!(
                    champions = ?composition.champion_ids,
                    time_left_ms = composition.time_left_ms,
                    "ready for smart apply"
                ),
                TeamEvent::TeamReset { phase } => debug!(%phase, "team reset"),
                TeamEvent::CompositionUpdated(_) => {}
            }
            let _ = events.send(event);
        }
    }
    debug!("team tracker stopped");
}
