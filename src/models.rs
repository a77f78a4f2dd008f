//! Data returned by the local client for the gameflow and champion-select resources.
//!
//! Every field the client may omit is `#[serde(default)]`; snapshots from
//! practice tools and custom lobbies routinely leave whole sections out.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Timer phase reported while the draft is in its final countdown.
pub const FINALIZATION_TIMER_PHASE: &str = "FINALIZATION";

/// Number of players on a full team.
pub const FULL_TEAM_SIZE: usize = 5;

// ── Gameflow phase ──────────────────────────────────────────────────

/// The client's position in the overall match lifecycle.
///
/// Unknown tokens are preserved in [`GameflowPhase::Other`] so that new client
/// phases pass through instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameflowPhase {
    #[default]
    None,
    Lobby,
    Matchmaking,
    CheckedIntoTournament,
    ReadyCheck,
    ChampSelect,
    GameStart,
    FailedToLaunch,
    InProgress,
    Reconnect,
    WaitingForStats,
    PreEndOfGame,
    EndOfGame,
    TerminatedInError,
    Other(String),
}

impl GameflowPhase {
    pub fn as_str(&self) -> &str {
        match self {
            GameflowPhase::None => "None",
            GameflowPhase::Lobby => "Lobby",
            GameflowPhase::Matchmaking => "Matchmaking",
            GameflowPhase::CheckedIntoTournament => "CheckedIntoTournament",
            GameflowPhase::ReadyCheck => "ReadyCheck",
            GameflowPhase::ChampSelect => "ChampSelect",
            GameflowPhase::GameStart => "GameStart",
            GameflowPhase::FailedToLaunch => "FailedToLaunch",
            GameflowPhase::InProgress => "InProgress",
            GameflowPhase::Reconnect => "Reconnect",
            GameflowPhase::WaitingForStats => "WaitingForStats",
            GameflowPhase::PreEndOfGame => "PreEndOfGame",
            GameflowPhase::EndOfGame => "EndOfGame",
            GameflowPhase::TerminatedInError => "TerminatedInError",
            GameflowPhase::Other(other) => other,
        }
    }
}

impl From<&str> for GameflowPhase {
    fn from(token: &str) -> Self {
        match token {
            "" | "None" => GameflowPhase::None,
            "Lobby" => GameflowPhase::Lobby,
            "Matchmaking" => GameflowPhase::Matchmaking,
            "CheckedIntoTournament" => GameflowPhase::CheckedIntoTournament,
            "ReadyCheck" => GameflowPhase::ReadyCheck,
            "ChampSelect" => GameflowPhase::ChampSelect,
            "GameStart" => GameflowPhase::GameStart,
            "FailedToLaunch" => GameflowPhase::FailedToLaunch,
            "InProgress" => GameflowPhase::InProgress,
            "Reconnect" => GameflowPhase::Reconnect,
            "WaitingForStats" => GameflowPhase::WaitingForStats,
            "PreEndOfGame" => GameflowPhase::PreEndOfGame,
            "EndOfGame" => GameflowPhase::EndOfGame,
            "TerminatedInError" => GameflowPhase::TerminatedInError,
            other => GameflowPhase::Other(other.to_string()),
        }
    }
}

impl From<String> for GameflowPhase {
    fn from(token: String) -> Self {
        GameflowPhase::from(token.as_str())
    }
}

impl From<GameflowPhase> for String {
    fn from(phase: GameflowPhase) -> Self {
        phase.as_str().to_string()
    }
}

impl fmt::Display for GameflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Champion select ─────────────────────────────────────────────────

/// Kind of a draft action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Pick,
    Ban,
    /// Reveal/vote actions, untyped actions and anything else this crate does not act on.
    #[serde(other)]
    #[default]
    Other,
}

/// One slot in the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Required: an action without an id cannot be submitted, so a snapshot
    /// missing one is rejected rather than acted on.
    pub id: i64,
    #[serde(default)]
    pub actor_cell_id: i64,
    #[serde(rename = "type", default)]
    pub kind: ActionKind,
    #[serde(default)]
    pub champion_id: i64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_in_progress: bool,
}

/// A player seat on either team. A champion id of 0 means nothing is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamMember {
    pub cell_id: i64,
    pub champion_id: i64,
    pub champion_pick_intent: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bans {
    pub my_team_bans: Vec<i64>,
    pub their_team_bans: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timer {
    pub phase: String,
    #[serde(rename = "adjustedTimeLeftInPhase")]
    pub time_left_ms: i64,
}

/// A full champion-select snapshot. Replaced wholesale on every event or poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChampSelectSession {
    pub local_player_cell_id: i64,
    pub my_team: Vec<TeamMember>,
    pub their_team: Vec<TeamMember>,
    pub bans: Bans,
    pub actions: Vec<Vec<Action>>,
    pub timer: Timer,
}

impl ChampSelectSession {
    /// The local player's seat.
    pub fn local_member(&self) -> Option<&TeamMember> {
        self.my_team
            .iter()
            .find(|member| member.cell_id == self.local_player_cell_id)
    }

    /// Every action across all action groups.
    pub fn all_actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().flatten()
    }

    /// Actions owned by the local player.
    pub fn local_actions(&self) -> impl Iterator<Item = &Action> {
        self.all_actions()
            .filter(move |action| action.actor_cell_id == self.local_player_cell_id)
    }

    /// `true` when there is at least one action and every action is completed.
    pub fn all_actions_completed(&self) -> bool {
        let mut actions = self.all_actions().peekable();
        actions.peek().is_some() && actions.all(|action| action.completed)
    }

    /// Non-zero champion ids on the local team, in seat order.
    pub fn my_team_champions(&self) -> Vec<i64> {
        self.my_team
            .iter()
            .map(|member| member.champion_id)
            .filter(|id| *id != 0)
            .collect()
    }

    /// The champion the local player has genuinely locked in, as opposed to hovered.
    ///
    /// Requires a completed pick action owned by the local player whose
    /// champion matches the player's seat.
    pub fn locked_champion(&self) -> Option<i64> {
        let champion_id = self.local_member()?.champion_id;
        if champion_id == 0 {
            return None;
        }
        self.local_actions()
            .any(|action| {
                action.kind == ActionKind::Pick
                    && action.champion_id == champion_id
                    && action.completed
            })
            .then_some(champion_id)
    }

    /// Champions already taken by someone other than the local player.
    pub fn picked_champions(&self) -> HashSet<i64> {
        let seats = self
            .my_team
            .iter()
            .chain(self.their_team.iter())
            .filter(|member| member.cell_id != self.local_player_cell_id)
            .map(|member| member.champion_id);
        let completed_picks = self
            .all_actions()
            .filter(|action| action.kind == ActionKind::Pick && action.completed)
            .map(|action| action.champion_id);
        seats.chain(completed_picks).filter(|id| *id != 0).collect()
    }

    /// Champions banned by either team.
    pub fn banned_champions(&self) -> HashSet<i64> {
        self.bans
            .my_team_bans
            .iter()
            .chain(self.bans.their_team_bans.iter())
            .copied()
            .filter(|id| *id != 0)
            .collect()
    }

    /// Champions a teammate has hovered or declared as their pick intent.
    pub fn teammate_intents(&self) -> HashSet<i64> {
        self.my_team
            .iter()
            .filter(|member| member.cell_id != self.local_player_cell_id)
            .flat_map(|member| [member.champion_pick_intent, member.champion_id])
            .filter(|id| *id != 0)
            .collect()
    }
}
