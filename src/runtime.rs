//! Wiring of the four components.
//!
//! The host constructs one [`ConnectionManager`] and hands it to
//! [`LcuRuntime::start`]; each tracker receives exactly the handles it needs.
//!
//! ```rust,ignore
//! let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new());
//! let connection = ConnectionManager::new(ConnectionConfig::new());
//! let (runtime, mut channels) = LcuRuntime::start(connection, settings, RuntimeConfig::new());
//!
//! while let Ok(event) = channels.team.recv().await {
//!     if let TeamEvent::ReadyForSmartApply(composition) = event {
//!         apply(&composition.champion_ids);
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::info;

use crate::connection::ConnectionManager;
use crate::draft::{DraftAutomation, DraftConfig, DraftEvent};
use crate::event::LcuEvent;
use crate::gameflow::{GameflowConfig, GameflowEvent, GameflowTracker};
use crate::settings::{flag, keys, SettingsStore};
use crate::team::{TeamCompositionTracker, TeamConfig, TeamEvent};

const DEFAULT_AUTO_CONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for every component started by [`LcuRuntime`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub gameflow: GameflowConfig,
    pub team: TeamConfig,
    pub draft: DraftConfig,
    /// Auto-connect cadence. Defaults to **5 seconds**.
    pub auto_connect_interval: Duration,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self {
            gameflow: GameflowConfig::new(),
            team: TeamConfig::new(),
            draft: DraftConfig::new(),
            auto_connect_interval: DEFAULT_AUTO_CONNECT_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_gameflow(mut self, config: GameflowConfig) -> Self {
        self.gameflow = config;
        self
    }

    #[must_use]
    pub fn with_team(mut self, config: TeamConfig) -> Self {
        self.team = config;
        self
    }

    #[must_use]
    pub fn with_draft(mut self, config: DraftConfig) -> Self {
        self.draft = config;
        self
    }

    #[must_use]
    pub fn with_auto_connect_interval(mut self, interval: Duration) -> Self {
        self.auto_connect_interval = interval;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Receivers for every signal the runtime produces, created before any task runs.
#[derive(Debug)]
pub struct RuntimeChannels {
    pub connection: broadcast::Receiver<LcuEvent>,
    pub gameflow: broadcast::Receiver<GameflowEvent>,
    pub team: broadcast::Receiver<TeamEvent>,
    pub draft: broadcast::Receiver<DraftEvent>,
}

/// The connection manager plus its three dependents.
///
/// Auto-connect runs while `leagueClientEnabled` is set (default `true`).
/// Dropping the runtime stops the trackers and the auto-connect supervisor.
pub struct LcuRuntime {
    connection: ConnectionManager,
    settings: Arc<dyn SettingsStore>,
    gameflow: GameflowTracker,
    team: TeamCompositionTracker,
    draft: DraftAutomation,
    auto_connect_interval: Duration,
}

impl LcuRuntime {
    #[must_use = "the runtime stops when dropped"]
    pub fn start(
        connection: ConnectionManager,
        settings: Arc<dyn SettingsStore>,
        config: RuntimeConfig,
    ) -> (Self, RuntimeChannels) {
        let connection_rx = connection.events();
        let (gameflow, gameflow_rx) =
            GameflowTracker::start(connection.clone(), Arc::clone(&settings), config.gameflow);
        let (team, team_rx) =
            TeamCompositionTracker::start(gameflow.subscribe(), Arc::clone(&settings), config.team);
        let (draft, draft_rx) =
            DraftAutomation::start(connection.clone(), Arc::clone(&settings), config.draft);

        let runtime = Self {
            connection,
            settings,
            gameflow,
            team,
            draft,
            auto_connect_interval: config.auto_connect_interval,
        };
        if runtime.league_client_enabled() {
            runtime
                .connection
                .start_auto_connect(runtime.auto_connect_interval);
        } else {
            info!("local client integration disabled");
        }

        let channels = RuntimeChannels {
            connection: connection_rx,
            gameflow: gameflow_rx,
            team: team_rx,
            draft: draft_rx,
        };
        (runtime, channels)
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn gameflow(&self) -> &GameflowTracker {
        &self.gameflow
    }

    pub fn team(&self) -> &TeamCompositionTracker {
        &self.team
    }

    pub fn draft(&self) -> &DraftAutomation {
        &self.draft
    }

    pub fn league_client_enabled(&self) -> bool {
        flag(self.settings.as_ref(), keys::LEAGUE_CLIENT_ENABLED, true)
    }

    /// Persist the flag and start or stop the integration accordingly.
    ///
    /// Disabling stops auto-connect and closes the live connection.
    pub fn set_league_client_enabled(&self, enabled: bool) {
        self.settings
            .set(keys::LEAGUE_CLIENT_ENABLED, Value::Bool(enabled));
        if enabled {
            if !self.connection.is_auto_connecting() {
                info!("local client integration enabled");
                self.connection.start_auto_connect(self.auto_connect_interval);
            }
        } else {
            info!("local client integration disabled");
            self.connection.stop_auto_connect();
            self.connection.disconnect();
        }
    }
}

impl std::fmt::Debug for LcuRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LcuRuntime")
            .field("connection", &self.connection)
            .field("gameflow", &self.gameflow)
            .field("league_client_enabled", &self.league_client_enabled())
            .finish_non_exhaustive()
    }
}

impl Drop for LcuRuntime {
    fn drop(&mut self) {
        self.connection.stop_auto_connect();
    }
}
