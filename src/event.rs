//! Events published by the [`ConnectionManager`](crate::connection::ConnectionManager).

use serde_json::Value;
use tracing::debug;

use crate::models::{ChampSelectSession, GameflowPhase};
use crate::protocol::{
    ApiEvent, EventFrame, CHAMP_SELECT_SESSION_PATH, GAMEFLOW_PHASE_PATH, LOBBY_PATH,
};

/// Events delivered on the connection's broadcast channel.
#[derive(Debug, Clone)]
pub enum LcuEvent {
    /// The handshake succeeded and the event socket is open.
    ///
    /// Subscriptions do not survive a reconnect; dependents re-subscribe on
    /// every `Connected`.
    Connected,
    /// The connection was closed or lost.
    Disconnected,
    /// A connection attempt failed (not emitted by the auto-connect supervisor).
    Error(String),
    /// Every decoded event frame, whether or not it also produced a typed event.
    Raw(EventFrame),
    /// The gameflow phase changed.
    GameflowPhase(GameflowPhase),
    /// A new champion-select snapshot, or `None` when the session was deleted.
    ChampSelectSession(Option<Box<ChampSelectSession>>),
    /// The lobby resource changed. `Value::Null` when the lobby was deleted.
    LobbySession(Value),
}

impl LcuEvent {
    /// Translate a decoded frame into its typed event (if any) followed by the raw event.
    ///
    /// Translation keys on the payload `uri` so that resource-specific
    /// subscriptions and the catch-all `OnJsonApiEvent` behave the same.
    pub fn from_frame(frame: EventFrame) -> Vec<LcuEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(api) = frame.api_event() {
            if let Some(typed) = Self::typed(api) {
                events.push(typed);
            }
        }
        events.push(LcuEvent::Raw(frame));
        events
    }

    fn typed(api: ApiEvent) -> Option<LcuEvent> {
        let deleted = api.is_delete();
        match api.uri.as_str() {
            GAMEFLOW_PHASE_PATH => match api.data {
                Value::String(token) => Some(LcuEvent::GameflowPhase(token.into())),
                _ if deleted => Some(LcuEvent::GameflowPhase(GameflowPhase::None)),
                _ => None,
            },
            CHAMP_SELECT_SESSION_PATH => {
                if deleted || api.data.is_null() {
                    return Some(LcuEvent::ChampSelectSession(None));
                }
                match serde_json::from_value::<ChampSelectSession>(api.data) {
                    Ok(session) => Some(LcuEvent::ChampSelectSession(Some(Box::new(session)))),
                    Err(e) => {
                        debug!("champ select payload did not parse: {e}");
                        None
                    }
                }
            }
            LOBBY_PATH => {
                let data = if deleted { Value::Null } else { api.data };
                Some(LcuEvent::LobbySession(data))
            }
            _ => None,
        }
    }
}
