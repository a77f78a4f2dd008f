//! Wire protocol of the local client's event WebSocket.
//!
//! Every frame is a JSON array. Frames sent by this crate are two elements
//! long (`[5, name]` to subscribe, `[6, name]` to unsubscribe); frames sent by
//! the client are three elements long (`[8, name, payload]`). JSON-API event
//! payloads are objects of the form `{ "uri", "eventType", "data" }`.
//!
//! Decoding is deliberately lenient: the client sends blank heartbeat frames
//! and other opcodes that this crate does not use, and all of them decode to
//! `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Opcodes ─────────────────────────────────────────────────────────

/// Opcode of a subscribe frame.
pub const OPCODE_SUBSCRIBE: u8 = 5;
/// Opcode of an unsubscribe frame.
pub const OPCODE_UNSUBSCRIBE: u8 = 6;
/// Opcode of an event frame.
pub const OPCODE_EVENT: u8 = 8;

// ── Endpoints ───────────────────────────────────────────────────────

/// Lightweight endpoint used for the connect handshake and liveness checks.
pub const HEALTH_CHECK_PATH: &str = "/riotclient/region-locale";
/// Current gameflow phase, returned as a bare JSON string.
pub const GAMEFLOW_PHASE_PATH: &str = "/lol-gameflow/v1/gameflow-phase";
/// Current champion-select session; 404 outside of champion select.
pub const CHAMP_SELECT_SESSION_PATH: &str = "/lol-champ-select/v1/session";
/// Current lobby; 404 when not in a lobby.
pub const LOBBY_PATH: &str = "/lol-lobby/v2/lobby";
/// Accepts the pending ready check.
pub const READY_CHECK_ACCEPT_PATH: &str = "/lol-matchmaking/v1/ready-check/accept";

/// Path of a single champion-select action.
pub fn champ_select_action_path(action_id: i64) -> String {
    format!("{CHAMP_SELECT_SESSION_PATH}/actions/{action_id}")
}

// ── Event names ─────────────────────────────────────────────────────

/// Catch-all event covering every JSON-API resource.
pub const JSON_API_EVENT: &str = "OnJsonApiEvent";

/// Name of the event that reports changes to the resource at `uri`.
///
/// `"/lol-gameflow/v1/gameflow-phase"` becomes
/// `"OnJsonApiEvent_lol-gameflow_v1_gameflow-phase"`.
pub fn json_api_event(uri: &str) -> String {
    format!("{JSON_API_EVENT}{}", uri.replace('/', "_"))
}

// ── Frames ──────────────────────────────────────────────────────────

/// A decoded `[8, name, payload]` frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    pub name: String,
    pub payload: Value,
}

impl EventFrame {
    /// Interpret the payload as a JSON-API event, if it has that shape.
    pub fn api_event(&self) -> Option<ApiEvent> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}

/// Payload of a JSON-API event frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub uri: String,
    /// `Create`, `Update` or `Delete`.
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

impl ApiEvent {
    /// `true` when the resource was removed (e.g. champion select ended).
    pub fn is_delete(&self) -> bool {
        self.event_type.eq_ignore_ascii_case("Delete")
    }
}

/// Encode a subscribe frame for `event_name`.
pub fn subscribe_frame(event_name: &str) -> String {
    control_frame(OPCODE_SUBSCRIBE, event_name)
}

/// Encode an unsubscribe frame for `event_name`.
pub fn unsubscribe_frame(event_name: &str) -> String {
    control_frame(OPCODE_UNSUBSCRIBE, event_name)
}

fn control_frame(opcode: u8, event_name: &str) -> String {
    Value::Array(vec![Value::from(opcode), Value::from(event_name)]).to_string()
}

/// Decode an inbound frame. Empty, unparseable and non-event frames yield `None`.
pub fn decode_frame(text: &str) -> Option<EventFrame> {
    if text.trim().is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(text).ok()?;
    let Value::Array(items) = value else {
        return None;
    };
    let mut items = items.into_iter();
    let opcode = items.next()?.as_u64()?;
    if opcode != u64::from(OPCODE_EVENT) {
        return None;
    }
    let name = items.next()?.as_str()?.to_string();
    let payload = items.next()?;
    Some(EventFrame { name, payload })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn control_frames_are_two_element_arrays() {
        assert_eq!(subscribe_frame("OnJsonApiEvent"), r#"[5,"OnJsonApiEvent"]"#);
        assert_eq!(unsubscribe_frame("X"), r#"[6,"X"]"#);
    }

    #[test]
    fn event_names_are_derived_from_uris() {
        assert_eq!(
            json_api_event(GAMEFLOW_PHASE_PATH),
            "OnJsonApiEvent_lol-gameflow_v1_gameflow-phase"
        );
        assert_eq!(
            json_api_event(CHAMP_SELECT_SESSION_PATH),
            "OnJsonApiEvent_lol-champ-select_v1_session"
        );
    }

    #[test]
    fn event_frames_decode() {
        let text = r#"[8,"OnJsonApiEvent_lol-gameflow_v1_gameflow-phase",{"uri":"/lol-gameflow/v1/gameflow-phase","eventType":"Update","data":"Lobby"}]"#;
        let frame = decode_frame(text).unwrap();
        assert_eq!(frame.name, "OnJsonApiEvent_lol-gameflow_v1_gameflow-phase");
        let api = frame.api_event().unwrap();
        assert_eq!(api.uri, GAMEFLOW_PHASE_PATH);
        assert_eq!(api.data, json!("Lobby"));
        assert!(!api.is_delete());
    }

    #[test]
    fn blank_and_garbage_frames_are_dropped() {
        assert!(decode_frame("").is_none());
        assert!(decode_frame("   ").is_none());
        assert!(decode_frame("{not json").is_none());
        assert!(decode_frame(r#"{"a":1}"#).is_none());
        assert!(decode_frame("[8]").is_none());
        assert!(decode_frame(r#"[8,"name"]"#).is_none());
    }

    #[test]
    fn non_event_opcodes_are_ignored() {
        assert!(decode_frame(r#"[5,"OnJsonApiEvent"]"#).is_none());
        assert!(decode_frame(r#"[0,"session",1,"x"]"#).is_none());
    }

    #[test]
    fn action_paths_embed_the_action_id() {
        assert_eq!(
            champ_select_action_path(7),
            "/lol-champ-select/v1/session/actions/7"
        );
    }
}
