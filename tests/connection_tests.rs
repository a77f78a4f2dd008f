//! Integration tests for the `ConnectionManager`.
//!
//! Uses the scripted `MockLcu` from `tests/common` as both the REST channel
//! and the event socket, so discovery, handshake, decoding, liveness and
//! reconnect paths can be driven deterministically.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use lcu_link::connection::{ConnectionManager, ConnectionState};
use lcu_link::models::GameflowPhase;
use lcu_link::protocol::{GAMEFLOW_PHASE_PATH, HEALTH_CHECK_PATH};
use lcu_link::{LcuError, LcuEvent};
use reqwest::Method;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use common::{
    drain, init_tracing, manager, next_matching, test_config, wait_until, within, MockLcu,
    NoCredentials, ToggleCredentials, TEST_PORT,
};

// ════════════════════════════════════════════════════════════════════
// Handshake
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn connect_opens_both_channels() {
    init_tracing();
    let mock = MockLcu::new();
    let manager = manager(&mock);
    let mut events = manager.events();

    assert!(manager.connect().await);
    assert!(matches!(events.recv().await.unwrap(), LcuEvent::Connected));
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(manager.is_connected());
    assert_eq!(manager.credentials().unwrap().port, TEST_PORT);
    assert_eq!(mock.count_calls(Method::GET, HEALTH_CHECK_PATH), 1);
    assert_eq!(mock.socket_count(), 1);
}

#[tokio::test]
async fn missing_credentials_report_an_error() {
    let mock = MockLcu::new();
    let manager = ConnectionManager::with_parts(test_config(), NoCredentials, mock.clone());
    let mut events = manager.events();

    assert!(!manager.connect().await);
    match events.recv().await.unwrap() {
        LcuEvent::Error(message) => assert!(message.contains("credentials not found")),
        other => panic!("expected Error, got {other:?}"),
    }
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn failed_health_check_never_opens_a_socket() {
    let mock = MockLcu::new();
    mock.set_healthy(false);
    let manager = manager(&mock);
    let mut events = manager.events();

    assert!(!manager.connect().await);
    assert!(matches!(events.recv().await.unwrap(), LcuEvent::Error(_)));
    assert_eq!(mock.socket_count(), 0);
    assert!(manager.credentials().is_none());
}

#[tokio::test]
async fn later_handshake_supersedes_earlier_session() {
    let mock = MockLcu::new();
    let manager = manager(&mock);
    let mut events = manager.events();

    assert!(manager.connect().await);
    assert!(manager.subscribe("OnJsonApiEvent"));
    assert!(manager.connect().await);

    let connected = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, LcuEvent::Connected))
        .count();
    assert_eq!(connected, 2);
    assert_eq!(mock.socket_count(), 2);
    wait_until(|| mock.socket_closed(0)).await;
    assert!(!mock.socket_closed(1));
    // Subscriptions belong to the session they were made on.
    assert!(manager.subscriptions().is_empty());
}

// ════════════════════════════════════════════════════════════════════
// Disconnect
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn disconnect_is_idempotent() {
    let mock = MockLcu::new();
    let manager = manager(&mock);
    let mut events = manager.events();
    assert!(manager.connect().await);

    manager.disconnect();
    manager.disconnect();

    let disconnected = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, LcuEvent::Disconnected))
        .count();
    assert_eq!(disconnected, 1);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(manager.credentials().is_none());
    wait_until(|| mock.socket_closed(0)).await;
}

#[tokio::test]
async fn disconnect_without_session_is_silent() {
    let manager = manager(&MockLcu::new());
    let mut events = manager.events();
    manager.disconnect();
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn disconnect_discards_attempt_in_flight() {
    let mock = MockLcu::new();
    mock.set_events_delay(Duration::from_secs(1));
    let manager = manager(&mock);
    let mut events = manager.events();

    let attempt = tokio::spawn({
        let manager = manager.clone();
        async move { manager.connect().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(manager.state(), ConnectionState::Connecting);

    manager.disconnect();
    assert!(!within(attempt).await.unwrap());
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(drain(&mut events).is_empty());
    wait_until(|| mock.socket_count() == 1 && mock.socket_closed(0)).await;
}

// ════════════════════════════════════════════════════════════════════
// Subscriptions and requests
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn subscriptions_send_control_frames() {
    let mock = MockLcu::new();
    let manager = manager(&mock);
    let name = "OnJsonApiEvent_lol-gameflow_v1_gameflow-phase";

    assert!(!manager.subscribe(name));
    assert!(manager.connect().await);

    assert!(manager.subscribe(name));
    assert!(manager.subscriptions().contains(name));
    wait_until(|| mock.has_sent(r#"[5,"OnJsonApiEvent_lol-gameflow_v1_gameflow-phase"]"#)).await;

    assert!(manager.unsubscribe(name));
    assert!(manager.subscriptions().is_empty());
    wait_until(|| mock.has_sent(r#"[6,"OnJsonApiEvent_lol-gameflow_v1_gameflow-phase"]"#)).await;

    manager.subscribe(name);
    manager.disconnect();
    assert!(manager.subscriptions().is_empty());
    assert!(!manager.unsubscribe(name));
}

#[tokio::test]
async fn request_errors_carry_the_status() {
    let mock = MockLcu::new();
    let manager = manager(&mock);

    let err = assert_err!(manager.request(Method::GET, GAMEFLOW_PHASE_PATH, None).await);
    assert!(matches!(err, LcuError::NotConnected));

    assert!(manager.connect().await);
    let err = assert_err!(manager.request(Method::GET, GAMEFLOW_PHASE_PATH, None).await);
    assert!(err.is_not_found());

    mock.route_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("Lobby"));
    let phase: GameflowPhase = assert_ok!(manager.get_json(GAMEFLOW_PHASE_PATH).await);
    assert_eq!(phase, GameflowPhase::Lobby);

    let body = json!({ "championId": 1 });
    mock.route_json(Method::PATCH, "/x", json!(null));
    assert_ok!(manager.request(Method::PATCH, "/x", Some(&body)).await);
    assert_eq!(mock.bodies(Method::PATCH, "/x"), vec![body]);
}

// ════════════════════════════════════════════════════════════════════
// Event decoding
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn frames_are_translated_and_junk_is_dropped() {
    let mock = MockLcu::new();
    let manager = manager(&mock);
    let mut events = manager.events();
    assert!(manager.connect().await);
    assert!(matches!(events.recv().await.unwrap(), LcuEvent::Connected));

    mock.push_raw("");
    mock.push_raw("not json");
    mock.push_raw(r#"[0,"welcome"]"#);
    mock.push_event(GAMEFLOW_PHASE_PATH, "Update", json!("ChampSelect"));

    let first = within(events.recv()).await.unwrap();
    assert!(matches!(
        first,
        LcuEvent::GameflowPhase(GameflowPhase::ChampSelect)
    ));
    match within(events.recv()).await.unwrap() {
        LcuEvent::Raw(frame) => assert_eq!(frame.name, "OnJsonApiEvent"),
        other => panic!("expected Raw, got {other:?}"),
    }

    mock.push_event("/lol-champ-select/v1/session", "Delete", json!(null));
    let deleted = next_matching(&mut events, |e| matches!(e, LcuEvent::ChampSelectSession(_))).await;
    assert!(matches!(deleted, LcuEvent::ChampSelectSession(None)));

    mock.push_event("/lol-lobby/v2/lobby", "Update", json!({ "gameConfig": { "queueId": 420 } }));
    let lobby = next_matching(&mut events, |e| matches!(e, LcuEvent::LobbySession(_))).await;
    match lobby {
        LcuEvent::LobbySession(value) => assert_eq!(value["gameConfig"]["queueId"], 420),
        other => panic!("expected LobbySession, got {other:?}"),
    }
}

// ════════════════════════════════════════════════════════════════════
// Liveness and reconnect
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn failed_liveness_check_reconnects_once() {
    let mock = MockLcu::new();
    let manager = manager(&mock);
    let mut events = manager.events();
    assert!(manager.connect().await);

    mock.set_healthy(false);
    next_matching(&mut events, |e| matches!(e, LcuEvent::Disconnected)).await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    mock.set_healthy(true);

    let started = tokio::time::Instant::now();
    next_matching(&mut events, |e| matches!(e, LcuEvent::Connected)).await;
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(mock.socket_count(), 2);
    assert!(mock.socket_closed(0));
}

#[tokio::test(start_paused = true)]
async fn lost_socket_reconnects() {
    let mock = MockLcu::new();
    let manager = manager(&mock);
    let mut events = manager.events();
    assert!(manager.connect().await);

    mock.hang_up();
    next_matching(&mut events, |e| matches!(e, LcuEvent::Disconnected)).await;
    next_matching(&mut events, |e| matches!(e, LcuEvent::Connected)).await;
    assert_eq!(mock.socket_count(), 2);
    assert!(manager.is_connected());
}

#[tokio::test(start_paused = true)]
async fn failed_reconnect_is_not_repeated() {
    let mock = MockLcu::new();
    let manager = manager(&mock);
    let mut events = manager.events();
    assert!(manager.connect().await);

    mock.set_healthy(false);
    mock.hang_up();
    next_matching(&mut events, |e| matches!(e, LcuEvent::Disconnected)).await;
    next_matching(&mut events, |e| matches!(e, LcuEvent::Error(_))).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(drain(&mut events).is_empty());
    assert_eq!(mock.socket_count(), 1);
    // One handshake, one retry; liveness stopped with the session.
    assert_eq!(mock.count_calls(Method::GET, HEALTH_CHECK_PATH), 2);
}

// ════════════════════════════════════════════════════════════════════
// Auto-connect
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn auto_connect_is_quiet_until_the_client_appears() {
    let mock = MockLcu::new();
    let source = ToggleCredentials::default();
    let manager = ConnectionManager::with_parts(test_config(), source.clone(), mock.clone());
    let mut events = manager.events();

    manager.start_auto_connect(Duration::from_secs(5));
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(drain(&mut events).is_empty());
    assert!(!manager.is_connected());

    source.available.store(true, Ordering::Release);
    next_matching(&mut events, |e| matches!(e, LcuEvent::Connected)).await;

    // Connected: the supervisor stops attempting.
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(mock.socket_count(), 1);
    manager.stop_auto_connect();
}

#[tokio::test(start_paused = true)]
async fn auto_connect_recovers_after_explicit_disconnect() {
    let mock = MockLcu::new();
    let manager = manager(&mock);
    let mut events = manager.events();

    manager.start_auto_connect(Duration::from_secs(5));
    next_matching(&mut events, |e| matches!(e, LcuEvent::Connected)).await;

    manager.disconnect();
    next_matching(&mut events, |e| matches!(e, LcuEvent::Connected)).await;
    assert_eq!(mock.socket_count(), 2);
}
