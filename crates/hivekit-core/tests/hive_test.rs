#![allow(clippy::unwrap_used)]
// Integration tests for `Hive`: polling, debounce, commands and change
// notifications against a wiremock upstream.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::task::JoinSet;
use tokio::time::Instant;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hivekit_core::{
    CoreError, HeatingMode, Hive, HiveConfig, REFRESH_CHANNEL_SIZE, RefreshOutcome, State,
};

// ── Helpers ─────────────────────────────────────────────────────────

const LOGIN_PATH: &str = "/v5/login";
const NODES_PATH: &str = "/omnia/nodes";
const COMMAND_DELAY: Duration = Duration::from_millis(200);

fn config(server: &MockServer) -> HiveConfig {
    let mut config = HiveConfig::new("bobby@charlton.com", "england66");
    config.login_url = Url::parse(&format!("{}{LOGIN_PATH}", server.uri())).unwrap();
    config.api_base = Some(Url::parse(&server.uri()).unwrap());
    config.poll_interval = Some(Duration::from_secs(3600));
    config.command_refresh_delay = COMMAND_DELAY;
    config
}

fn nodes_body() -> Value {
    json!({
        "nodes": [
            {
                "id": "heating-1",
                "name": "Thermostat",
                "attributes": {
                    "temperature": { "reportedValue": 19.5 },
                    "targetHeatTemperature": { "reportedValue": 21.0, "targetValue": 21.0 },
                    "stateHeatingRelay": { "reportedValue": "ON" },
                    "activeHeatCoolMode": { "reportedValue": "HEAT", "targetValue": "HEAT" }
                }
            },
            {
                "id": "water-1",
                "attributes": {
                    "supportsHotWater": { "reportedValue": true },
                    "stateHotWaterRelay": { "reportedValue": "OFF" },
                    "activeHeatCoolMode": { "reportedValue": "HEAT", "targetValue": "HEAT" }
                }
            },
            { "id": "hub-1", "attributes": {} }
        ]
    })
}

fn expected_state() -> State {
    State {
        heating: true,
        heating_boosted: false,
        current_heating_mode: HeatingMode::Scheduled,
        target_heating_mode: HeatingMode::Scheduled,
        current_temp: 19.5,
        target_temp: 21.0,
        hot_water: false,
        hot_water_boosted: false,
        heating_node_id: "heating-1".into(),
        hot_water_node_id: "water-1".into(),
    }
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ApiSession": "T1" })))
        .mount(server)
        .await;
}

async fn mount_nodes(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(NODES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body()))
        .mount(server)
        .await;
}

async fn mount_put(server: &MockServer, node_id: &str, status: u16) {
    Mock::given(method("PUT"))
        .and(path(format!("{NODES_PATH}/{node_id}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "nodes": [] })))
        .mount(server)
        .await;
}

/// Connect against a server that answers login and nodes normally.
async fn setup() -> (MockServer, Hive) {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_nodes(&server).await;
    let hive = Hive::connect(config(&server)).await.unwrap();
    (server, hive)
}

async fn node_gets(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "GET" && r.url.path() == NODES_PATH)
        .count()
}

// ── Connect ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_polls_once_and_caches_state() {
    let (server, hive) = setup().await;

    assert_eq!(hive.state().await, expected_state());
    assert!(hive.last_refresh().await.is_some());
    assert_eq!(node_gets(&server).await, 1);

    hive.shutdown().await;
}

#[tokio::test]
async fn test_rejected_login_fails_connect() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": { "reason": "bad creds" } })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(NODES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body()))
        .expect(0)
        .mount(&server)
        .await;

    let result = Hive::connect(config(&server)).await;
    match result {
        Err(CoreError::AuthenticationFailed { message }) => {
            assert!(message.contains("bad creds"), "message: {message}");
        }
        Err(other) => panic!("expected AuthenticationFailed, got: {other:?}"),
        Ok(_) => panic!("expected connect to fail"),
    }
}

#[tokio::test]
async fn test_failed_initial_poll_is_not_fatal() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(NODES_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let hive = Hive::connect(config(&server)).await.unwrap();
    assert_eq!(hive.state().await, State::default());
    assert!(hive.last_refresh().await.is_none());

    hive.shutdown().await;
}

// ── Refresh ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_refresh_keeps_stale_state() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(NODES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NODES_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let hive = Hive::connect(config(&server)).await.unwrap();
    let before = hive.last_refresh().await;

    assert_eq!(hive.refresh_now().await, RefreshOutcome::Failed);
    assert_eq!(hive.state().await, expected_state());
    assert_eq!(hive.last_refresh().await, before);

    hive.shutdown().await;
}

#[tokio::test]
async fn test_refresh_now_bypasses_debounce() {
    let (server, hive) = setup().await;

    assert_eq!(hive.refresh_now().await, RefreshOutcome::Refreshed);
    assert_eq!(node_gets(&server).await, 2);

    hive.shutdown().await;
}

#[tokio::test]
async fn test_ticks_within_debounce_are_skipped() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_nodes(&server).await;

    let mut config = config(&server);
    config.poll_interval = Some(Duration::from_secs(1));
    let hive = Hive::connect(config).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(node_gets(&server).await, 1);

    hive.shutdown().await;
}

#[tokio::test]
async fn test_ticks_refresh_once_debounce_has_passed() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_nodes(&server).await;

    let mut config = config(&server);
    config.poll_interval = Some(Duration::from_secs(1));
    config.debounce = Duration::ZERO;
    let hive = Hive::connect(config).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(node_gets(&server).await, 3);

    hive.shutdown().await;
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_command_schedules_delayed_refresh() {
    let (server, hive) = setup().await;

    Mock::given(method("PUT"))
        .and(path(format!("{NODES_PATH}/heating-1")))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "nodes": [{ "attributes": { "targetHeatTemperature": { "targetValue": 21.5 } } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "nodes": [] })))
        .expect(1)
        .mount(&server)
        .await;

    hive.set_target_temperature(21.5).await.unwrap();
    assert_eq!(node_gets(&server).await, 1);

    tokio::time::sleep(COMMAND_DELAY * 3).await;
    assert_eq!(node_gets(&server).await, 2);

    hive.shutdown().await;
}

#[tokio::test]
async fn test_back_to_back_commands_share_one_refresh() {
    let (server, hive) = setup().await;
    mount_put(&server, "heating-1", 200).await;

    hive.set_target_temperature(20.0).await.unwrap();
    hive.toggle_heating_boost(true, Duration::from_secs(1800)).await.unwrap();

    tokio::time::sleep(COMMAND_DELAY * 4).await;
    assert_eq!(node_gets(&server).await, 2);

    hive.shutdown().await;
}

#[tokio::test]
async fn test_full_refresh_queue_drops_requests_without_blocking_commands() {
    const FOLLOW_UP: Duration = Duration::from_secs(1);
    const SLOW_NODES: Duration = Duration::from_millis(500);

    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path(NODES_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(nodes_body())
                .set_delay(SLOW_NODES),
        )
        .mount(&server)
        .await;
    mount_put(&server, "heating-1", 200).await;

    let mut config = config(&server);
    config.command_refresh_delay = FOLLOW_UP;
    let hive = Hive::connect(config).await.unwrap();

    // All follow-ups come due while the first one is still fetching, so
    // the queue fills and the surplus is dropped.
    let burst = REFRESH_CHANNEL_SIZE + 4;
    let started = Instant::now();
    let mut commands = JoinSet::new();
    for _ in 0..burst {
        let hive = hive.clone();
        commands.spawn(async move { hive.set_target_temperature(20.0).await });
    }
    while let Some(joined) = commands.join_next().await {
        joined.unwrap().unwrap();
    }
    assert!(
        started.elapsed() < FOLLOW_UP,
        "commands took {:?}",
        started.elapsed()
    );

    // One refresh answers every queued request.
    tokio::time::sleep(FOLLOW_UP + SLOW_NODES * 3).await;
    assert_eq!(node_gets(&server).await, 2);

    // Commands keep working once the queue has drained.
    tokio::time::timeout(Duration::from_secs(2), hive.set_target_temperature(21.0))
        .await
        .unwrap()
        .unwrap();

    hive.shutdown().await;
}

#[tokio::test]
async fn test_hot_water_toggle_targets_hot_water_node() {
    let (server, hive) = setup().await;

    Mock::given(method("PUT"))
        .and(path(format!("{NODES_PATH}/water-1")))
        .and(body_json(json!({
            "nodes": [{ "attributes": {
                "activeHeatCoolMode": { "targetValue": "BOOST" },
                "scheduleLockDuration": { "targetValue": 60 }
            } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "nodes": [] })))
        .expect(1)
        .mount(&server)
        .await;

    hive.toggle_hot_water(true, Duration::from_secs(3600)).await.unwrap();

    hive.shutdown().await;
}

#[tokio::test]
async fn test_heating_mode_targets_heating_node() {
    let (server, hive) = setup().await;

    Mock::given(method("PUT"))
        .and(path(format!("{NODES_PATH}/heating-1")))
        .and(body_json(json!({
            "nodes": [{ "attributes": { "activeHeatCoolMode": { "targetValue": "OFF" } } }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "nodes": [] })))
        .expect(1)
        .mount(&server)
        .await;

    hive.set_target_heating_mode(HeatingMode::Off).await.unwrap();

    hive.shutdown().await;
}

#[tokio::test]
async fn test_command_before_first_poll_hits_empty_path() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(NODES_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{NODES_PATH}/")))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .expect(1)
        .mount(&server)
        .await;

    let hive = Hive::connect(config(&server)).await.unwrap();
    let err = hive
        .toggle_hot_water(true, Duration::from_secs(600))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));

    // A failed command schedules no follow-up refresh.
    tokio::time::sleep(COMMAND_DELAY * 3).await;
    assert_eq!(node_gets(&server).await, 1);

    hive.shutdown().await;
}

#[tokio::test]
async fn test_relogin_during_poll_is_used_by_commands() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ApiSession": "T1" })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ApiSession": "T2" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(NODES_PATH))
        .and(header("X-Omnia-Access-Token", "T1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NODES_PATH))
        .and(header("X-Omnia-Access-Token", "T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nodes_body()))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("{NODES_PATH}/heating-1")))
        .and(header("X-Omnia-Access-Token", "T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "nodes": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let hive = Hive::connect(config(&server)).await.unwrap();
    assert_eq!(hive.state().await, expected_state());

    hive.set_target_temperature(18.0).await.unwrap();

    hive.shutdown().await;
}

// ── Notifications ───────────────────────────────────────────────────

#[tokio::test]
async fn test_change_handler_receives_snapshots() {
    let (_server, hive) = setup().await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    hive.register_change_handler(move |state: &State| {
        let _ = tx.send(state.clone());
    })
    .await;

    // Registration delivers the current snapshot.
    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, expected_state());

    assert_eq!(hive.refresh_now().await, RefreshOutcome::Refreshed);
    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second, expected_state());

    hive.shutdown().await;
}

#[tokio::test]
async fn test_replacing_handler_discards_previous() {
    let (_server, hive) = setup().await;

    let (old_tx, mut old_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    hive.register_change_handler(move |_: &State| {
        let _ = old_tx.send(());
    })
    .await;
    tokio::time::timeout(Duration::from_secs(2), old_rx.recv())
        .await
        .unwrap();

    let (new_tx, mut new_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    hive.register_change_handler(move |_: &State| {
        let _ = new_tx.send(());
    })
    .await;
    tokio::time::timeout(Duration::from_secs(2), new_rx.recv())
        .await
        .unwrap();

    hive.refresh_now().await;
    tokio::time::timeout(Duration::from_secs(2), new_rx.recv())
        .await
        .unwrap();

    // The old handler was dropped with its sender.
    let closed = tokio::time::timeout(Duration::from_secs(2), old_rx.recv())
        .await
        .unwrap();
    assert!(closed.is_none());

    hive.shutdown().await;
}

#[tokio::test]
async fn test_slow_change_handler_does_not_hold_up_polling() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_nodes(&server).await;

    let mut config = config(&server);
    config.poll_interval = Some(Duration::from_secs(1));
    config.debounce = Duration::ZERO;
    let hive = Hive::connect(config).await.unwrap();

    hive.register_change_handler(|_: &State| std::thread::sleep(Duration::from_secs(3)))
        .await;

    // The handler is now busy; the runtime must not be.
    let started = Instant::now();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "runtime stalled for {:?}",
        started.elapsed()
    );

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(node_gets(&server).await >= 3);

    hive.shutdown().await;
}

#[tokio::test]
async fn test_subscribers_see_refreshed_state() {
    let (_server, hive) = setup().await;

    let mut rx = hive.subscribe();
    assert_eq!(*rx.borrow_and_update(), Arc::new(expected_state()));

    hive.refresh_now().await;
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(**rx.borrow(), expected_state());

    hive.shutdown().await;
}
