// Connection manager behaviour against a scripted connector on a paused clock.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use sensorlink_core::{
    ConnectionManager, ConnectionState, DeviceId, Frame, LinkConfig, LinkEvent, TransportEvent,
};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::Instant;

use common::{Script, ScriptedConnector, sensor_update_json, settle, stream_url};

fn manager(
    connector: &std::sync::Arc<ScriptedConnector>,
) -> ConnectionManager<ScriptedConnector> {
    ConnectionManager::new(
        DeviceId(7),
        stream_url(),
        std::sync::Arc::clone(connector),
        LinkConfig::default(),
    )
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<LinkEvent>) -> Vec<LinkEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

// ── Reconnect ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_backoff_is_linear_and_bounded() {
    let (connector, _remotes) = ScriptedConnector::new([], Script::Refuse);
    let link = manager(&connector);
    let mut events = link.subscribe();

    let start = Instant::now();
    link.connect();
    tokio::time::sleep(Duration::from_secs(120)).await;

    let opens = connector.open_times();
    assert_eq!(opens.len(), 6, "initial attempt plus five retries");

    let gaps: Vec<Duration> = opens.windows(2).map(|w| w[1] - w[0]).collect();
    for (gap, expected_secs) in gaps.iter().zip([2u64, 4, 6, 8, 10]) {
        let expected = Duration::from_secs(expected_secs);
        assert!(
            *gap >= expected && *gap < expected + Duration::from_millis(50),
            "gap {gap:?} vs {expected:?}"
        );
    }
    assert!(opens[0] - start < Duration::from_millis(50));

    assert_eq!(link.attempt_count(), 5);
    assert_eq!(link.state(), ConnectionState::Closed);

    let scheduled: Vec<Option<Duration>> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            LinkEvent::Closed { reconnect_in } => Some(reconnect_in),
            _ => None,
        })
        .collect();
    assert_eq!(
        scheduled,
        vec![
            Some(Duration::from_secs(2)),
            Some(Duration::from_secs(4)),
            Some(Duration::from_secs(6)),
            Some(Duration::from_secs(8)),
            Some(Duration::from_secs(10)),
            None,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_successful_open_resets_attempts() {
    let (connector, mut remotes) =
        ScriptedConnector::new([Script::Refuse, Script::Refuse], Script::Accept);
    let link = manager(&connector);

    link.connect();
    settle().await;
    assert_eq!(link.attempt_count(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let _remote = remotes.recv().await.unwrap();

    assert_eq!(connector.open_count(), 3);
    assert_eq!(link.attempt_count(), 0);
    assert!(link.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_remote_close_triggers_reconnect() {
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let link = manager(&connector);
    let mut events = link.subscribe();

    link.connect();
    let first = remotes.recv().await.unwrap();
    settle().await;
    first.close();
    settle().await;

    assert_eq!(link.state(), ConnectionState::Closed);
    tokio::time::sleep(Duration::from_secs(2)).await;
    let _second = remotes.recv().await.unwrap();
    settle().await;

    assert_eq!(connector.open_count(), 2);
    assert!(link.is_connected());
    assert_eq!(
        drain(&mut events),
        vec![
            LinkEvent::Connected,
            LinkEvent::Closed {
                reconnect_in: Some(Duration::from_secs(2))
            },
            LinkEvent::Connected,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_remote_close_goes_straight_to_closed() {
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let link = manager(&connector);

    link.connect();
    let remote = remotes.recv().await.unwrap();
    settle().await;

    let mut states = link.watch_state();
    assert_eq!(*states.borrow_and_update(), ConnectionState::Open);

    let recorder = tokio::spawn(async move {
        let mut seen = Vec::new();
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            seen.push(state);
            if state == ConnectionState::Closed {
                break;
            }
        }
        seen
    });
    settle().await;

    remote.close();
    settle().await;

    assert_eq!(recorder.await.unwrap(), vec![ConnectionState::Closed]);
    assert_eq!(link.state().to_string(), "closed");
}

#[tokio::test(start_paused = true)]
async fn test_connect_after_exhaustion_tries_once_more() {
    let (connector, _remotes) = ScriptedConnector::new([], Script::Refuse);
    let link = manager(&connector);

    link.connect();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.open_count(), 6);

    link.connect();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.open_count(), 7);
    assert_eq!(link.state(), ConnectionState::Closed);
}

// ── Idempotence & teardown ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_connect_is_idempotent_while_connecting() {
    let (connector, _remotes) = ScriptedConnector::new([Script::Hang], Script::Accept);
    let link = manager(&connector);

    link.connect();
    link.connect();
    settle().await;
    link.connect();
    settle().await;

    assert_eq!(connector.open_count(), 1);
    assert_eq!(link.state(), ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_idempotent_while_open() {
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let link = manager(&connector);

    link.connect();
    let _remote = remotes.recv().await.unwrap();
    settle().await;
    link.connect();
    settle().await;

    assert_eq!(connector.open_count(), 1);
    assert!(link.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_suppresses_reconnect() {
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let link = manager(&connector);
    let mut events = link.subscribe();

    link.connect();
    let mut remote = remotes.recv().await.unwrap();
    settle().await;
    assert_eq!(drain(&mut events), vec![LinkEvent::Connected]);

    link.disconnect();
    assert_eq!(link.state(), ConnectionState::Closed);
    assert_eq!(link.attempt_count(), 5);

    remote.close();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.open_count(), 1);
    assert_eq!(link.state(), ConnectionState::Closed);
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    // Socket released, and no probe ever went out.
    assert_eq!(remote.sent.recv().await, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disconnect_racing_open_leaves_budget_spent() {
    for _ in 0..200 {
        let (connector, _remotes) = ScriptedConnector::new([], Script::Accept);
        let link = manager(&connector);
        link.connect();
        tokio::task::yield_now().await;
        link.disconnect();
        assert_eq!(link.attempt_count(), 5);
        assert_eq!(link.state(), ConnectionState::Closed);
    }
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_backoff() {
    let (connector, _remotes) = ScriptedConnector::new([], Script::Refuse);
    let link = manager(&connector);

    link.connect();
    settle().await;
    assert_eq!(link.attempt_count(), 1);

    link.disconnect();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.open_count(), 1);
    assert_eq!(link.attempt_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_drop_tears_down_link() {
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let link = manager(&connector);

    link.connect();
    let mut remote = remotes.recv().await.unwrap();
    settle().await;

    drop(link);
    assert_eq!(remote.sent.recv().await, None);

    remote.close();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.open_count(), 1);
}

// ── Frames ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_malformed_frames_are_dropped() {
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let link = manager(&connector);
    let mut events = link.subscribe();

    link.connect();
    let remote = remotes.recv().await.unwrap();
    settle().await;
    drain(&mut events);

    remote.push("not json");
    remote.push(r#"{"type":"firmware_update"}"#);
    settle().await;

    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert!(link.is_connected());

    remote.push(&sensor_update_json(7, 1, "distance", "12.5"));
    settle().await;
    match events.try_recv() {
        Ok(LinkEvent::Message(Frame::SensorUpdate { device_id, reading })) => {
            assert_eq!(device_id, DeviceId(7));
            assert_eq!(reading.distance.as_deref(), Some("12.5"));
        }
        other => panic!("expected sensor update, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_is_reported_without_state_change() {
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let link = manager(&connector);
    let mut events = link.subscribe();

    link.connect();
    let remote = remotes.recv().await.unwrap();
    settle().await;
    drain(&mut events);

    let _ = remote
        .frames
        .send(TransportEvent::Error("connection reset".into()));
    settle().await;

    assert_eq!(
        drain(&mut events),
        vec![LinkEvent::Error("connection reset".into())]
    );
    assert!(link.is_connected());
}

// ── Liveness & send ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_pings_every_thirty_seconds_while_open() {
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let link = manager(&connector);

    link.connect();
    let mut remote = remotes.recv().await.unwrap();
    settle().await;

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(remote.drain_sent().is_empty());

    tokio::time::sleep(Duration::from_secs(66)).await;
    assert_eq!(remote.drain_sent(), vec!["ping", "ping", "ping"]);

    remote.close();
    tokio::time::sleep(Duration::from_secs(90)).await;
    assert!(remote.drain_sent().is_empty());
    assert_eq!(remote.sent.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_send_only_while_open() {
    let (connector, mut remotes) = ScriptedConnector::new([Script::Hang], Script::Accept);
    let link = manager(&connector);

    assert!(!link.send("early"));

    link.connect();
    settle().await;
    assert!(!link.send("still connecting"));
    link.disconnect();

    link.connect();
    let mut remote = remotes.recv().await.unwrap();
    settle().await;
    assert!(link.send("hello"));
    settle().await;
    assert_eq!(remote.drain_sent(), vec!["hello"]);
}
