// Device feed: bootstrap, live merge, offline handling, shutdown.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use sensorlink_core::{
    AxisBounds, ConnectionState, CoreError, DeviceFeed, DeviceId, FeedConfig, FeedSnapshot,
    ReadingSource, SensorField, SensorReading,
};
use tokio::sync::watch;

use common::{Script, ScriptedConnector, sensor_update_json, settle, stream_url, temperature};

// ── Fixtures ────────────────────────────────────────────────────────

enum Bootstrap {
    Readings(Vec<SensorReading>),
    Fail(&'static str),
    Hang,
}

struct FakeSource {
    bootstrap: Bootstrap,
    calls: Mutex<Vec<(DeviceId, usize)>>,
}

impl FakeSource {
    fn new(bootstrap: Bootstrap) -> Arc<Self> {
        Arc::new(Self {
            bootstrap,
            calls: Mutex::new(Vec::new()),
        })
    }
}

impl ReadingSource for FakeSource {
    async fn recent_readings(
        &self,
        device: DeviceId,
        limit: usize,
    ) -> Result<Vec<SensorReading>, CoreError> {
        self.calls.lock().unwrap().push((device, limit));
        match &self.bootstrap {
            Bootstrap::Readings(readings) => Ok(readings.clone()),
            Bootstrap::Fail(message) => Err(CoreError::Api {
                message: (*message).to_owned(),
                status: Some(500),
            }),
            Bootstrap::Hang => std::future::pending().await,
        }
    }
}

async fn wait_for(
    rx: &mut watch::Receiver<Arc<FeedSnapshot>>,
    pred: impl Fn(&FeedSnapshot) -> bool,
) -> Arc<FeedSnapshot> {
    tokio::time::timeout(Duration::from_secs(300), async {
        loop {
            let snapshot = Arc::clone(&rx.borrow_and_update());
            if pred(&snapshot) {
                return snapshot;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("snapshot condition not reached")
}

fn three_temperatures() -> Vec<SensorReading> {
    vec![
        temperature(3, "18.0"),
        temperature(2, "20.0"),
        temperature(1, "19.5"),
    ]
}

// ── Bootstrap + live merge ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_bootstrap_then_stream_update() {
    let source = FakeSource::new(Bootstrap::Readings(three_temperatures()));
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let feed = DeviceFeed::start(
        Arc::clone(&source),
        connector,
        stream_url(),
        DeviceId(7),
        FeedConfig::default(),
    );
    let mut rx = feed.subscribe();

    assert!(feed.snapshot().loading);

    let seeded = wait_for(&mut rx, |s| !s.loading && s.link == ConnectionState::Open).await;
    assert_eq!(seeded.readings.len(), 3);
    assert_eq!(seeded.ingested, 0);
    assert_eq!(seeded.chart.values, vec![19.5, 20.0, 18.0]);
    assert_eq!(*source.calls.lock().unwrap(), vec![(DeviceId(7), 50)]);

    let remote = remotes.recv().await.unwrap();
    remote.push(&sensor_update_json(7, 4, "temperature", "21.0"));

    let merged = wait_for(&mut rx, |s| s.readings.len() == 4).await;
    let newest_first: Vec<f64> = merged
        .readings
        .iter()
        .filter_map(|r| r.value(SensorField::Temperature))
        .collect();
    assert_eq!(newest_first, vec![21.0, 18.0, 20.0, 19.5]);
    assert_eq!(merged.chart.field, Some(SensorField::Temperature));
    assert_eq!(merged.chart.values, vec![19.5, 20.0, 18.0, 21.0]);
    assert_eq!(merged.chart.bounds, AxisBounds { min: 16.0, max: 23.0 });
    assert_eq!(merged.latest().map(|r| r.id), Some(4));
    assert_eq!(merged.ingested, 1);
    assert!(!merged.offline);
}

#[tokio::test(start_paused = true)]
async fn test_resent_reading_is_counted_again() {
    let source = FakeSource::new(Bootstrap::Readings(three_temperatures()));
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let feed = DeviceFeed::start(source, connector, stream_url(), DeviceId(7), FeedConfig::default());
    let mut rx = feed.subscribe();

    let remote = remotes.recv().await.unwrap();
    remote.push(&sensor_update_json(7, 4, "temperature", "21.0"));
    remote.push(&sensor_update_json(7, 4, "temperature", "21.0"));

    let merged = wait_for(&mut rx, |s| s.ingested == 2).await;
    assert_eq!(
        merged.readings.iter().map(|r| r.id).take(2).collect::<Vec<_>>(),
        vec![4, 4]
    );
    assert_eq!(merged.readings.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_history_is_capped_at_capacity() {
    let source = FakeSource::new(Bootstrap::Readings(Vec::new()));
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let feed = DeviceFeed::start(source, connector, stream_url(), DeviceId(7), FeedConfig::default());
    let mut rx = feed.subscribe();

    let remote = remotes.recv().await.unwrap();
    for id in 1..=60 {
        remote.push(&sensor_update_json(7, id, "humidity", "40"));
    }

    let full = wait_for(&mut rx, |s| s.readings.first().map(|r| r.id) == Some(60)).await;
    assert_eq!(full.readings.len(), 50);
    assert_eq!(full.readings.last().map(|r| r.id), Some(11));
    assert_eq!(full.ingested, 60);
}

// ── Failure paths ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_bootstrap_failure_still_streams() {
    let source = FakeSource::new(Bootstrap::Fail("database unavailable"));
    let (connector, _remotes) = ScriptedConnector::new([], Script::Accept);
    let feed = DeviceFeed::start(source, connector, stream_url(), DeviceId(7), FeedConfig::default());
    let mut rx = feed.subscribe();

    let snapshot = wait_for(&mut rx, |s| s.link == ConnectionState::Open).await;
    assert!(!snapshot.loading);
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("API error: database unavailable")
    );
    assert!(snapshot.chart.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_timeout_clears_loading() {
    let source = FakeSource::new(Bootstrap::Hang);
    let (connector, _remotes) = ScriptedConnector::new([], Script::Accept);
    let feed = DeviceFeed::start(source, connector, stream_url(), DeviceId(7), FeedConfig::default());
    let mut rx = feed.subscribe();

    let snapshot = wait_for(&mut rx, |s| !s.loading).await;
    assert!(
        snapshot
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("Timed out")),
        "{:?}",
        snapshot.last_error
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_mark_offline_and_keep_history() {
    let source = FakeSource::new(Bootstrap::Readings(three_temperatures()));
    let (connector, _remotes) = ScriptedConnector::new([], Script::Refuse);
    let feed = DeviceFeed::start(source, Arc::clone(&connector), stream_url(), DeviceId(7), FeedConfig::default());
    let mut rx = feed.subscribe();

    let retrying = wait_for(&mut rx, |s| s.reconnect_in.is_some()).await;
    assert!(!retrying.offline);

    let offline = wait_for(&mut rx, |s| s.offline).await;
    assert_eq!(offline.link, ConnectionState::Closed);
    assert_eq!(offline.readings.len(), 3);
    assert_eq!(offline.chart.values, vec![19.5, 20.0, 18.0]);
    assert_eq!(connector.open_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_remote_error_frame_is_surfaced() {
    let source = FakeSource::new(Bootstrap::Readings(Vec::new()));
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let feed = DeviceFeed::start(source, connector, stream_url(), DeviceId(7), FeedConfig::default());
    let mut rx = feed.subscribe();

    let remote = remotes.recv().await.unwrap();
    remote.push(r#"{"type":"error","error":"sensor bus fault"}"#);

    let snapshot = wait_for(&mut rx, |s| s.last_error.is_some()).await;
    assert_eq!(snapshot.last_error.as_deref(), Some("sensor bus fault"));
    assert_eq!(snapshot.link, ConnectionState::Open);
}

// ── Teardown ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_publishing() {
    let source = FakeSource::new(Bootstrap::Readings(Vec::new()));
    let (connector, mut remotes) = ScriptedConnector::new([], Script::Accept);
    let feed = DeviceFeed::start(source, Arc::clone(&connector), stream_url(), DeviceId(7), FeedConfig::default());
    let mut rx = feed.subscribe();

    wait_for(&mut rx, |s| s.link == ConnectionState::Open).await;
    let remote = remotes.recv().await.unwrap();

    feed.shutdown();
    assert_eq!(feed.link().state(), ConnectionState::Closed);

    remote.push(&sensor_update_json(7, 1, "light", "300"));
    remote.close();
    tokio::time::sleep(Duration::from_secs(60)).await;
    settle().await;

    assert!(!rx.has_changed().unwrap_or(false));
    assert!(feed.snapshot().readings.is_empty());
    assert_eq!(connector.open_count(), 1);
}
