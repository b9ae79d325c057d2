// ── Device feed ──
//
// Everything a device view needs: a one-off history bootstrap over REST,
// then a live link whose sensor updates are merged into the history and
// re-charted. Consumers watch `FeedSnapshot`s; they never touch the link
// or the buffer directly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sensorlink_api::{ApiClient, Connector, DeviceId, Frame, SensorReading};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::chart::ChartSeries;
use crate::config::FeedConfig;
use crate::error::CoreError;
use crate::history::HistoryBuffer;
use crate::link::{ConnectionManager, ConnectionState, LinkEvent};

/// Where bootstrap history comes from.
pub trait ReadingSource: Send + Sync + 'static {
    /// Up to `limit` most recent readings, newest first.
    fn recent_readings(
        &self,
        device: DeviceId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SensorReading>, CoreError>> + Send;
}

impl ReadingSource for ApiClient {
    async fn recent_readings(
        &self,
        device: DeviceId,
        limit: usize,
    ) -> Result<Vec<SensorReading>, CoreError> {
        let limit = u32::try_from(limit).unwrap_or(u32::MAX);
        self.list_readings(device, limit)
            .await
            .map_err(|e| CoreError::from(e).for_device(device))
    }
}

/// What a device view renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub device_id: DeviceId,
    /// Bootstrap still in flight.
    pub loading: bool,
    pub link: ConnectionState,
    /// Reconnect attempts are exhausted. History stays visible.
    pub offline: bool,
    /// Delay before the next reconnect, while one is pending.
    pub reconnect_in: Option<Duration>,
    /// Latest recoverable error (bootstrap failure or remote error frame).
    pub last_error: Option<String>,
    /// Newest first.
    pub readings: Vec<SensorReading>,
    pub chart: ChartSeries,
    /// Streamed readings merged so far. Bootstrap history is not counted,
    /// and neither is eviction, so it only grows.
    pub ingested: u64,
}

impl FeedSnapshot {
    fn loading(device_id: DeviceId) -> Self {
        Self {
            device_id,
            loading: true,
            link: ConnectionState::Idle,
            offline: false,
            reconnect_in: None,
            last_error: None,
            readings: Vec::new(),
            chart: ChartSeries::default(),
            ingested: 0,
        }
    }

    pub fn latest(&self) -> Option<&SensorReading> {
        self.readings.first()
    }
}

/// A running device view session.
///
/// Dropping the feed shuts it down.
pub struct DeviceFeed<C: Connector> {
    device_id: DeviceId,
    manager: Arc<ConnectionManager<C>>,
    snapshot_tx: Arc<watch::Sender<Arc<FeedSnapshot>>>,
    snapshot_rx: watch::Receiver<Arc<FeedSnapshot>>,
    cancel: CancellationToken,
}

impl<C: Connector> DeviceFeed<C> {
    /// Begin bootstrapping and, once history is in, stream live updates
    /// from `stream_url`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<S: ReadingSource>(
        source: Arc<S>,
        connector: Arc<C>,
        stream_url: Url,
        device_id: DeviceId,
        config: FeedConfig,
    ) -> Self {
        let manager = Arc::new(ConnectionManager::new(
            device_id,
            stream_url,
            connector,
            config.link,
        ));
        let (tx, rx) = watch::channel(Arc::new(FeedSnapshot::loading(device_id)));
        let snapshot_tx = Arc::new(tx);
        let cancel = CancellationToken::new();

        tokio::spawn(run_feed(
            source,
            Arc::clone(&manager),
            Arc::clone(&snapshot_tx),
            cancel.clone(),
            config,
        ));

        Self {
            device_id,
            manager,
            snapshot_tx,
            snapshot_rx: rx,
            cancel,
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<FeedSnapshot>> {
        self.snapshot_rx.clone()
    }

    pub fn snapshot(&self) -> Arc<FeedSnapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    /// The underlying link, e.g. to `send` a frame.
    pub fn link(&self) -> &ConnectionManager<C> {
        &self.manager
    }

    /// Stop streaming. No snapshot is published after this returns.
    pub fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        // Cancel under the snapshot lock so an in-flight publish either
        // lands first or sees the cancellation.
        self.snapshot_tx.send_if_modified(|_| {
            self.cancel.cancel();
            false
        });
        self.manager.disconnect();
        debug!(device = %self.device_id, "device feed shut down");
    }
}

impl<C: Connector> Drop for DeviceFeed<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Feed task ────────────────────────────────────────────────────────

async fn run_feed<S: ReadingSource, C: Connector>(
    source: Arc<S>,
    manager: Arc<ConnectionManager<C>>,
    tx: Arc<watch::Sender<Arc<FeedSnapshot>>>,
    cancel: CancellationToken,
    config: FeedConfig,
) {
    let device = manager.device_id();
    let mut view = FeedView::new(device, config.history_capacity);

    let fetched = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = tokio::time::timeout(
            config.bootstrap_timeout,
            source.recent_readings(device, config.history_capacity),
        ) => result,
    };
    match fetched {
        Ok(Ok(readings)) => {
            info!(%device, count = readings.len(), "history bootstrapped");
            view.bootstrap(readings);
        }
        Ok(Err(e)) => {
            warn!(%device, error = %e, "history bootstrap failed");
            view.last_error = Some(e.to_string());
        }
        Err(_) => {
            warn!(%device, timeout_secs = config.bootstrap_timeout.as_secs(), "history bootstrap timed out");
            view.last_error = Some(format!(
                "Timed out loading history after {}s",
                config.bootstrap_timeout.as_secs()
            ));
        }
    }
    view.loading = false;
    publish(&tx, &cancel, &view);

    let mut events = manager.subscribe();
    let mut state = manager.watch_state();
    manager.connect();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if view.apply(event) {
                        publish(&tx, &cancel, &view);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%device, skipped, "feed fell behind the link, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let link = *state.borrow_and_update();
                if view.set_link(link) {
                    publish(&tx, &cancel, &view);
                }
            }
        }
    }

    debug!(%device, "feed task exiting");
}

fn publish(tx: &watch::Sender<Arc<FeedSnapshot>>, cancel: &CancellationToken, view: &FeedView) {
    tx.send_if_modified(|current| {
        if cancel.is_cancelled() {
            return false;
        }
        *current = Arc::new(view.snapshot());
        true
    });
}

/// Mutable state behind the snapshots.
struct FeedView {
    device_id: DeviceId,
    history: HistoryBuffer,
    chart: ChartSeries,
    loading: bool,
    link: ConnectionState,
    offline: bool,
    reconnect_in: Option<Duration>,
    last_error: Option<String>,
    ingested: u64,
}

impl FeedView {
    fn new(device_id: DeviceId, capacity: usize) -> Self {
        Self {
            device_id,
            history: HistoryBuffer::new(capacity),
            chart: ChartSeries::default(),
            loading: true,
            link: ConnectionState::Idle,
            offline: false,
            reconnect_in: None,
            last_error: None,
            ingested: 0,
        }
    }

    fn bootstrap(&mut self, readings: Vec<SensorReading>) {
        self.history.bootstrap(readings);
        self.rechart();
    }

    fn rechart(&mut self) {
        self.chart = ChartSeries::from_readings(self.history.iter());
    }

    /// Fold one link event in. Returns whether anything visible changed.
    fn apply(&mut self, event: LinkEvent) -> bool {
        match event {
            LinkEvent::Message(Frame::SensorUpdate { device_id, reading }) => {
                if device_id != self.device_id {
                    debug!(device = %self.device_id, sender = %device_id, "update attributed to another device");
                }
                self.history.ingest(reading);
                self.ingested += 1;
                self.rechart();
                true
            }
            LinkEvent::Message(Frame::Error { reason }) => {
                warn!(device = %self.device_id, %reason, "remote error");
                self.last_error = Some(reason);
                true
            }
            LinkEvent::Message(Frame::Pong) => {
                trace!(device = %self.device_id, "pong");
                false
            }
            LinkEvent::Message(Frame::Malformed) => false,
            LinkEvent::Connected => {
                self.link = ConnectionState::Open;
                self.offline = false;
                self.reconnect_in = None;
                true
            }
            LinkEvent::Closed { reconnect_in } => {
                self.link = ConnectionState::Closed;
                self.offline = reconnect_in.is_none();
                self.reconnect_in = reconnect_in;
                true
            }
            LinkEvent::Error(detail) => {
                debug!(device = %self.device_id, %detail, "link error");
                false
            }
        }
    }

    fn set_link(&mut self, link: ConnectionState) -> bool {
        if self.link == link {
            return false;
        }
        self.link = link;
        if link == ConnectionState::Connecting {
            self.reconnect_in = None;
        }
        true
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            device_id: self.device_id,
            loading: self.loading,
            link: self.link,
            offline: self.offline,
            reconnect_in: self.reconnect_in,
            last_error: self.last_error.clone(),
            readings: self.history.to_vec(),
            chart: self.chart.clone(),
            ingested: self.ingested,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn update(id: i64) -> LinkEvent {
        LinkEvent::Message(Frame::SensorUpdate {
            device_id: DeviceId(4),
            reading: SensorReading::empty(id, DateTime::<Utc>::UNIX_EPOCH),
        })
    }

    #[test]
    fn ingested_counts_repeated_ids() {
        let mut view = FeedView::new(DeviceId(4), 50);
        view.bootstrap(vec![SensorReading::empty(9, DateTime::<Utc>::UNIX_EPOCH)]);
        assert_eq!(view.snapshot().ingested, 0);

        assert!(view.apply(update(9)));
        assert!(view.apply(update(9)));
        let snap = view.snapshot();
        assert_eq!(snap.ingested, 2);
        assert_eq!(
            snap.readings.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![9, 9, 9]
        );
    }

    #[test]
    fn ingested_keeps_growing_past_capacity() {
        let mut view = FeedView::new(DeviceId(4), 3);
        for id in 0..10 {
            view.apply(update(id));
        }
        let snap = view.snapshot();
        assert_eq!(snap.readings.len(), 3);
        assert_eq!(snap.ingested, 10);
    }

    #[test]
    fn non_reading_events_do_not_count() {
        let mut view = FeedView::new(DeviceId(4), 50);
        view.apply(LinkEvent::Connected);
        view.apply(LinkEvent::Message(Frame::Pong));
        view.apply(LinkEvent::Message(Frame::Error {
            reason: "device unknown".into(),
        }));
        assert_eq!(view.snapshot().ingested, 0);
    }
}
