// ── Connection manager ──
//
// A single background task per `connect()` drives the link: open, run the
// session until the socket closes, then back off and retry. All state
// changes and event emissions from that task go through `Shared::gate`
// and are dropped once the run's token is cancelled, so nothing is
// observable after `disconnect()` returns.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use sensorlink_api::{Connection, Connector, DeviceId, Frame, TransportEvent, decode_frame};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::liveness::LivenessProber;
use super::{ConnectionState, LinkConfig, LinkEvent, ReconnectConfig};

const EVENT_CHANNEL_SIZE: usize = 1024;

/// Owns the live stream for one device.
///
/// Cheap handles to state and events are available through
/// [`watch_state`](Self::watch_state) and [`subscribe`](Self::subscribe).
/// Dropping the manager stops the link.
pub struct ConnectionManager<C: Connector> {
    shared: Arc<Shared>,
    connector: Arc<C>,
    run: Mutex<Option<CancellationToken>>,
    disposal: CancellationToken,
}

struct Shared {
    device_id: DeviceId,
    url: Url,
    reconnect: ReconnectConfig,
    liveness_interval: Duration,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<LinkEvent>,
    attempts: AtomicU32,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    gate: Mutex<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Closed,
    Cancelled,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(device_id: DeviceId, url: Url, connector: Arc<C>, config: LinkConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            shared: Arc::new(Shared {
                device_id,
                url,
                reconnect: config.reconnect,
                liveness_interval: config.liveness_interval,
                state,
                events,
                attempts: AtomicU32::new(0),
                outbound: Mutex::new(None),
                gate: Mutex::new(()),
            }),
            connector,
            run: Mutex::new(None),
            disposal: CancellationToken::new(),
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.shared.device_id
    }

    pub fn url(&self) -> &Url {
        &self.shared.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Consecutive failed reconnect attempts since the last successful open.
    pub fn attempt_count(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.shared.events.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Start the link. A no-op while already connecting or open.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        let mut run = self.run.lock().expect("link run lock poisoned");
        if self.disposal.is_cancelled() {
            return;
        }

        let state = self.state();
        if matches!(state, ConnectionState::Connecting | ConnectionState::Open) {
            debug!(device = %self.shared.device_id, %state, "connect ignored, link already active");
            return;
        }

        // A pending backoff from an earlier run is superseded.
        if let Some(previous) = run.take() {
            previous.cancel();
        }

        let cancel = self.disposal.child_token();
        self.shared.publish_state(&cancel, ConnectionState::Connecting);
        tokio::spawn(drive(
            Arc::clone(&self.shared),
            Arc::clone(&self.connector),
            cancel.clone(),
        ));
        *run = Some(cancel);
    }

    /// Stop the link and suppress reconnection until the next `connect()`.
    ///
    /// No events are delivered once this returns.
    pub fn disconnect(&self) {
        info!(device = %self.shared.device_id, "disconnecting stream");
        self.halt();
    }

    /// Queue a text frame. Returns `false` (and logs) when the stream is
    /// not open.
    pub fn send(&self, text: impl Into<String>) -> bool {
        if !self.is_connected() {
            warn!(device = %self.shared.device_id, "send ignored, stream not open");
            return false;
        }
        let outbound = self.shared.outbound.lock().expect("link outbound lock poisoned");
        match outbound.as_ref() {
            Some(tx) => tx.send(text.into()).is_ok(),
            None => {
                warn!(device = %self.shared.device_id, "send ignored, stream not open");
                false
            }
        }
    }

    fn halt(&self) {
        let run = self.run.lock().expect("link run lock poisoned").take();
        {
            // Under the gate: a racing `mark_open` must not reset the budget.
            let _gate = self.shared.gate.lock().expect("link gate poisoned");
            if let Some(cancel) = run {
                cancel.cancel();
            }
            self.shared
                .attempts
                .store(self.shared.reconnect.max_attempts, Ordering::SeqCst);
            self.shared.set_state(ConnectionState::Closed);
        }
        self.shared
            .outbound
            .lock()
            .expect("link outbound lock poisoned")
            .take();
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        self.halt();
        self.disposal.cancel();
        trace!(device = %self.shared.device_id, "connection manager dropped");
    }
}

// ── Link task ────────────────────────────────────────────────────────

async fn drive<C: Connector>(shared: Arc<Shared>, connector: Arc<C>, cancel: CancellationToken) {
    let device = shared.device_id;

    loop {
        if !shared.publish_state(&cancel, ConnectionState::Connecting) {
            break;
        }
        debug!(%device, url = %shared.url, "opening stream");

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connector.open(&shared.url) => result,
        };

        match opened {
            Ok(connection) => {
                if !shared.mark_open(&cancel) {
                    break;
                }
                info!(%device, "stream open");
                shared.emit(&cancel, LinkEvent::Connected);
                if shared.run_session(connection, &cancel).await == SessionEnd::Cancelled {
                    break;
                }
            }
            Err(e) => {
                warn!(%device, error = %e, "stream open failed");
                shared.emit(&cancel, LinkEvent::Error(e.to_string()));
            }
        }

        if !shared.publish_state(&cancel, ConnectionState::Closed) {
            break;
        }
        let reconnect_in = shared.next_backoff();
        shared.emit(&cancel, LinkEvent::Closed { reconnect_in });

        let Some(delay) = reconnect_in else {
            warn!(
                %device,
                max_attempts = shared.reconnect.max_attempts,
                "max reconnection attempts reached"
            );
            break;
        };
        info!(
            %device,
            attempt = shared.attempts.load(Ordering::SeqCst),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "reconnecting"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!(%device, "link task exiting");
}

impl Shared {
    async fn run_session(&self, connection: Connection, cancel: &CancellationToken) -> SessionEnd {
        let Connection {
            mut inbound,
            outbound,
        } = connection;
        *self.outbound.lock().expect("link outbound lock poisoned") = Some(outbound.clone());
        let mut prober = LivenessProber::start(self.liveness_interval, outbound);

        let end = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break SessionEnd::Cancelled,
                event = inbound.next() => match event {
                    Some(TransportEvent::Text(text)) => self.dispatch(&text, cancel),
                    Some(TransportEvent::Error(detail)) => {
                        warn!(device = %self.device_id, error = %detail, "stream error");
                        self.emit(cancel, LinkEvent::Error(detail));
                    }
                    Some(TransportEvent::Closed { code, reason }) => {
                        info!(device = %self.device_id, ?code, %reason, "stream closed by remote");
                        break SessionEnd::Closed;
                    }
                    None => {
                        info!(device = %self.device_id, "stream ended");
                        break SessionEnd::Closed;
                    }
                },
                () = prober.due() => prober.probe(),
            }
        };

        drop(prober);
        self.outbound
            .lock()
            .expect("link outbound lock poisoned")
            .take();
        end
    }

    fn dispatch(&self, text: &str, cancel: &CancellationToken) {
        match decode_frame(text, self.device_id) {
            Frame::Malformed => {
                debug!(device = %self.device_id, len = text.len(), "ignoring malformed frame");
            }
            frame => {
                trace!(device = %self.device_id, ?frame, "frame");
                self.emit(cancel, LinkEvent::Message(frame));
            }
        }
    }

    /// Claim the next reconnect attempt, or `None` once the budget is spent.
    fn next_backoff(&self) -> Option<Duration> {
        let max = self.reconnect.max_attempts;
        let previous = self
            .attempts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max).then_some(n + 1)
            })
            .ok()?;
        Some(self.reconnect.delay_for(previous + 1))
    }

    // ── Gated publication ────────────────────────────────────────────

    fn publish_state(&self, cancel: &CancellationToken, state: ConnectionState) -> bool {
        let _gate = self.gate.lock().expect("link gate poisoned");
        if cancel.is_cancelled() {
            return false;
        }
        self.set_state(state);
        true
    }

    fn mark_open(&self, cancel: &CancellationToken) -> bool {
        let _gate = self.gate.lock().expect("link gate poisoned");
        if cancel.is_cancelled() {
            return false;
        }
        self.attempts.store(0, Ordering::SeqCst);
        self.set_state(ConnectionState::Open);
        true
    }

    fn emit(&self, cancel: &CancellationToken, event: LinkEvent) {
        let _gate = self.gate.lock().expect("link gate poisoned");
        if cancel.is_cancelled() {
            return;
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Caller holds `gate`.
    fn set_state(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}
