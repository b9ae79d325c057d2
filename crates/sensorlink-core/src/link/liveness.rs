use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Text sent as a liveness probe.
pub const LIVENESS_PROBE: &str = "ping";

/// Probe period while the stream is open.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(30);

/// Periodic liveness probe for one open connection.
///
/// Lives exactly as long as the session that created it; dropping it stops
/// probing. The first probe goes out one full period after the open.
pub(crate) struct LivenessProber {
    interval: Interval,
    outbound: mpsc::UnboundedSender<String>,
}

impl LivenessProber {
    pub(crate) fn start(period: Duration, outbound: mpsc::UnboundedSender<String>) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::trace!(period_secs = period.as_secs(), "liveness prober started");
        Self { interval, outbound }
    }

    /// Resolves when the next probe is due.
    pub(crate) async fn due(&mut self) {
        self.interval.tick().await;
    }

    /// Send one probe. A closed socket swallows it silently.
    pub(crate) fn probe(&self) {
        if self.outbound.send(LIVENESS_PROBE.to_owned()).is_err() {
            tracing::trace!("liveness probe dropped, socket not writable");
        }
    }
}

impl Drop for LivenessProber {
    fn drop(&mut self) {
        tracing::trace!("liveness prober stopped");
    }
}
