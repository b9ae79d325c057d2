// ── Live device link ──
//
// One `ConnectionManager` per watched device. It owns the stream socket,
// reconnects with linear backoff, probes liveness while open, and fans
// decoded frames out to subscribers.

mod liveness;
mod manager;
mod reconnect;

use std::time::Duration;

use sensorlink_api::Frame;

pub use liveness::{DEFAULT_LIVENESS_INTERVAL, LIVENESS_PROBE};
pub use manager::ConnectionManager;
pub use reconnect::ReconnectConfig;

/// Tuning for one device link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    pub reconnect: ReconnectConfig,
    /// Period between liveness probes while open.
    pub liveness_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
        }
    }
}

/// Lifecycle of the stream connection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    strum::Display,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

/// What subscribers hear from a `ConnectionManager`.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The stream opened.
    Connected,
    /// A decoded frame. Malformed frames are never delivered.
    Message(Frame),
    /// The stream closed (or failed to open). `reconnect_in` is the delay
    /// before the next attempt, or `None` once retries are exhausted.
    Closed { reconnect_in: Option<Duration> },
    /// A transport failure. Informational; a `Closed` follows.
    Error(String),
}
