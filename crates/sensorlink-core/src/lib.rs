// sensorlink-core: live telemetry channel, reading history, and chart
// geometry on top of sensorlink-api.

pub mod chart;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod history;
pub mod link;

pub use chart::{AxisBounds, ChartPoint, ChartSeries, Extreme};
pub use config::{AuthCredentials, ClientConfig, FeedConfig, TlsVerification};
pub use dashboard::Dashboard;
pub use error::CoreError;
pub use feed::{DeviceFeed, FeedSnapshot, ReadingSource};
pub use history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer};
pub use link::{ConnectionManager, ConnectionState, LinkConfig, LinkEvent, ReconnectConfig};

// Re-export the wire types consumers work with.
pub use sensorlink_api::{
    Connection, Connector, Device, DeviceCreate, DeviceId, DeviceUpdate, Frame, Health,
    SensorField, SensorReading, Session, TransportEvent, WsConnector,
};
