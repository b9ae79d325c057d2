// sensorlink-api: Async Rust client for the sensorlink device backend (REST + live stream)

mod auth;
pub mod client;
mod devices;
pub mod error;
pub mod models;
mod readings;
pub mod stream;
mod system;
pub mod transport;

pub use client::ApiClient;
pub use error::Error;
pub use models::{
    DeletedDevice, Device, DeviceCreate, DeviceId, DeviceUpdate, Health, SensorField,
    SensorReading, Session,
};
pub use stream::{Connection, Connector, Frame, TransportEvent, WsConnector, decode_frame, stream_url};
pub use transport::{TlsMode, TransportConfig};
