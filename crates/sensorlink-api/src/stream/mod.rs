// Live stream transport
//
// The per-device stream is a WebSocket at `{api root}/ws/device/{id}`
// carrying small JSON text frames. This module owns the URL rule, the
// frame decoder, and the `Connector` seam the connection manager drives.
// `WsConnector` is the tokio-tungstenite implementation; tests substitute
// their own.

pub mod frame;
pub mod websocket;

use std::future::Future;

use futures_util::stream::BoxStream;
use tokio::sync::mpsc;
use url::Url;

use crate::error::Error;
use crate::models::DeviceId;

pub use frame::{Frame, decode_frame};
pub use websocket::WsConnector;

/// Something observed on an open stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Text(String),
    /// A transport-level failure. The stream normally ends right after.
    Error(String),
    /// The remote end closed the connection.
    Closed { code: Option<u16>, reason: String },
}

/// An open stream: inbound events plus a queue for outbound text frames.
///
/// Dropping `outbound` (every clone of it) closes the socket.
pub struct Connection {
    pub inbound: BoxStream<'static, TransportEvent>,
    pub outbound: mpsc::UnboundedSender<String>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("outbound_closed", &self.outbound.is_closed())
            .finish_non_exhaustive()
    }
}

/// Opens stream connections.
pub trait Connector: Send + Sync + 'static {
    /// Open one connection. Resolves once the handshake succeeds or fails.
    fn open(&self, url: &Url) -> impl Future<Output = Result<Connection, Error>> + Send;
}

/// Stream URL for a device: the API root with `http` swapped for `ws`
/// (`https` for `wss`) and `/ws/device/{id}` appended to its path.
pub fn stream_url(api_root: &Url, device: DeviceId) -> Result<Url, Error> {
    let scheme = match api_root.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::UnsupportedScheme {
                scheme: other.to_owned(),
            });
        }
    };

    let mut url = api_root.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::UnsupportedScheme {
            scheme: api_root.scheme().to_owned(),
        })?;
    let path = format!(
        "{}/ws/device/{device}",
        api_root.path().trim_end_matches('/')
    );
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
