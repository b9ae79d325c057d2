// Shared fixtures: a scripted stream connector and reading builders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures_util::StreamExt;
use futures_util::stream;
use sensorlink_api::{Connection, Connector, Error, SensorField, SensorReading, TransportEvent};
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

/// What the next `open()` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Refuse,
    Accept,
    Hang,
}

/// The far end of an accepted connection.
pub struct Remote {
    /// Push events into the client.
    pub frames: mpsc::UnboundedSender<TransportEvent>,
    /// Frames the client sent.
    pub sent: mpsc::UnboundedReceiver<String>,
}

impl Remote {
    pub fn push(&self, text: &str) {
        let _ = self.frames.send(TransportEvent::Text(text.to_owned()));
    }

    pub fn close(&self) {
        let _ = self.frames.send(TransportEvent::Closed {
            code: Some(1000),
            reason: "bye".into(),
        });
    }

    pub fn drain_sent(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(text) = self.sent.try_recv() {
            out.push(text);
        }
        out
    }
}

pub struct ScriptedConnector {
    script: Mutex<VecDeque<Script>>,
    fallback: Script,
    opens: Mutex<Vec<Instant>>,
    remotes: mpsc::UnboundedSender<Remote>,
}

impl ScriptedConnector {
    pub fn new(
        script: impl IntoIterator<Item = Script>,
        fallback: Script,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Remote>) {
        let (remotes, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            opens: Mutex::new(Vec::new()),
            remotes,
        });
        (connector, rx)
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    pub fn open_times(&self) -> Vec<Instant> {
        self.opens.lock().unwrap().clone()
    }
}

impl Connector for ScriptedConnector {
    async fn open(&self, _url: &Url) -> Result<Connection, Error> {
        self.opens.lock().unwrap().push(Instant::now());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        match step {
            Script::Refuse => Err(Error::WebSocketConnect("connection refused".into())),
            Script::Hang => std::future::pending().await,
            Script::Accept => {
                let (frames, mut inbound) = mpsc::unbounded_channel();
                let (outbound, sent) = mpsc::unbounded_channel();
                let _ = self.remotes.send(Remote { frames, sent });
                Ok(Connection {
                    inbound: stream::poll_fn(move |cx| inbound.poll_recv(cx)).boxed(),
                    outbound,
                })
            }
        }
    }
}

pub fn stream_url() -> Url {
    Url::parse("ws://test.invalid/ws/device/7").unwrap()
}

/// Let spawned tasks run without moving the clock meaningfully.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn reading(id: i64) -> SensorReading {
    let ts = Utc.timestamp_opt(1_714_564_800 + id, 0).single().unwrap();
    SensorReading::empty(id, ts)
}

pub fn temperature(id: i64, value: &str) -> SensorReading {
    reading(id).with(SensorField::Temperature, value)
}

pub fn sensor_update_json(device: i64, id: i64, field: &str, value: &str) -> String {
    serde_json::json!({
        "type": "sensor_update",
        "device_id": device,
        "data": {
            "id": id,
            field: value,
            "timestamp": "2024-05-01T12:00:00Z"
        }
    })
    .to_string()
}
