// Inbound frame decoding
//
// Frames are JSON objects discriminated by `type`:
//
//   {"type":"sensor_update","device_id":7,"data":{...reading...}}
//   {"type":"pong"}
//   {"type":"error","error":"..."}
//
// Anything else, including unknown types and non-JSON text, decodes to
// `Frame::Malformed`. Decoding never fails.

use serde::Deserialize;

use crate::models::{DeviceId, SensorReading};

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    SensorUpdate {
        device_id: DeviceId,
        reading: SensorReading,
    },
    Pong,
    Error {
        reason: String,
    },
    Malformed,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireFrame {
    SensorUpdate {
        #[serde(default)]
        device_id: Option<DeviceId>,
        #[serde(default)]
        data: Option<SensorReading>,
    },
    Pong,
    Error {
        #[serde(default)]
        error: Option<String>,
    },
}

/// Decode one text frame received on `connected_device`'s stream.
///
/// A `sensor_update` without a `device_id` is attributed to the device the
/// stream belongs to; one without `data` is malformed.
pub fn decode_frame(text: &str, connected_device: DeviceId) -> Frame {
    let wire = match serde_json::from_str::<WireFrame>(text) {
        Ok(wire) => wire,
        Err(e) => {
            tracing::debug!(error = %e, "undecodable stream frame");
            return Frame::Malformed;
        }
    };

    match wire {
        WireFrame::SensorUpdate {
            device_id,
            data: Some(reading),
        } => Frame::SensorUpdate {
            device_id: device_id.unwrap_or(connected_device),
            reading,
        },
        WireFrame::SensorUpdate { data: None, .. } => {
            tracing::debug!("sensor_update frame without data");
            Frame::Malformed
        }
        WireFrame::Pong => Frame::Pong,
        WireFrame::Error { error } => Frame::Error {
            reason: error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "unknown error".to_owned()),
        },
    }
}
