//! Serial viewer wire protocol.

use serde::{Deserialize, Serialize};

/// A frame sent to a serial viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    /// The viewer is attached.
    Connected {
        #[serde(rename = "serialId")]
        serial_id: String,
    },
    /// Buffered output from before the viewer attached.
    History { data: String },
    /// Live output.
    Data { data: String },
    /// The device closed.
    Disconnected,
    Error { error: String },
}

impl ServerFrame {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Deserialize)]
struct ClientFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<String>,
}

/// Text to write to the device for one inbound viewer message.
///
/// `{"type":"input","data":..}` yields `data`; any other JSON object is
/// ignored; a payload that is not JSON is written verbatim.
pub fn parse_client_input(message: &str) -> Option<String> {
    match serde_json::from_str::<serde_json::Value>(message) {
        Ok(value) => match serde_json::from_value::<ClientFrame>(value) {
            Ok(frame) if frame.kind == "input" => frame.data,
            _ => None,
        },
        Err(_) => Some(message.to_string()),
    }
}
