//! Port to a physical serial device.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Serial port {device} is unavailable: {reason}")]
    PortUnavailable { device: String, reason: String },

    #[error("Serial I/O error: {0}")]
    Io(String),
}

/// Something the device side of a link reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Inbound text, already decoded.
    Data(String),
    /// A read error; the link may still be usable.
    Error(String),
    /// The device went away. No further events follow.
    Closed,
}

/// Write half of an open link.
pub trait LinkWriter: Send {
    fn write(&mut self, data: &[u8]) -> Result<(), SerialError>;

    /// Release the device. Further writes fail; the read side ends.
    fn close(&mut self);
}

/// An open physical connection.
pub struct SerialLink {
    pub incoming: mpsc::Receiver<LinkEvent>,
    pub writer: Box<dyn LinkWriter>,
}

/// A serial device visible on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortInfo {
    pub path: String,
    pub manufacturer: Option<String>,
    pub serial_number: Option<String>,
}

/// Opens physical serial devices.
#[async_trait]
pub trait SerialOpener: Send + Sync {
    async fn open(&self, device_id: &str, baud_rate: u32) -> Result<SerialLink, SerialError>;

    /// Devices currently present on the host.
    async fn list_ports(&self) -> Result<Vec<PortInfo>, SerialError>;
}
