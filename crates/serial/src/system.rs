//! [`SerialOpener`] backed by the host's serial devices.
//!
//! `serialport` is blocking, so opening runs on the blocking pool and each
//! open port gets a dedicated reader thread that forwards decoded text into
//! the link's channel.

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serialport::{SerialPort, SerialPortType};
use tokio::sync::mpsc;

use crate::link::{LinkEvent, LinkWriter, PortInfo, SerialError, SerialLink, SerialOpener};

/// Read timeout; bounds how long the reader thread takes to notice a close.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 4096;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Opens real serial devices such as `/dev/ttyUSB0` or `COM3`.
#[derive(Debug, Clone, Default)]
pub struct SystemSerialOpener;

impl SystemSerialOpener {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SerialOpener for SystemSerialOpener {
    async fn open(&self, device_id: &str, baud_rate: u32) -> Result<SerialLink, SerialError> {
        let path = device_id.to_string();
        let unavailable = |reason: String| SerialError::PortUnavailable {
            device: device_id.to_string(),
            reason,
        };

        let (port, reader) = tokio::task::spawn_blocking(move || {
            let port = serialport::new(&path, baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .stop_bits(serialport::StopBits::One)
                .parity(serialport::Parity::None)
                .timeout(READ_TIMEOUT)
                .open()?;
            let reader = port.try_clone()?;
            Ok::<_, serialport::Error>((port, reader))
        })
        .await
        .map_err(|e| unavailable(e.to_string()))?
        .map_err(|e| unavailable(e.to_string()))?;

        let (tx, incoming) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));

        let reader_stop = Arc::clone(&stop);
        let thread_name = format!("serial-reader-{}", device_id.rsplit('/').next().unwrap_or(device_id));
        std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || read_loop(reader, tx, reader_stop))
            .map_err(|e| unavailable(e.to_string()))?;

        tracing::info!(device = device_id, baud_rate, "Serial port opened");

        Ok(SerialLink {
            incoming,
            writer: Box::new(SystemLinkWriter { port, stop }),
        })
    }

    async fn list_ports(&self) -> Result<Vec<PortInfo>, SerialError> {
        let ports = tokio::task::spawn_blocking(serialport::available_ports)
            .await
            .map_err(|e| SerialError::Io(e.to_string()))?
            .map_err(|e| SerialError::Io(e.to_string()))?;

        Ok(ports
            .into_iter()
            .map(|port| {
                let (manufacturer, serial_number) = match port.port_type {
                    SerialPortType::UsbPort(usb) => (usb.manufacturer, usb.serial_number),
                    _ => (None, None),
                };
                PortInfo {
                    path: port.port_name,
                    manufacturer,
                    serial_number,
                }
            })
            .collect())
    }
}

struct SystemLinkWriter {
    port: Box<dyn SerialPort>,
    stop: Arc<AtomicBool>,
}

impl LinkWriter for SystemLinkWriter {
    fn write(&mut self, data: &[u8]) -> Result<(), SerialError> {
        if self.stop.load(Ordering::Relaxed) {
            return Err(SerialError::Io("port is closed".to_string()));
        }
        self.port
            .write_all(data)
            .and_then(|()| self.port.flush())
            .map_err(|e| SerialError::Io(e.to_string()))
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn read_loop(mut port: Box<dyn SerialPort>, tx: mpsc::Sender<LinkEvent>, stop: Arc<AtomicBool>) {
    let mut buf = [0u8; READ_CHUNK];
    let mut pending = Vec::new();

    while !stop.load(Ordering::Relaxed) {
        match port.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let text = decode_chunk(&mut pending, &buf[..n]);
                if !text.is_empty() && tx.blocking_send(LinkEvent::Data(text)).is_err() {
                    return;
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock) => {}
            Err(e) => {
                let _ = tx.blocking_send(LinkEvent::Error(e.to_string()));
                break;
            }
        }
    }

    let _ = tx.blocking_send(LinkEvent::Closed);
}

/// Decode `bytes` as UTF-8, carrying an incomplete trailing sequence over to
/// the next chunk instead of mangling it.
pub(crate) fn decode_chunk(pending: &mut Vec<u8>, bytes: &[u8]) -> String {
    pending.extend_from_slice(bytes);
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}
