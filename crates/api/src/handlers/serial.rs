//! Serial console handlers: port discovery, per-equipment console
//! assignments, and the viewer WebSocket.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use relay_core::types::DbId;
use relay_db::models::serial_port::SerialPortConfig;
use relay_db::repositories::SerialPortRepo;
use relay_serial::{parse_client_input, PortInfo, ServerFrame};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Query parameters of the serial WebSocket.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialSocketQuery {
    /// Device identifier, e.g. `/dev/ttyUSB0`.
    pub id: Option<String>,
    pub baud_rate: Option<u32>,
}

// ---------------------------------------------------------------------------
// REST
// ---------------------------------------------------------------------------

/// GET /serial/ports
pub async fn list_ports(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<PortInfo>>> {
    Ok(Json(state.serial.list_ports().await?))
}

/// GET /equipment/{id}/serial-ports
pub async fn equipment_serial_ports(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(equipment_id): Path<DbId>,
) -> AppResult<Json<Vec<SerialPortConfig>>> {
    let ports = SerialPortRepo::list_for_equipment(&state.pool, equipment_id).await?;
    Ok(Json(ports))
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// GET /serial/ws?id=&baudRate=
///
/// Upgrades to a WebSocket attached to the device's shared session.
pub async fn serial_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SerialSocketQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user, query))
}

type Sink = SplitSink<WebSocket, Message>;

/// Manage one viewer connection after upgrade.
///
///   1. Attaches to the device session (opening the port if needed).
///   2. Spawns a sender task forwarding session frames to the socket.
///   3. Writes inbound messages to the device on the current task.
///   4. Detaches when either side goes away.
async fn handle_socket(socket: WebSocket, state: AppState, user: AuthUser, query: SerialSocketQuery) {
    let (mut sink, mut stream) = socket.split();

    let Some(device_id) = query.id.filter(|id| !id.is_empty()) else {
        reject(&mut sink, "Serial port id is required".to_string()).await;
        return;
    };
    let baud_rate = query.baud_rate.unwrap_or(state.config.serial_default_baud);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = match state.serial.attach(&device_id, baud_rate, tx).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(device = %device_id, error = %e, "Serial attach failed");
            reject(&mut sink, e.to_string()).await;
            return;
        }
    };
    tracing::info!(device = %device_id, user_id = user.user_id, "Serial viewer attached");

    // Sender task: forward session frames to the WebSocket sink. The
    // session drops our sender when the device closes.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if send_frame(&mut sink, &frame).await.is_err() {
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    let receive = async {
        while let Some(result) = stream.next().await {
            let input = match result {
                Ok(Message::Text(text)) => parse_client_input(text.as_str()),
                Ok(Message::Binary(bytes)) => Some(String::from_utf8_lossy(&bytes).into_owned()),
                Ok(Message::Close(_)) => break,
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(device = %device_id, error = %e, "Serial socket receive error");
                    break;
                }
            };
            if let Some(input) = input {
                if !state.serial.write(&device_id, &input).await {
                    tracing::debug!(device = %device_id, "Dropped input for closed serial device");
                }
            }
        }
    };

    tokio::select! {
        () = receive => {}
        _ = &mut send_task => {}
    }

    state.serial.detach(handle).await;
    send_task.abort();
    tracing::info!(device = %device_id, user_id = user.user_id, "Serial viewer detached");
}

async fn send_frame(sink: &mut Sink, frame: &ServerFrame) -> Result<(), axum::Error> {
    match frame.to_json() {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize serial frame");
            Ok(())
        }
    }
}

/// Tell the viewer why and close.
async fn reject(sink: &mut Sink, error: String) {
    let _ = send_frame(sink, &ServerFrame::Error { error }).await;
    let _ = sink.send(Message::Close(None)).await;
}
