//! Handlers for relay board commands and state queries.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::Json;
use relay_boards::BoardError;
use relay_core::relay_state::RelayState;
use relay_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /relay`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRelayRequest {
    pub board_id: DbId,
    /// 0-based relay index.
    pub relay_index: i64,
}

/// Query parameters for `GET /relay`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStateQuery {
    pub board_id: Option<DbId>,
    /// Bypass the cache and read the board.
    #[serde(default)]
    pub sync: bool,
}

/// Query parameters shared by the per-board-or-all endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardFilter {
    pub board_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct RelayStateResponse {
    pub success: bool,
    pub state: RelayState,
}

impl From<RelayState> for RelayStateResponse {
    fn from(state: RelayState) -> Self {
        Self {
            success: true,
            state,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /relay
///
/// Toggle one relay. Refused when the relay belongs to equipment locked by
/// someone else.
pub async fn toggle_relay(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ToggleRelayRequest>,
) -> AppResult<Json<RelayStateResponse>> {
    state
        .locks
        .ensure_relay_control(input.board_id, input.relay_index, &user.actor())
        .await?;

    let relay_state = state
        .boards
        .toggle_relay(input.board_id, input.relay_index)
        .await?;

    tracing::debug!(
        user_id = user.user_id,
        board_id = input.board_id,
        relay_index = input.relay_index,
        "Relay toggled on request",
    );
    Ok(Json(relay_state.into()))
}

/// GET /relay?boardId=&sync=
pub async fn get_relay_state(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<RelayStateQuery>,
) -> AppResult<Json<RelayStateResponse>> {
    let board_id = query
        .board_id
        .ok_or_else(|| AppError::BadRequest("boardId is required".to_string()))?;

    let relay_state = if query.sync {
        state.boards.sync_state(board_id).await?
    } else {
        state.boards.get_state(board_id).await?
    };
    Ok(Json(relay_state.into()))
}

/// GET /relay/ping?boardId=
///
/// Reachability of one board, or of every board when `boardId` is omitted.
/// An unknown board is reported offline, not as an error.
pub async fn ping_boards(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<BoardFilter>,
) -> AppResult<Json<HashMap<DbId, bool>>> {
    let online = match filter.board_id {
        Some(board_id) => {
            let connected = match state.boards.check_connection(board_id).await {
                Err(BoardError::BoardNotFound(_)) => false,
                other => other?,
            };
            HashMap::from([(board_id, connected)])
        }
        None => state.boards.check_all_connections().await?,
    };
    Ok(Json(online))
}

/// GET /relay/state?boardId=
///
/// Persisted relay states, without touching hardware.
pub async fn persisted_states(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<BoardFilter>,
) -> AppResult<Json<HashMap<DbId, RelayState>>> {
    let states = state.boards.persisted_states(filter.board_id).await?;
    Ok(Json(states))
}
