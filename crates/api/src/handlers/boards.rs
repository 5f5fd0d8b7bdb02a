//! Handlers for board occupancy queries.

use axum::extract::{Path, Query, State};
use axum::Json;
use relay_core::error::CoreError;
use relay_core::occupancy::{find_available_slots, RelayRange};
use relay_core::types::DbId;
use relay_db::models::equipment::EquipmentPlacement;
use relay_db::repositories::{BoardRepo, EquipmentRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    /// Width of the range to place.
    pub relay_count: i32,
    /// Equipment being moved; its own range does not count as occupied.
    pub exclude_equipment_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    pub board_id: DbId,
    pub total_relays: i32,
    /// 1-based start positions where the range fits.
    pub slots: Vec<i32>,
    pub occupied: Vec<EquipmentPlacement>,
}

/// GET /boards/{id}/slots?relayCount=&excludeEquipmentId=
pub async fn available_slots(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(board_id): Path<DbId>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<SlotsResponse>> {
    if query.relay_count < 1 {
        return Err(AppError::BadRequest(
            "relayCount must be at least 1".to_string(),
        ));
    }

    let board = BoardRepo::find_by_id(&state.pool, board_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "RelayBoard",
            id: board_id,
        }))?;

    let occupied: Vec<EquipmentPlacement> = EquipmentRepo::list_placements(&state.pool, board_id)
        .await?
        .into_iter()
        .filter(|placement| Some(placement.id) != query.exclude_equipment_id)
        .collect();
    let ranges: Vec<RelayRange> = occupied.iter().map(EquipmentPlacement::range).collect();

    Ok(Json(SlotsResponse {
        board_id,
        total_relays: board.total_relays,
        slots: find_available_slots(board.total_relays, &ranges, query.relay_count),
        occupied,
    }))
}
