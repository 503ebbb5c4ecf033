use axum::{Json, debug_handler, extract::State};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::{AppResult, AppState, Envelope, membership::Membership, model::RoomId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RoomSummary {
    id: RoomId,
    #[serde(with = "time::serde::rfc3339")]
    valid_from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    valid_until: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomList {
    count: usize,
    rooms: Vec<RoomSummary>,
}

/// Diagnostic listing of every room on the platform.
#[debug_handler(state = AppState)]
pub(crate) async fn all_rooms(State(membership): State<Membership>) -> AppResult<Json<Envelope<RoomList>>> {
    let rooms: Vec<_> = membership
        .list_rooms()
        .await?
        .into_iter()
        .map(|record| RoomSummary {
            id: record.room_id,
            valid_from: record.valid_from,
            valid_until: record.valid_until,
            created_at: record.created_at,
        })
        .collect();

    info!(count = rooms.len(), "listed rooms");
    Ok(Envelope::ok(RoomList {
        count: rooms.len(),
        rooms,
    }))
}
