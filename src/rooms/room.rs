use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{AppResult, AppState, Envelope, membership::Membership, model::RoomId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RoomResponse {
    room_id: RoomId,
    #[serde(with = "time::serde::rfc3339")]
    valid_from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    valid_until: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    created_at: Option<OffsetDateTime>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn room(
    Path(room_id): Path<String>,
    State(membership): State<Membership>,
) -> AppResult<Json<Envelope<RoomResponse>>> {
    let room_id = RoomId::parse(&room_id)?;
    let record = membership.describe_room(&room_id).await?;

    Ok(Envelope::ok(RoomResponse {
        room_id: record.room_id,
        valid_from: record.valid_from,
        valid_until: record.valid_until,
        created_at: record.created_at,
    }))
}
