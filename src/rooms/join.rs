use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    ApiJson, AppResult, AppState, Envelope,
    membership::Membership,
    model::{CommunicationUserId, DisplayName, RoomId},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JoinRoomRequest {
    user_id: String,
    display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JoinRoomResponse {
    room_id: RoomId,
    user_id: CommunicationUserId,
    display_name: DisplayName,
    #[serde(with = "time::serde::rfc3339")]
    joined_at: OffsetDateTime,
    success: bool,
}

#[debug_handler(state = AppState)]
pub(crate) async fn join_room(
    Path(room_id): Path<String>,
    State(membership): State<Membership>,
    ApiJson(JoinRoomRequest { user_id, display_name }): ApiJson<JoinRoomRequest>,
) -> AppResult<Json<Envelope<JoinRoomResponse>>> {
    let room_id = RoomId::parse(&room_id)?;
    let display_name = DisplayName::parse(&display_name)?;

    let joined = membership.join_as(&user_id, display_name, room_id).await?;

    Ok(Envelope::ok(JoinRoomResponse {
        room_id: joined.room_id,
        user_id: joined.user_id,
        display_name: joined.display_name,
        joined_at: joined.joined_at,
        success: true,
    }))
}
