use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    ApiJson, AppResult, AppState, Envelope,
    membership::Membership,
    model::{CommunicationUserId, DisplayName, Role, RoomId, RoomTitle},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewRoomRequest {
    user_id: String,
    display_name: String,
    room_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RoomMember {
    id: CommunicationUserId,
    display_name: DisplayName,
    role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewRoomResponse {
    room_id: RoomId,
    room_title: RoomTitle,
    created_by: DisplayName,
    created_by_id: CommunicationUserId,
    #[serde(with = "time::serde::rfc3339")]
    valid_from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    valid_until: OffsetDateTime,
    participants: Vec<RoomMember>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_room(
    State(membership): State<Membership>,
    ApiJson(NewRoomRequest { user_id, display_name, room_name }): ApiJson<NewRoomRequest>,
) -> AppResult<Json<Envelope<NewRoomResponse>>> {
    let display_name = DisplayName::parse(&display_name)?;
    let room_name = RoomTitle::parse_optional(room_name.as_deref())?;

    let created = membership.open_room(&user_id, display_name, room_name).await?;

    // only list the creator once the platform actually has them
    let participants = if created.presenter_added {
        vec![RoomMember {
            id: created.created_by_id.clone(),
            display_name: created.created_by.clone(),
            role: Role::Presenter,
        }]
    } else {
        Vec::new()
    };

    Ok(Envelope::ok(NewRoomResponse {
        room_id: created.room.room_id,
        room_title: created.title,
        created_by: created.created_by,
        created_by_id: created.created_by_id,
        valid_from: created.room.valid_from,
        valid_until: created.room.valid_until,
        participants,
    }))
}
