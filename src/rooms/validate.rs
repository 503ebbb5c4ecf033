use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{AppResult, AppState, Envelope, membership::Membership, model::RoomId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Validity {
    is_valid: bool,
}

#[debug_handler(state = AppState)]
pub(crate) async fn validate(
    Path(room_id): Path<String>,
    State(membership): State<Membership>,
) -> AppResult<Json<Envelope<Validity>>> {
    let room_id = RoomId::parse(&room_id)?;
    let is_valid = membership.validate_room(&room_id).await?;
    Ok(Envelope::ok(Validity { is_valid }))
}
