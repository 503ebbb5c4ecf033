mod join;
mod list;
mod new;
mod participants;
mod room;
mod validate;

use axum::{Router, routing::{get, post}};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(new::new_room))
        .route("/debug/all", get(list::all_rooms))
        .route("/{room_id}", get(room::room))
        .route("/{room_id}/join", post(join::join_room))
        .route("/{room_id}/participants", get(participants::participants))
        .route("/{room_id}/validate", get(validate::validate))
}
