use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{
    AppResult, AppState, Envelope,
    membership::Membership,
    model::{Role, RoomId},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ParticipantView {
    id: String,
    role: Role,
    display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ParticipantsResponse {
    room_id: RoomId,
    count: usize,
    participants: Vec<ParticipantView>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn participants(
    Path(room_id): Path<String>,
    State(membership): State<Membership>,
) -> AppResult<Json<Envelope<ParticipantsResponse>>> {
    let room_id = RoomId::parse(&room_id)?;
    let details = membership.participants(&room_id).await?;

    // the platform keeps no names, so participants are numbered
    let participants: Vec<_> = details
        .participants
        .into_iter()
        .enumerate()
        .map(|(i, p)| ParticipantView {
            id: p.identity,
            role: p.role,
            display_name: format!("User {}", i + 1),
        })
        .collect();

    Ok(Envelope::ok(ParticipantsResponse {
        room_id,
        count: participants.len(),
        participants,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::{
        model::DisplayName,
        testing::{FakePlatform, send},
    };

    #[tokio::test]
    async fn alice_and_bob() {
        let platform = FakePlatform::new();
        let membership = platform.membership();
        let alice = membership
            .create_and_join(DisplayName::parse("Alice").unwrap(), None)
            .await
            .unwrap();
        let bob = membership
            .join_existing(DisplayName::parse("Bob").unwrap(), alice.room_id.clone())
            .await
            .unwrap();

        let (status, body) = send(
            &platform,
            Method::GET,
            &format!("/api/rooms/{}/participants", alice.room_id),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["count"], 2);
        assert_eq!(
            body["data"]["participants"],
            json!([
                { "id": alice.user_id.as_str(), "role": "Presenter", "displayName": "User 1" },
                { "id": bob.user_id.as_str(), "role": "Attendee", "displayName": "User 2" },
            ])
        );
    }

    #[tokio::test]
    async fn unknown_room_is_404() {
        let platform = FakePlatform::new();
        let (status, body) = send(&platform, Method::GET, "/api/rooms/404404/participants", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn blank_room_id_is_400() {
        let platform = FakePlatform::new();
        let (status, _) = send(&platform, Method::GET, "/api/rooms/%20/participants", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(platform.calls().is_empty());
    }
}
