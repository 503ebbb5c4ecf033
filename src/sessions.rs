//! One-shot sessions: identity plus room membership in a single request.

use axum::{Json, Router, debug_handler, extract::State, routing::post};
use serde::Deserialize;

use crate::{
    ApiJson, AppResult, AppState, Envelope,
    membership::Membership,
    model::{DisplayName, RoomId, RoomTitle, SessionDescriptor},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionRequest {
    display_name: String,
    room_name: Option<String>,
    room_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/sessions", post(new_session))
}

/// Creates a room when no `roomId` is given, joins it otherwise.
#[debug_handler(state = AppState)]
async fn new_session(
    State(membership): State<Membership>,
    ApiJson(SessionRequest { display_name, room_name, room_id }): ApiJson<SessionRequest>,
) -> AppResult<Json<Envelope<SessionDescriptor>>> {
    let display_name = DisplayName::parse(&display_name)?;

    let session = match room_id {
        Some(room_id) => {
            let room_id = RoomId::parse(&room_id)?;
            membership.join_existing(display_name, room_id).await?
        }
        None => {
            let room_name = RoomTitle::parse_optional(room_name.as_deref())?;
            membership.create_and_join(display_name, room_name).await?
        }
    };

    Ok(Envelope::ok(session))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::testing::{Call, FakePlatform, send};

    async fn post_session(platform: &FakePlatform, body: Value) -> (StatusCode, Value) {
        send(platform, Method::POST, "/api/sessions", Some(&body.to_string())).await
    }

    #[tokio::test]
    async fn creates_room_without_room_id() {
        let platform = FakePlatform::new();
        let (status, body) = post_session(&platform, json!({ "displayName": "Alice" })).await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["displayName"], "Alice");
        assert!(data["userId"].as_str().unwrap().starts_with("8:acs:"));
        assert!(data["roomId"].is_string());
        assert!(data["token"].is_string());
        assert!(data["expiresOn"].is_string());
        assert!(platform.calls().contains(&Call::CreateRoom));
    }

    #[tokio::test]
    async fn joins_with_room_id() {
        let platform = FakePlatform::new();
        let (_, alice) = post_session(&platform, json!({ "displayName": "Alice" })).await;
        let room_id = alice["data"]["roomId"].as_str().unwrap().to_owned();

        let (status, bob) = post_session(&platform, json!({ "displayName": "Bob", "roomId": room_id })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(bob["data"]["roomId"], room_id.as_str());
        assert_ne!(bob["data"]["userId"], alice["data"]["userId"]);
        let creates = platform.calls().iter().filter(|c| **c == Call::CreateRoom).count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn unknown_room_is_404() {
        let platform = FakePlatform::new();
        let (status, body) = post_session(&platform, json!({ "displayName": "Bob", "roomId": "gone" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Room gone not found. Please check the Room ID.");
    }

    #[tokio::test]
    async fn invalid_names_make_no_calls() {
        let platform = FakePlatform::new();
        let (status, _) = post_session(&platform, json!({ "displayName": " " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_session(&platform, json!({ "displayName": "Alice", "roomName": "x".repeat(101) })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn room_creation_failure_is_500() {
        let platform = FakePlatform::new().failing_create();
        let (status, body) = post_session(&platform, json!({ "displayName": "Alice" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to create room");
    }
}
