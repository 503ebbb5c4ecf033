use async_trait::async_trait;
use futures_util::{
    StreamExt, TryStreamExt,
    stream::{self, BoxStream},
};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    acs::{AcsHttp, PlatformError, ROOMS_API_VERSION},
    model::{CommunicationUserId, ParticipantRef, Role, RoomId, RoomRecord, ValidityWindow},
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("participant already present: {0}")]
    ParticipantExists(String),

    #[error(transparent)]
    Upstream(#[from] PlatformError),
}

impl RegistryError {
    fn for_room(err: PlatformError, room_id: &RoomId) -> Self {
        match err {
            PlatformError::NotFound(_) => Self::RoomNotFound(room_id.clone()),
            PlatformError::AlreadyExists(msg) => Self::ParticipantExists(msg),
            other => Self::Upstream(other),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Upstream(err) if err.is_timeout())
    }
}

/// Room bookkeeping on the platform. Nothing is cached: every call reflects
/// platform state at call time.
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// Creates a new room. Not idempotent.
    async fn create_room(&self, window: ValidityWindow) -> Result<RoomRecord, RegistryError>;

    async fn get_room(&self, room_id: &RoomId) -> Result<RoomRecord, RegistryError>;

    /// Upserts `identity` with `role`.
    async fn add_participant(
        &self,
        room_id: &RoomId,
        identity: &CommunicationUserId,
        role: Role,
    ) -> Result<(), RegistryError>;

    /// Fresh, finite listing of the room's participants.
    fn list_participants<'a>(
        &'a self,
        room_id: &'a RoomId,
    ) -> BoxStream<'a, Result<ParticipantRef, RegistryError>>;

    /// Every room the resource currently holds, across all pages.
    fn list_rooms(&self) -> BoxStream<'_, Result<RoomRecord, RegistryError>>;
}

pub struct AcsRoomsClient {
    http: AcsHttp,
}

impl AcsRoomsClient {
    pub fn new(http: AcsHttp) -> Self {
        Self { http }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    #[serde(with = "time::serde::rfc3339")]
    valid_from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    valid_until: OffsetDateTime,
    pstn_dial_out_enabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomModel {
    id: String,
    #[serde(with = "time::serde::rfc3339")]
    valid_from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    valid_until: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    created_at: Option<OffsetDateTime>,
}

impl TryFrom<RoomModel> for RoomRecord {
    type Error = PlatformError;

    fn try_from(model: RoomModel) -> Result<Self, Self::Error> {
        Ok(RoomRecord {
            room_id: RoomId::parse(&model.id)
                .map_err(|e| PlatformError::Malformed(format!("room id: {e}")))?,
            valid_from: model.valid_from,
            valid_until: model.valid_until,
            created_at: model.created_at,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantModel {
    raw_id: String,
    role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<M> {
    #[serde(default = "Vec::new")]
    value: Vec<M>,
    next_link: Option<String>,
}

enum Cursor {
    Start,
    Next(Url),
    Done,
}

impl Cursor {
    fn after(next_link: Option<String>) -> Result<Self, PlatformError> {
        match next_link {
            Some(link) => Url::parse(&link)
                .map(Cursor::Next)
                .map_err(|e| PlatformError::Malformed(format!("nextLink {link:?}: {e}"))),
            None => Ok(Cursor::Done),
        }
    }
}

#[async_trait]
impl RoomRegistry for AcsRoomsClient {
    async fn create_room(&self, window: ValidityWindow) -> Result<RoomRecord, RegistryError> {
        let url = self.http.url(&["rooms"], ROOMS_API_VERSION)?;
        let request = CreateRoomRequest {
            valid_from: window.valid_from,
            valid_until: window.valid_until,
            pstn_dial_out_enabled: false,
        };
        let model: RoomModel = self
            .http
            .write(Method::POST, url, "application/json", &request)
            .await?;

        let room = RoomRecord::try_from(model)?;
        info!(room_id = %room.room_id, valid_until = %room.valid_until, "created room");
        Ok(room)
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<RoomRecord, RegistryError> {
        let url = self.http.url(&["rooms", room_id.as_str()], ROOMS_API_VERSION)?;
        let model: RoomModel = self
            .http
            .read(url)
            .await
            .map_err(|e| RegistryError::for_room(e, room_id))?;
        Ok(RoomRecord::try_from(model)?)
    }

    async fn add_participant(
        &self,
        room_id: &RoomId,
        identity: &CommunicationUserId,
        role: Role,
    ) -> Result<(), RegistryError> {
        let url = self
            .http
            .url(&["rooms", room_id.as_str(), "participants"], ROOMS_API_VERSION)?;
        let mut participants = Map::new();
        participants.insert(identity.as_str().to_owned(), json!({ "role": role }));
        let patch = json!({ "participants": participants });
        self.http
            .write::<_, Value>(Method::PATCH, url, "application/merge-patch+json", &patch)
            .await
            .map_err(|e| RegistryError::for_room(e, room_id))?;

        info!(%room_id, %identity, %role, "upserted participant");
        Ok(())
    }

    fn list_participants<'a>(
        &'a self,
        room_id: &'a RoomId,
    ) -> BoxStream<'a, Result<ParticipantRef, RegistryError>> {
        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let url = match cursor {
                Cursor::Start => self
                    .http
                    .url(&["rooms", room_id.as_str(), "participants"], ROOMS_API_VERSION)?,
                Cursor::Next(url) => url,
                Cursor::Done => return Ok(None),
            };

            let page: Page<ParticipantModel> = self
                .http
                .read(url)
                .await
                .map_err(|e| RegistryError::for_room(e, room_id))?;

            let next = Cursor::after(page.next_link)?;
            let participants = page.value.into_iter().map(|p| {
                Ok::<_, RegistryError>(ParticipantRef {
                    identity: p.raw_id,
                    role: p.role,
                })
            });

            Ok::<_, RegistryError>(Some((stream::iter(participants), next)))
        })
        .try_flatten()
        .boxed()
    }

    fn list_rooms(&self) -> BoxStream<'_, Result<RoomRecord, RegistryError>> {
        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let url = match cursor {
                Cursor::Start => self.http.url(&["rooms"], ROOMS_API_VERSION)?,
                Cursor::Next(url) => url,
                Cursor::Done => return Ok(None),
            };

            let page: Page<RoomModel> = self.http.read(url).await?;
            let next = Cursor::after(page.next_link)?;
            let rooms = page
                .value
                .into_iter()
                .map(|model| RoomRecord::try_from(model).map_err(RegistryError::from));

            Ok::<_, RegistryError>(Some((stream::iter(rooms), next)))
        })
        .try_flatten()
        .boxed()
    }
}
