//! In-memory stand-ins for the communications platform.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request},
};
use futures_util::{
    StreamExt,
    stream::{self, BoxStream},
};
use reqwest::StatusCode;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    AppState,
    acs::{ConnectionString, PlatformError},
    config::UpstreamSettings,
    identity::IdentityIssuer,
    membership::Membership,
    model::{
        CommunicationUserId, DisplayName, IssuedIdentity, ParticipantRef, Role, RoomId, RoomRecord,
        ValidityWindow,
    },
    registry::{RegistryError, RoomRegistry},
};

/// Serves `router` on an ephemeral port and returns a connection string
/// pointing at it.
pub(crate) async fn spawn_platform(router: Router) -> ConnectionString {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    ConnectionString::parse(&format!("endpoint=http://{addr}/;accesskey=c2VjcmV0")).unwrap()
}

pub(crate) fn fast_settings() -> UpstreamSettings {
    UpstreamSettings {
        timeout: Duration::from_millis(300),
        read_retries: 2,
        retry_backoff: Duration::from_millis(1),
    }
}

/// Runs one request through the full `/api` router backed by `platform`.
pub(crate) async fn send(
    platform: &FakePlatform,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let app = crate::router(AppState {
        membership: platform.membership(),
    });
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_owned())).unwrap_or_default())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    IssueIdentity(String),
    CreateRoom,
    GetRoom(RoomId),
    AddParticipant {
        room_id: RoomId,
        identity: String,
        role: Role,
    },
    ListParticipants(RoomId),
    ListRooms,
}

struct FakeRoom {
    record: RoomRecord,
    participants: Vec<ParticipantRef>,
}

#[derive(Default)]
struct State {
    rooms: HashMap<RoomId, FakeRoom>,
    calls: Vec<Call>,
    next_id: u64,
}

/// Identity and rooms service in one, sharing state across clones.
#[derive(Clone, Default)]
pub(crate) struct FakePlatform {
    state: Arc<Mutex<State>>,
    fail_identity: bool,
    fail_create: bool,
    fail_add: bool,
    report_duplicates: bool,
    read_timeout: Option<Duration>,
}

fn outage() -> PlatformError {
    PlatformError::Unavailable {
        status: Some(StatusCode::SERVICE_UNAVAILABLE),
        message: "service unavailable".to_owned(),
    }
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_identity(mut self) -> Self {
        self.fail_identity = true;
        self
    }

    pub(crate) fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub(crate) fn failing_add(mut self) -> Self {
        self.fail_add = true;
        self
    }

    /// Re-adding a present identity answers "already exists" instead of
    /// silently upserting.
    pub(crate) fn reporting_duplicates(mut self) -> Self {
        self.report_duplicates = true;
        self
    }

    pub(crate) fn timing_out_reads(mut self, after: Duration) -> Self {
        self.read_timeout = Some(after);
        self
    }

    pub(crate) fn membership(&self) -> Membership {
        Membership::new(Arc::new(self.clone()), Arc::new(self.clone()))
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn identities_issued(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::IssueIdentity(_)))
            .count()
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

#[async_trait]
impl IdentityIssuer for FakePlatform {
    async fn issue_identity(&self, display_name: &DisplayName) -> Result<IssuedIdentity, PlatformError> {
        let mut state = self.record(Call::IssueIdentity(display_name.to_string()));
        if self.fail_identity {
            return Err(outage());
        }
        state.next_id += 1;
        Ok(IssuedIdentity {
            user_id: CommunicationUserId::parse(&format!("8:acs:{}", Uuid::now_v7())).unwrap(),
            token: format!("token-{}", state.next_id),
            expires_on: OffsetDateTime::now_utc() + time::Duration::hours(24),
        })
    }
}

#[async_trait]
impl RoomRegistry for FakePlatform {
    async fn create_room(&self, window: ValidityWindow) -> Result<RoomRecord, RegistryError> {
        let mut state = self.record(Call::CreateRoom);
        if self.fail_create {
            return Err(outage().into());
        }
        state.next_id += 1;
        let record = RoomRecord {
            room_id: RoomId::parse(&format!("9919969036266{:04}", state.next_id)).unwrap(),
            valid_from: window.valid_from,
            valid_until: window.valid_until,
            created_at: Some(window.valid_from),
        };
        state.rooms.insert(
            record.room_id.clone(),
            FakeRoom {
                record: record.clone(),
                participants: Vec::new(),
            },
        );
        Ok(record)
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<RoomRecord, RegistryError> {
        let state = self.record(Call::GetRoom(room_id.clone()));
        if let Some(after) = self.read_timeout {
            return Err(PlatformError::Timeout(after).into());
        }
        state
            .rooms
            .get(room_id)
            .map(|room| room.record.clone())
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.clone()))
    }

    async fn add_participant(
        &self,
        room_id: &RoomId,
        identity: &CommunicationUserId,
        role: Role,
    ) -> Result<(), RegistryError> {
        let mut state = self.record(Call::AddParticipant {
            room_id: room_id.clone(),
            identity: identity.to_string(),
            role,
        });
        if self.fail_add {
            return Err(outage().into());
        }
        let room = state
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.clone()))?;

        match room
            .participants
            .iter_mut()
            .find(|p| p.identity == identity.as_str())
        {
            Some(_) if self.report_duplicates => Err(RegistryError::ParticipantExists(format!(
                "{identity} already exists in room {room_id}"
            ))),
            Some(existing) => {
                existing.role = role;
                Ok(())
            }
            None => {
                room.participants.push(ParticipantRef {
                    identity: identity.to_string(),
                    role,
                });
                Ok(())
            }
        }
    }

    fn list_participants<'a>(
        &'a self,
        room_id: &'a RoomId,
    ) -> BoxStream<'a, Result<ParticipantRef, RegistryError>> {
        let state = self.record(Call::ListParticipants(room_id.clone()));
        if let Some(after) = self.read_timeout {
            return stream::once(async move { Err(PlatformError::Timeout(after).into()) }).boxed();
        }
        match state.rooms.get(room_id) {
            Some(room) => stream::iter(room.participants.clone().into_iter().map(Ok)).boxed(),
            None => {
                let missing = room_id.clone();
                stream::once(async move { Err(RegistryError::RoomNotFound(missing)) }).boxed()
            }
        }
    }

    fn list_rooms(&self) -> BoxStream<'_, Result<RoomRecord, RegistryError>> {
        let state = self.record(Call::ListRooms);
        if let Some(after) = self.read_timeout {
            return stream::once(async move { Err(PlatformError::Timeout(after).into()) }).boxed();
        }
        let mut rooms: Vec<_> = state.rooms.values().map(|room| room.record.clone()).collect();
        rooms.sort_by(|a, b| a.room_id.as_str().cmp(b.room_id.as_str()));
        stream::iter(rooms.into_iter().map(Ok)).boxed()
    }
}
