use std::sync::Arc;

use futures_util::{TryStreamExt, future};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    acs::PlatformError,
    identity::IdentityIssuer,
    model::{
        CommunicationUserId, CreatedRoom, DisplayName, IssuedIdentity, JoinedRoom, Role, RoomDetails,
        RoomId, RoomRecord, RoomTitle, SessionDescriptor, ValidityWindow,
    },
    registry::{RegistryError, RoomRegistry},
};

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("invalid identity format: {0}")]
    InvalidIdentityFormat(String),

    #[error("failed to issue identity")]
    IdentityIssuanceFailed(#[source] PlatformError),

    #[error("failed to create room")]
    RoomCreationFailed(#[source] RegistryError),

    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("failed to join room {room_id}")]
    JoinFailed {
        room_id: RoomId,
        #[source]
        source: RegistryError,
    },

    #[error("room lookup failed")]
    Upstream(#[source] RegistryError),
}

impl MembershipError {
    /// Whether the root cause is a platform call that ran past its deadline.
    pub fn is_timeout(&self) -> bool {
        use MembershipError::*;
        match self {
            IdentityIssuanceFailed(err) => err.is_timeout(),
            RoomCreationFailed(err) | JoinFailed { source: err, .. } | Upstream(err) => err.is_timeout(),
            InvalidIdentityFormat(_) | RoomNotFound(_) => false,
        }
    }

    fn lookup(err: RegistryError) -> Self {
        match err {
            RegistryError::RoomNotFound(room_id) => Self::RoomNotFound(room_id),
            other => Self::Upstream(other),
        }
    }
}

/// Create-or-join orchestration over the identity and room services.
///
/// Each operation is a straight line of remote calls; the first failure ends
/// it, except that an already-present participant counts as joined.
#[derive(Clone)]
pub struct Membership {
    identities: Arc<dyn IdentityIssuer>,
    rooms: Arc<dyn RoomRegistry>,
}

impl Membership {
    pub fn new(identities: Arc<dyn IdentityIssuer>, rooms: Arc<dyn RoomRegistry>) -> Self {
        Self { identities, rooms }
    }

    pub async fn issue_token(&self, display_name: &DisplayName) -> Result<IssuedIdentity, MembershipError> {
        self.identities
            .issue_identity(display_name)
            .await
            .map_err(MembershipError::IdentityIssuanceFailed)
    }

    /// New identity, new room, caller added as presenter.
    pub async fn create_and_join(
        &self,
        display_name: DisplayName,
        room_name: Option<RoomTitle>,
    ) -> Result<SessionDescriptor, MembershipError> {
        let issued = self.issue_token(&display_name).await?;
        let created = self
            .open_room(issued.user_id.as_str(), display_name, room_name)
            .await?;

        Ok(SessionDescriptor {
            user_id: issued.user_id,
            token: issued.token,
            display_name: created.created_by,
            room_id: created.room.room_id,
            expires_on: issued.expires_on,
        })
    }

    /// New identity joining an existing room as attendee.
    pub async fn join_existing(
        &self,
        display_name: DisplayName,
        room_id: RoomId,
    ) -> Result<SessionDescriptor, MembershipError> {
        let issued = self.issue_token(&display_name).await?;
        let joined = self
            .join_as(issued.user_id.as_str(), display_name, room_id)
            .await?;

        Ok(SessionDescriptor {
            user_id: joined.user_id,
            token: issued.token,
            display_name: joined.display_name,
            room_id: joined.room_id,
            expires_on: issued.expires_on,
        })
    }

    /// Creates a room for an identity issued earlier and adds it as presenter.
    ///
    /// A failed presenter add leaves the room in place without a presenter;
    /// the room is not rolled back and the creator can still join it later.
    pub async fn open_room(
        &self,
        user_id: &str,
        display_name: DisplayName,
        room_name: Option<RoomTitle>,
    ) -> Result<CreatedRoom, MembershipError> {
        let creator = parse_identity(user_id)?;
        let title = room_name.unwrap_or_else(|| RoomTitle::default_for(&display_name));

        let window = ValidityWindow::starting_at(OffsetDateTime::now_utc());
        let room = self
            .rooms
            .create_room(window)
            .await
            .map_err(MembershipError::RoomCreationFailed)?;

        let presenter_added = match self
            .rooms
            .add_participant(&room.room_id, &creator, Role::Presenter)
            .await
        {
            Ok(()) | Err(RegistryError::ParticipantExists(_)) => true,
            Err(err) => {
                warn!(room_id = %room.room_id, %creator, error = %err, "room created without presenter");
                false
            }
        };

        info!(room_id = %room.room_id, title = title.as_str(), %display_name, "room opened");
        Ok(CreatedRoom {
            room,
            title,
            created_by: display_name,
            created_by_id: creator,
            presenter_added,
        })
    }

    /// Adds an identity issued earlier to an existing room as attendee.
    /// Joining twice is a success both times, and an identity already in the
    /// room keeps the role it was added with.
    pub async fn join_as(
        &self,
        user_id: &str,
        display_name: DisplayName,
        room_id: RoomId,
    ) -> Result<JoinedRoom, MembershipError> {
        let user_id = parse_identity(user_id)?;

        self.rooms
            .get_room(&room_id)
            .await
            .map_err(MembershipError::lookup)?;

        let present = self
            .rooms
            .list_participants(&room_id)
            .try_any(|p| future::ready(p.identity == user_id.as_str()))
            .await
            .map_err(MembershipError::lookup)?;

        let already_present = if present {
            true
        } else {
            self.add_attendee(&room_id, &user_id).await?
        };

        info!(%room_id, %user_id, %display_name, already_present, "joined room");
        Ok(JoinedRoom {
            room_id,
            user_id,
            display_name,
            joined_at: OffsetDateTime::now_utc(),
            already_present,
        })
    }

    /// `true` when the platform reports the identity as already present.
    async fn add_attendee(&self, room_id: &RoomId, user_id: &CommunicationUserId) -> Result<bool, MembershipError> {
        match self
            .rooms
            .add_participant(room_id, user_id, Role::Attendee)
            .await
        {
            Ok(()) => Ok(false),
            Err(RegistryError::ParticipantExists(_)) => Ok(true),
            Err(RegistryError::RoomNotFound(room_id)) => Err(MembershipError::RoomNotFound(room_id)),
            Err(source) => Err(MembershipError::JoinFailed {
                room_id: room_id.clone(),
                source,
            }),
        }
    }

    pub async fn describe_room(&self, room_id: &RoomId) -> Result<RoomRecord, MembershipError> {
        self.rooms.get_room(room_id).await.map_err(MembershipError::lookup)
    }

    /// Room plus its current participants. A missing room short-circuits
    /// before listing.
    pub async fn participants(&self, room_id: &RoomId) -> Result<RoomDetails, MembershipError> {
        let room = self.describe_room(room_id).await?;
        let participants = self
            .rooms
            .list_participants(room_id)
            .try_collect()
            .await
            .map_err(MembershipError::lookup)?;

        Ok(RoomDetails { room, participants })
    }

    /// Every room currently on the platform.
    pub async fn list_rooms(&self) -> Result<Vec<RoomRecord>, MembershipError> {
        self.rooms
            .list_rooms()
            .try_collect()
            .await
            .map_err(MembershipError::Upstream)
    }

    /// `false` only for a room the platform does not know. Other failures
    /// are reported, not folded into `false`.
    pub async fn validate_room(&self, room_id: &RoomId) -> Result<bool, MembershipError> {
        match self.rooms.get_room(room_id).await {
            Ok(_) => Ok(true),
            Err(RegistryError::RoomNotFound(_)) => Ok(false),
            Err(err) => Err(MembershipError::Upstream(err)),
        }
    }
}

fn parse_identity(raw: &str) -> Result<CommunicationUserId, MembershipError> {
    CommunicationUserId::parse(raw).map_err(|e| MembershipError::InvalidIdentityFormat(e.0))
}
