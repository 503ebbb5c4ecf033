use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

/// Prefix every platform-issued communication user id starts with.
pub const ACS_USER_PREFIX: &str = "8:acs:";

pub const DISPLAY_NAME_MAX: usize = 50;
pub const ROOM_TITLE_MAX: usize = 100;
pub const ROOM_ID_MAX: usize = 200;

/// Rejected user input. The message is safe to show to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidInput(pub String);

/// A platform identity of the shape `8:acs:<opaque>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommunicationUserId(String);

impl CommunicationUserId {
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        match raw.strip_prefix(ACS_USER_PREFIX) {
            Some(rest) if !rest.trim().is_empty() => Ok(Self(raw.to_owned())),
            _ => Err(InvalidInput(format!(
                "userId must match {ACS_USER_PREFIX}<id>, got {raw:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommunicationUserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        if raw.trim().is_empty() {
            return Err(InvalidInput("Room ID is required".to_owned()));
        }
        if raw.chars().count() > ROOM_ID_MAX {
            return Err(InvalidInput(format!(
                "Room ID cannot exceed {ROOM_ID_MAX} characters"
            )));
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidInput("displayName is required".to_owned()));
        }
        if trimmed.chars().count() > DISPLAY_NAME_MAX {
            return Err(InvalidInput(format!(
                "displayName cannot exceed {DISPLAY_NAME_MAX} characters"
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human title of a room. The platform has no notion of one, it only lives in
/// responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoomTitle(String);

impl RoomTitle {
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        if raw.trim().is_empty() {
            return Err(InvalidInput("roomName cannot be empty".to_owned()));
        }
        if raw.chars().count() > ROOM_TITLE_MAX {
            return Err(InvalidInput(format!(
                "roomName cannot exceed {ROOM_TITLE_MAX} characters"
            )));
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn parse_optional(raw: Option<&str>) -> Result<Option<Self>, InvalidInput> {
        raw.map(Self::parse).transpose()
    }

    pub fn default_for(creator: &DisplayName) -> Self {
        Self(format!("{creator}'s Room"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Presenter,
    Attendee,
    Consumer,
    Collaborator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        use Role::*;
        match self {
            Presenter => "Presenter",
            Attendee => "Attendee",
            Consumer => "Consumer",
            Collaborator => "Collaborator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRef {
    /// Raw platform identifier. Not necessarily an `8:acs:` user.
    pub identity: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub valid_from: OffsetDateTime,
    pub valid_until: OffsetDateTime,
}

impl ValidityWindow {
    pub const LENGTH: Duration = Duration::hours(24);

    pub fn starting_at(valid_from: OffsetDateTime) -> Self {
        Self {
            valid_from,
            valid_until: valid_from + Self::LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    pub room_id: RoomId,
    pub valid_from: OffsetDateTime,
    pub valid_until: OffsetDateTime,
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDetails {
    pub room: RoomRecord,
    pub participants: Vec<ParticipantRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedIdentity {
    pub user_id: CommunicationUserId,
    pub token: String,
    pub expires_on: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptor {
    pub user_id: CommunicationUserId,
    pub token: String,
    pub display_name: DisplayName,
    pub room_id: RoomId,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_on: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRoom {
    pub room: RoomRecord,
    pub title: RoomTitle,
    pub created_by: DisplayName,
    pub created_by_id: CommunicationUserId,
    /// False when the room exists but the creator could not be added.
    pub presenter_added: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    pub room_id: RoomId,
    pub user_id: CommunicationUserId,
    pub display_name: DisplayName,
    pub joined_at: OffsetDateTime,
    pub already_present: bool,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn communication_user_id_requires_prefix_and_body() {
        assert!(CommunicationUserId::parse("8:acs:abc_123").is_ok());
        assert!(CommunicationUserId::parse("8:acs:").is_err());
        assert!(CommunicationUserId::parse("8:acs:   ").is_err());
        assert!(CommunicationUserId::parse("acs:abc").is_err());
        assert!(CommunicationUserId::parse("").is_err());
        assert!(CommunicationUserId::parse("8:teams:abc").is_err());
    }

    #[test]
    fn display_name_is_trimmed_and_bounded() {
        assert_eq!(DisplayName::parse("  Alice ").unwrap().as_str(), "Alice");
        assert!(DisplayName::parse("   ").is_err());
        assert!(DisplayName::parse(&"x".repeat(DISPLAY_NAME_MAX)).is_ok());
        assert!(DisplayName::parse(&"x".repeat(DISPLAY_NAME_MAX + 1)).is_err());
    }

    #[test]
    fn room_id_bounds() {
        assert!(RoomId::parse("99199690362660364").is_ok());
        assert!(RoomId::parse(" ").is_err());
        assert!(RoomId::parse(&"9".repeat(ROOM_ID_MAX + 1)).is_err());
    }

    #[test]
    fn room_title_defaults_to_creator() {
        let alice = DisplayName::parse("Alice").unwrap();
        assert_eq!(RoomTitle::default_for(&alice).as_str(), "Alice's Room");
        assert!(RoomTitle::parse_optional(None).unwrap().is_none());
        assert!(RoomTitle::parse(&"t".repeat(ROOM_TITLE_MAX + 1)).is_err());
        assert!(RoomTitle::parse("").is_err());
        assert!(RoomTitle::parse_optional(Some("  ")).is_err());
    }

    #[test]
    fn validity_window_is_one_day() {
        let window = ValidityWindow::starting_at(datetime!(2025-03-01 10:00 UTC));
        assert_eq!(window.valid_until, datetime!(2025-03-02 10:00 UTC));
    }
}
