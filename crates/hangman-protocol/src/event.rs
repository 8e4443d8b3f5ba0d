//! Server-pushed notifications.
//!
//! On the notification channel the envelope `message` is a tag naming the
//! event and the payload is that event's JSON document. The tag set is
//! closed: [`DECODERS`] maps each [`EventKind`] to the decoder for its
//! payload shape, and any other tag is a protocol violation.

use serde::{Deserialize, Serialize};

use crate::dto::from_payload;
use crate::error::{ProtocolError, ProtocolResult};

/// The host started the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStarted {
    pub category: String,
    pub difficulty: String,
}

/// A player entered the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoined {
    pub username: String,
}

/// A player left the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeft {
    pub username: String,
}

/// Room settings changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUpdated {
    pub room_id: String,
}

/// The room was deleted by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDeleted {
    pub room_id: String,
}

/// A decoded notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    GameStarted(GameStarted),
    PlayerJoined(PlayerJoined),
    PlayerLeft(PlayerLeft),
    RoomUpdated(RoomUpdated),
    RoomDeleted(RoomDeleted),
}

/// Discriminant of [`GameEvent`], one per wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GameStarted,
    PlayerJoined,
    PlayerLeft,
    RoomUpdated,
    RoomDeleted,
}

impl EventKind {
    /// Every kind, in wire-table order.
    pub const ALL: [EventKind; 5] = [
        Self::GameStarted,
        Self::PlayerJoined,
        Self::PlayerLeft,
        Self::RoomUpdated,
        Self::RoomDeleted,
    ];

    /// Returns the tag carried in the envelope `message`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::GameStarted => "GameStarted",
            Self::PlayerJoined => "PlayerJoined",
            Self::PlayerLeft => "PlayerLeft",
            Self::RoomUpdated => "RoomUpdated",
            Self::RoomDeleted => "RoomDeleted",
        }
    }

    /// Looks up a kind by exact tag match.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

type Decoder = fn(&[u8]) -> ProtocolResult<GameEvent>;

/// Tag → payload decoder table.
pub static DECODERS: [(EventKind, Decoder); 5] = [
    (EventKind::GameStarted, |p| {
        Ok(GameEvent::GameStarted(from_payload(p)?))
    }),
    (EventKind::PlayerJoined, |p| {
        Ok(GameEvent::PlayerJoined(from_payload(p)?))
    }),
    (EventKind::PlayerLeft, |p| {
        Ok(GameEvent::PlayerLeft(from_payload(p)?))
    }),
    (EventKind::RoomUpdated, |p| {
        Ok(GameEvent::RoomUpdated(from_payload(p)?))
    }),
    (EventKind::RoomDeleted, |p| {
        Ok(GameEvent::RoomDeleted(from_payload(p)?))
    }),
];

impl GameEvent {
    /// Decodes the payload of an envelope tagged `tag`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownEvent`] for a tag outside the closed set,
    /// [`ProtocolError::Json`] for a payload that does not fit the shape.
    pub fn decode(tag: &str, payload: &[u8]) -> ProtocolResult<Self> {
        let kind =
            EventKind::from_tag(tag).ok_or_else(|| ProtocolError::UnknownEvent(tag.to_string()))?;
        let (_, decode) = DECODERS
            .iter()
            .find(|(k, _)| *k == kind)
            .ok_or_else(|| ProtocolError::UnknownEvent(tag.to_string()))?;
        decode(payload)
    }

    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::GameStarted(_) => EventKind::GameStarted,
            Self::PlayerJoined(_) => EventKind::PlayerJoined,
            Self::PlayerLeft(_) => EventKind::PlayerLeft,
            Self::RoomUpdated(_) => EventKind::RoomUpdated,
            Self::RoomDeleted(_) => EventKind::RoomDeleted,
        }
    }

    /// Returns the room id for room-scoped events.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::RoomUpdated(e) => Some(&e.room_id),
            Self::RoomDeleted(e) => Some(&e.room_id),
            _ => None,
        }
    }

    /// Returns the username for player events.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::PlayerJoined(e) => Some(&e.username),
            Self::PlayerLeft(e) => Some(&e.username),
            _ => None,
        }
    }
}
