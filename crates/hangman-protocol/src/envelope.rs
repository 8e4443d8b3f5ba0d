//! Protobuf envelopes carried inside each frame.

use prost::Message;

/// Status code the server uses for a successful reply.
pub const STATUS_SUCCESS: i32 = 2000;

/// Envelope sent from the client to the server.
#[derive(Clone, PartialEq, Message)]
pub struct ClientEnvelope {
    /// Command name, e.g. `"CREATE_ROOM"`.
    #[prost(string, tag = "1")]
    pub command: String,
    /// UTF-8 JSON request document.
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

impl ClientEnvelope {
    /// Creates a new outbound envelope.
    pub fn new(command: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            command: command.into(),
            payload,
        }
    }
}

/// Envelope sent from the server to the client.
///
/// On the notification channel `message` is the event tag
/// (`"PlayerJoined"`, ...); on the game channel it is a human message.
#[derive(Clone, PartialEq, Message)]
pub struct ServerEnvelope {
    /// 2000 on success, an application error code otherwise.
    #[prost(int32, tag = "1")]
    pub status_code: i32,
    /// Human message or event tag.
    #[prost(string, tag = "2")]
    pub message: String,
    /// UTF-8 JSON response or event document.
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

impl ServerEnvelope {
    /// Creates a new inbound envelope.
    pub fn new(status_code: i32, message: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            status_code,
            message: message.into(),
            payload,
        }
    }

    /// Creates a success envelope.
    pub fn success(message: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::new(STATUS_SUCCESS, message, payload)
    }

    /// Returns true if the status code is [`STATUS_SUCCESS`].
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_SUCCESS
    }

    /// Returns true if the envelope carries payload bytes.
    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }

    /// Returns true for the all-default envelope used as "no data".
    pub fn is_empty(&self) -> bool {
        self.status_code == 0 && self.message.is_empty() && self.payload.is_empty()
    }

    /// Returns the typed status code.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_i32(self.status_code)
    }
}

/// Status codes the game server is known to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    BadRequest,
    UnknownCommand,
    Unauthorized,
    InvalidPayload,
    NotFound,
    Conflict,
    RoomAlreadyExists,
    RoomNotFound,
    RoomFull,
    GameNotStarted,
    GameOver,
    InvalidMove,
    InternalServerError,
    /// Any code outside the known set.
    Other(i32),
}

impl StatusCode {
    /// Maps a wire integer to a status code.
    pub fn from_i32(code: i32) -> Self {
        match code {
            2000 => Self::Success,
            4000 => Self::BadRequest,
            4001 => Self::UnknownCommand,
            4002 => Self::Unauthorized,
            4003 => Self::InvalidPayload,
            4004 => Self::NotFound,
            4009 => Self::Conflict,
            4100 => Self::RoomAlreadyExists,
            4101 => Self::RoomNotFound,
            4102 => Self::RoomFull,
            4200 => Self::GameNotStarted,
            4201 => Self::GameOver,
            4202 => Self::InvalidMove,
            5000 => Self::InternalServerError,
            other => Self::Other(other),
        }
    }

    /// Returns the wire integer.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success => 2000,
            Self::BadRequest => 4000,
            Self::UnknownCommand => 4001,
            Self::Unauthorized => 4002,
            Self::InvalidPayload => 4003,
            Self::NotFound => 4004,
            Self::Conflict => 4009,
            Self::RoomAlreadyExists => 4100,
            Self::RoomNotFound => 4101,
            Self::RoomFull => 4102,
            Self::GameNotStarted => 4200,
            Self::GameOver => 4201,
            Self::InvalidMove => 4202,
            Self::InternalServerError => 5000,
            Self::Other(code) => code,
        }
    }

    /// Returns a human-readable description of the status code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::BadRequest => "Malformed request",
            Self::UnknownCommand => "Unknown command",
            Self::Unauthorized => "Unauthorized action",
            Self::InvalidPayload => "Invalid request payload",
            Self::NotFound => "Not found",
            Self::Conflict => "Conflict",
            Self::RoomAlreadyExists => "Room already exists",
            Self::RoomNotFound => "Room not found",
            Self::RoomFull => "Room is full",
            Self::GameNotStarted => "Game has not started",
            Self::GameOver => "Game is over",
            Self::InvalidMove => "Invalid move",
            Self::InternalServerError => "Internal server error",
            Self::Other(_) => "Unrecognized status",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_envelope_is_empty_and_encodes_to_nothing() {
        let envelope = ServerEnvelope::default();
        assert!(envelope.is_empty());
        assert!(!envelope.is_success());
        assert!(envelope.encode_to_vec().is_empty());
    }

    #[test]
    fn server_envelope_protobuf_roundtrip() {
        let envelope = ServerEnvelope::new(5000, "boom", b"{}".to_vec());
        let bytes = envelope.encode_to_vec();
        let decoded = ServerEnvelope::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.status(), StatusCode::InternalServerError);
    }

    #[test]
    fn client_envelope_field_tags() {
        // command = field 1 (length-delimited), payload = field 2.
        let envelope = ClientEnvelope::new("GET_ALL_ROOMS", b"{}".to_vec());
        let bytes = envelope.encode_to_vec();
        assert_eq!(bytes[0], 0x0a);
        assert_eq!(bytes[1] as usize, "GET_ALL_ROOMS".len());
        assert_eq!(bytes[2 + "GET_ALL_ROOMS".len()], 0x12);
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(StatusCode::from_i32(2000), StatusCode::Success);
        assert_eq!(StatusCode::from_i32(4101), StatusCode::RoomNotFound);
        assert_eq!(StatusCode::from_i32(1234), StatusCode::Other(1234));
        assert_eq!(StatusCode::Other(1234).as_i32(), 1234);
        assert_eq!(StatusCode::RoomFull.as_i32(), 4102);
    }

    #[test]
    fn status_code_display() {
        assert_eq!(
            StatusCode::InternalServerError.to_string(),
            "5000 (Internal server error)"
        );
    }
}
