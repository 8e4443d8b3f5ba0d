//! JSON payload shapes for every game-channel command.
//!
//! Keys are snake_case on both paths. Requests are built per call and
//! dropped after sending; responses tolerate missing fields.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolResult;

/// Command names understood by the game server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    CreateRoom,
    JoinRoom,
    StartGame,
    LeaveRoom,
    DeleteRoom,
    GuessLetter,
    GetGameState,
    GetRoomState,
    GetAllRooms,
    GetLeaderboard,
    UpdateRoom,
    CheckUsername,
    /// Notification-channel handshake; the server sends no reply.
    Subscribe,
}

impl Command {
    /// Returns the wire name of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateRoom => "CREATE_ROOM",
            Self::JoinRoom => "JOIN_ROOM",
            Self::StartGame => "START_GAME",
            Self::LeaveRoom => "LEAVE_ROOM",
            Self::DeleteRoom => "DELETE_ROOM",
            Self::GuessLetter => "GUESS_LETTER",
            Self::GetGameState => "GET_GAME_STATE",
            Self::GetRoomState => "GET_ROOM_STATE",
            Self::GetAllRooms => "GET_ALL_ROOMS",
            Self::GetLeaderboard => "GET_LEADERBOARD",
            Self::UpdateRoom => "UPDATE_ROOM",
            Self::CheckUsername => "CHECK_USERNAME",
            Self::Subscribe => "SUBSCRIBE",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request DTO paired with its command and reply shape.
pub trait Operation: Serialize {
    /// Command the request is sent under.
    const COMMAND: Command;
    /// Shape of the reply payload.
    type Response: DeserializeOwned;
}

/// Serializes a request document. `None` becomes `{}`.
pub fn to_payload<T: Serialize>(request: Option<&T>) -> ProtocolResult<Vec<u8>> {
    match request {
        Some(request) => Ok(serde_json::to_vec(request)?),
        None => Ok(b"{}".to_vec()),
    }
}

/// Deserializes a reply document. An empty payload reads as `{}`.
pub fn from_payload<T: DeserializeOwned>(payload: &[u8]) -> ProtocolResult<T> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"{}")?);
    }
    Ok(serde_json::from_slice(payload)?)
}

macro_rules! operation {
    ($request:ty, $command:ident, $response:ty) => {
        impl Operation for $request {
            const COMMAND: Command = Command::$command;
            type Response = $response;
        }
    };
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub player_username: String,
    pub room_id: String,
    pub password: String,
    pub category: String,
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub player_username: String,
    pub room_id: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGameRequest {
    pub player_username: String,
    pub room_id: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRoomRequest {
    pub player_username: String,
    pub room_id: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRoomRequest {
    pub player_username: String,
    pub room_id: String,
    pub password: String,
}

/// Guess of a single letter. The letter travels as a one-character string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessLetterRequest {
    pub player_username: String,
    pub room_id: String,
    pub password: String,
    pub letter: String,
}

impl GuessLetterRequest {
    /// Creates a guess request for `letter`.
    pub fn new(
        player_username: impl Into<String>,
        room_id: impl Into<String>,
        password: impl Into<String>,
        letter: char,
    ) -> Self {
        Self {
            player_username: player_username.into(),
            room_id: room_id.into(),
            password: password.into(),
            letter: letter.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetGameStateRequest {
    pub player_username: String,
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRoomStateRequest {
    pub room_id: String,
    pub password: String,
}

/// Parameterless; serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAllRoomsRequest {}

/// Parameterless; serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLeaderboardRequest {}

/// Partial room update; unset fields are left out of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRoomRequest {
    pub player_username: String,
    pub room_id: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckUsernameRequest {
    pub username: String,
}

/// Handshake sent once per notification connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub player_username: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateRoomResponse {
    pub message: String,
    pub room_id: String,
}

/// A player and their score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerScore {
    pub username: String,
    pub score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinRoomResponse {
    pub id: String,
    pub owner: String,
    pub players: Vec<PlayerScore>,
    pub last_activity: Option<DateTime<Utc>>,
    pub max_players: u32,
    pub password: String,
    pub category: String,
    pub difficulty: String,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartGameResponse {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaveRoomResponse {
    pub message: String,
    pub room_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteRoomResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuessLetterResponse {
    pub player_username: String,
    pub is_correct: bool,
    pub game_over: bool,
    pub feedback: String,
}

/// One player's view of the word being guessed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerGameState {
    pub word_progress: String,
    pub attempts_left: i32,
    pub is_game_over: bool,
    pub score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameStateResponse {
    pub players: BTreeMap<String, PlayerGameState>,
}

/// A room member as seen by the room state query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomPlayer {
    pub username: String,
    pub score: i64,
    pub is_connected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomStateResponse {
    pub owner: String,
    pub state: String,
    pub players: Vec<RoomPlayer>,
}

/// Entry of the room listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSummary {
    pub id: String,
    pub owner: String,
    pub players_count: u32,
    pub max_players: u32,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllRoomsResponse {
    pub rooms: Vec<RoomSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardResponse {
    pub players: Vec<PlayerScore>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateRoomResponse {
    pub message: String,
    pub room_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckUsernameResponse {
    pub is_unique: bool,
}

operation!(CreateRoomRequest, CreateRoom, CreateRoomResponse);
operation!(JoinRoomRequest, JoinRoom, JoinRoomResponse);
operation!(StartGameRequest, StartGame, StartGameResponse);
operation!(LeaveRoomRequest, LeaveRoom, LeaveRoomResponse);
operation!(DeleteRoomRequest, DeleteRoom, DeleteRoomResponse);
operation!(GuessLetterRequest, GuessLetter, GuessLetterResponse);
operation!(GetGameStateRequest, GetGameState, GameStateResponse);
operation!(GetRoomStateRequest, GetRoomState, RoomStateResponse);
operation!(GetAllRoomsRequest, GetAllRooms, AllRoomsResponse);
operation!(GetLeaderboardRequest, GetLeaderboard, LeaderboardResponse);
operation!(UpdateRoomRequest, UpdateRoom, UpdateRoomResponse);
operation!(CheckUsernameRequest, CheckUsername, CheckUsernameResponse);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_wire_shape() {
        let request = CreateRoomRequest {
            player_username: "p1".to_string(),
            room_id: "r1".to_string(),
            password: "pw".to_string(),
            category: "animals".to_string(),
            difficulty: "easy".to_string(),
        };
        insta::assert_json_snapshot!(request, @r#"
        {
          "player_username": "p1",
          "room_id": "r1",
          "password": "pw",
          "category": "animals",
          "difficulty": "easy"
        }
        "#);
    }

    #[test]
    fn guess_letter_carries_one_char_string() {
        let request = GuessLetterRequest::new("p1", "r1", "pw", 'e');
        insta::assert_json_snapshot!(request, @r#"
        {
          "player_username": "p1",
          "room_id": "r1",
          "password": "pw",
          "letter": "e"
        }
        "#);
    }

    #[test]
    fn update_room_omits_unset_fields() {
        let request = UpdateRoomRequest {
            player_username: "p1".to_string(),
            room_id: "r1".to_string(),
            password: "pw".to_string(),
            category: None,
            difficulty: Some("hard".to_string()),
            new_password: None,
        };
        let json = String::from_utf8(to_payload(Some(&request)).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"player_username":"p1","room_id":"r1","password":"pw","difficulty":"hard"}"#
        );
    }

    #[test]
    fn absent_and_parameterless_requests_are_empty_objects() {
        assert_eq!(to_payload::<GetAllRoomsRequest>(None).unwrap(), b"{}");
        assert_eq!(
            to_payload(Some(&GetLeaderboardRequest::default())).unwrap(),
            b"{}"
        );
    }

    #[test]
    fn command_names() {
        assert_eq!(<CreateRoomRequest as Operation>::COMMAND.as_str(), "CREATE_ROOM");
        assert_eq!(<GuessLetterRequest as Operation>::COMMAND.as_str(), "GUESS_LETTER");
        assert_eq!(<GetLeaderboardRequest as Operation>::COMMAND.as_str(), "GET_LEADERBOARD");
        assert_eq!(Command::Subscribe.to_string(), "SUBSCRIBE");
    }

    #[test]
    fn create_room_response_from_payload() {
        let response: CreateRoomResponse =
            from_payload(br#"{"message":"Room created","room_id":"r1"}"#).unwrap();
        assert_eq!(response.room_id, "r1");
        assert_eq!(response.message, "Room created");
    }

    #[test]
    fn empty_payload_reads_as_defaults() {
        let response: StartGameResponse = from_payload(b"").unwrap();
        assert_eq!(response, StartGameResponse::default());
    }

    #[test]
    fn game_state_response_from_payload() {
        let payload = br#"{"players":{"alice":{"word_progress":"_a__","attempts_left":5,"is_game_over":false,"score":10}}}"#;
        let response: GameStateResponse = from_payload(payload).unwrap();
        let alice = &response.players["alice"];
        assert_eq!(alice.word_progress, "_a__");
        assert_eq!(alice.attempts_left, 5);
        assert_eq!(alice.score, 10);
    }

    #[test]
    fn all_rooms_accepts_nanosecond_timestamps() {
        let payload = br#"{"rooms":[{"id":"r1","owner":"p1","players_count":1,"max_players":4,"is_open":true,"last_activity":"2024-12-01T10:15:30.123456789+03:00"}]}"#;
        let response: AllRoomsResponse = from_payload(payload).unwrap();
        assert_eq!(response.rooms.len(), 1);
        assert_eq!(response.rooms[0].max_players, 4);
        assert!(response.rooms[0].last_activity.is_some());
    }

    #[test]
    fn mismatched_payload_is_an_error() {
        let result: ProtocolResult<GuessLetterResponse> = from_payload(br#"{"is_correct":"yes"}"#);
        assert!(result.is_err());
    }
}
