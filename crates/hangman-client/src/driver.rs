//! Typed game operations for one player.

use hangman_protocol::Command;
use hangman_protocol::dto::{
    AllRoomsResponse, CheckUsernameRequest, CheckUsernameResponse, CreateRoomRequest,
    CreateRoomResponse, DeleteRoomRequest, DeleteRoomResponse, GameStateResponse,
    GetAllRoomsRequest, GetGameStateRequest, GetLeaderboardRequest, GetRoomStateRequest,
    GuessLetterRequest, GuessLetterResponse, JoinRoomRequest, JoinRoomResponse,
    LeaderboardResponse, LeaveRoomRequest, LeaveRoomResponse, RoomStateResponse,
    StartGameRequest, StartGameResponse, UpdateRoomRequest, UpdateRoomResponse,
};
use tokio::net::TcpStream;

use crate::correlator::Correlator;
use crate::error::ClientResult;

/// Room settings to change with [`GameDriver::update_room`]. `None` keeps
/// the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomChanges {
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub new_password: Option<String>,
}

/// Game-channel half of a client: every request is sent on behalf of the
/// same player.
#[derive(Debug)]
pub struct GameDriver {
    correlator: Correlator,
    username: String,
}

impl GameDriver {
    /// Creates a driver acting as `username`.
    pub fn new(correlator: Correlator, username: impl Into<String>) -> Self {
        Self {
            correlator,
            username: username.into(),
        }
    }

    /// Returns the player's username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the correlator, for commands without a typed method.
    pub fn correlator_mut(&mut self) -> &mut Correlator {
        &mut self.correlator
    }

    /// Raw access to the game socket.
    pub fn stream_mut(&mut self) -> Option<&mut TcpStream> {
        self.correlator.channel_mut().stream_mut()
    }

    pub async fn create_room(
        &mut self,
        room_id: &str,
        password: &str,
        category: &str,
        difficulty: &str,
    ) -> ClientResult<CreateRoomResponse> {
        let request = CreateRoomRequest {
            player_username: self.username.clone(),
            room_id: room_id.to_string(),
            password: password.to_string(),
            category: category.to_string(),
            difficulty: difficulty.to_string(),
        };
        self.correlator.execute(&request).await
    }

    pub async fn join_room(
        &mut self,
        room_id: &str,
        password: &str,
    ) -> ClientResult<JoinRoomResponse> {
        let request = JoinRoomRequest {
            player_username: self.username.clone(),
            room_id: room_id.to_string(),
            password: password.to_string(),
        };
        self.correlator.execute(&request).await
    }

    pub async fn start_game(
        &mut self,
        room_id: &str,
        password: &str,
    ) -> ClientResult<StartGameResponse> {
        let request = StartGameRequest {
            player_username: self.username.clone(),
            room_id: room_id.to_string(),
            password: password.to_string(),
        };
        self.correlator.execute(&request).await
    }

    pub async fn leave_room(
        &mut self,
        room_id: &str,
        password: &str,
    ) -> ClientResult<LeaveRoomResponse> {
        let request = LeaveRoomRequest {
            player_username: self.username.clone(),
            room_id: room_id.to_string(),
            password: password.to_string(),
        };
        self.correlator.execute(&request).await
    }

    pub async fn delete_room(
        &mut self,
        room_id: &str,
        password: &str,
    ) -> ClientResult<DeleteRoomResponse> {
        let request = DeleteRoomRequest {
            player_username: self.username.clone(),
            room_id: room_id.to_string(),
            password: password.to_string(),
        };
        self.correlator.execute(&request).await
    }

    /// Guesses `letter` in the room's current word.
    pub async fn guess_letter(
        &mut self,
        room_id: &str,
        password: &str,
        letter: char,
    ) -> ClientResult<GuessLetterResponse> {
        let request = GuessLetterRequest::new(self.username.as_str(), room_id, password, letter);
        self.correlator.execute(&request).await
    }

    /// Returns every player's progress in the room's current game.
    pub async fn game_state(&mut self, room_id: &str) -> ClientResult<GameStateResponse> {
        let request = GetGameStateRequest {
            player_username: self.username.clone(),
            room_id: room_id.to_string(),
        };
        self.correlator.execute(&request).await
    }

    pub async fn room_state(
        &mut self,
        room_id: &str,
        password: &str,
    ) -> ClientResult<RoomStateResponse> {
        let request = GetRoomStateRequest {
            room_id: room_id.to_string(),
            password: password.to_string(),
        };
        self.correlator.execute(&request).await
    }

    /// Lists open rooms.
    pub async fn all_rooms(&mut self) -> ClientResult<AllRoomsResponse> {
        self.correlator
            .call(Command::GetAllRooms, None::<&GetAllRoomsRequest>)
            .await
    }

    pub async fn leaderboard(&mut self) -> ClientResult<LeaderboardResponse> {
        self.correlator
            .call(Command::GetLeaderboard, None::<&GetLeaderboardRequest>)
            .await
    }

    pub async fn update_room(
        &mut self,
        room_id: &str,
        password: &str,
        changes: RoomChanges,
    ) -> ClientResult<UpdateRoomResponse> {
        let request = UpdateRoomRequest {
            player_username: self.username.clone(),
            room_id: room_id.to_string(),
            password: password.to_string(),
            category: changes.category,
            difficulty: changes.difficulty,
            new_password: changes.new_password,
        };
        self.correlator.execute(&request).await
    }

    /// Asks whether `username` is still free.
    pub async fn check_username(&mut self, username: &str) -> ClientResult<CheckUsernameResponse> {
        let request = CheckUsernameRequest {
            username: username.to_string(),
        };
        self.correlator.execute(&request).await
    }
}
