//! Client facade: one game channel plus one notification channel.

use hangman_protocol::dto::{
    AllRoomsResponse, CheckUsernameResponse, CreateRoomResponse, DeleteRoomResponse,
    GameStateResponse, GuessLetterResponse, JoinRoomResponse, LeaderboardResponse,
    LeaveRoomResponse, RoomStateResponse, StartGameResponse, UpdateRoomResponse,
};
use tokio::net::TcpStream;
use tracing::{info, info_span};

use crate::cancel::CancellationToken;
use crate::channel::{Channel, ChannelKind};
use crate::config::ClientOptions;
use crate::correlator::Correlator;
use crate::dispatcher::{EventDispatcher, Polled};
use crate::driver::{GameDriver, RoomChanges};
use crate::error::ClientResult;

/// A connected hangman player.
///
/// Requests go through [`GameDriver`] on the game channel, events come from
/// [`EventDispatcher`] on the notification channel. Use [`split`] to run the
/// two halves on separate tasks.
///
/// [`split`]: GameClient::split
#[derive(Debug)]
pub struct GameClient {
    driver: GameDriver,
    dispatcher: EventDispatcher,
}

impl GameClient {
    /// Connects both channels for `username`.
    ///
    /// The notification channel is subscribed right away when
    /// [`ClientOptions::subscribe_on_connect`] is set.
    pub async fn connect(
        options: &ClientOptions,
        username: impl Into<String>,
    ) -> ClientResult<Self> {
        let username = username.into();
        let span = info_span!(parent: &options.span, "hangman_client", %username);

        let game = Channel::new(ChannelKind::Game, options.address.clone(), options.game_port)
            .with_connect_timeout(options.connect_timeout)
            .with_read_timeout(options.read_timeout)
            .with_span(info_span!(parent: &span, "channel", kind = "game"));
        let correlator = Correlator::new(game)
            .with_request_timeout(options.request_timeout)
            .with_span(span.clone());
        let mut driver = GameDriver::new(correlator, username.clone());

        let notification = Channel::new(
            ChannelKind::Notification,
            options.address.clone(),
            options.notification_port,
        )
        .with_connect_timeout(options.connect_timeout)
        .with_read_timeout(options.read_timeout)
        .with_span(info_span!(parent: &span, "channel", kind = "notification"));
        let mut dispatcher = EventDispatcher::new(notification, username)
            .with_poll_interval(options.poll_interval)
            .with_subscribe_on_connect(options.subscribe_on_connect)
            .with_span(span.clone());

        driver.correlator_mut().channel_mut().ensure_connected().await?;
        dispatcher.connect().await?;

        info!(parent: &span, address = %options.address, "client connected");
        Ok(Self { driver, dispatcher })
    }

    /// Assembles a client from parts built elsewhere.
    pub fn from_parts(driver: GameDriver, dispatcher: EventDispatcher) -> Self {
        Self { driver, dispatcher }
    }

    /// Splits the client so events can be read on their own task.
    pub fn split(self) -> (GameDriver, EventDispatcher) {
        (self.driver, self.dispatcher)
    }

    /// Returns the player's username.
    pub fn username(&self) -> &str {
        self.driver.username()
    }

    pub fn driver_mut(&mut self) -> &mut GameDriver {
        &mut self.driver
    }

    pub fn dispatcher_mut(&mut self) -> &mut EventDispatcher {
        &mut self.dispatcher
    }

    /// Raw access to the game socket.
    pub fn game_stream_mut(&mut self) -> Option<&mut TcpStream> {
        self.driver.stream_mut()
    }

    /// Raw access to the notification socket.
    pub fn notification_stream_mut(&mut self) -> Option<&mut TcpStream> {
        self.dispatcher.channel_mut().stream_mut()
    }

    /// Closes both channels.
    pub async fn close(&mut self) {
        self.driver.correlator_mut().channel_mut().close().await;
        self.dispatcher.channel_mut().close().await;
    }

    // -- Requests -----------------------------------------------------------

    pub async fn create_room(
        &mut self,
        room_id: &str,
        password: &str,
        category: &str,
        difficulty: &str,
    ) -> ClientResult<CreateRoomResponse> {
        self.driver
            .create_room(room_id, password, category, difficulty)
            .await
    }

    pub async fn join_room(
        &mut self,
        room_id: &str,
        password: &str,
    ) -> ClientResult<JoinRoomResponse> {
        self.driver.join_room(room_id, password).await
    }

    pub async fn start_game(
        &mut self,
        room_id: &str,
        password: &str,
    ) -> ClientResult<StartGameResponse> {
        self.driver.start_game(room_id, password).await
    }

    pub async fn leave_room(
        &mut self,
        room_id: &str,
        password: &str,
    ) -> ClientResult<LeaveRoomResponse> {
        self.driver.leave_room(room_id, password).await
    }

    pub async fn delete_room(
        &mut self,
        room_id: &str,
        password: &str,
    ) -> ClientResult<DeleteRoomResponse> {
        self.driver.delete_room(room_id, password).await
    }

    pub async fn guess_letter(
        &mut self,
        room_id: &str,
        password: &str,
        letter: char,
    ) -> ClientResult<GuessLetterResponse> {
        self.driver.guess_letter(room_id, password, letter).await
    }

    pub async fn game_state(&mut self, room_id: &str) -> ClientResult<GameStateResponse> {
        self.driver.game_state(room_id).await
    }

    pub async fn room_state(
        &mut self,
        room_id: &str,
        password: &str,
    ) -> ClientResult<RoomStateResponse> {
        self.driver.room_state(room_id, password).await
    }

    pub async fn all_rooms(&mut self) -> ClientResult<AllRoomsResponse> {
        self.driver.all_rooms().await
    }

    pub async fn leaderboard(&mut self) -> ClientResult<LeaderboardResponse> {
        self.driver.leaderboard().await
    }

    pub async fn update_room(
        &mut self,
        room_id: &str,
        password: &str,
        changes: RoomChanges,
    ) -> ClientResult<UpdateRoomResponse> {
        self.driver.update_room(room_id, password, changes).await
    }

    pub async fn check_username(&mut self, username: &str) -> ClientResult<CheckUsernameResponse> {
        self.driver.check_username(username).await
    }

    // -- Events -------------------------------------------------------------

    /// Waits for the next event, polling through empty reads.
    pub async fn try_get_event(&mut self, token: &CancellationToken) -> ClientResult<Polled> {
        self.dispatcher.next_event(token).await
    }

    /// Reads at most one envelope; [`Polled::Empty`] if it held no event.
    pub async fn try_get_event_async(&mut self, token: &CancellationToken) -> ClientResult<Polled> {
        self.dispatcher.try_next_event(token).await
    }
}
