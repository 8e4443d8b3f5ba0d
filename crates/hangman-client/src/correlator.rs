//! Request/response pairing on the game channel.
//!
//! Each call sends one envelope and reads exactly the next reply. Calls take
//! `&mut self`, so a correlator can never have two requests in flight.

use std::time::Duration;

use hangman_protocol::{ClientEnvelope, Command, Operation, from_payload, to_payload};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Span, debug, warn};

use crate::channel::Channel;
use crate::error::{ClientError, ClientResult};

/// Sends requests and decodes their replies.
#[derive(Debug)]
pub struct Correlator {
    channel: Channel,
    request_timeout: Duration,
    span: Span,
}

impl Correlator {
    /// Wraps a game channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            request_timeout: Duration::from_secs(10),
            span: Span::none(),
        }
    }

    /// Sets how long a call waits for its reply.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the span calls are recorded under.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Returns the underlying channel.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Returns the underlying channel mutably.
    pub fn channel_mut(&mut self) -> &mut Channel {
        &mut self.channel
    }

    /// Sends a typed request and decodes its typed reply.
    pub async fn execute<O: Operation>(&mut self, request: &O) -> ClientResult<O::Response> {
        self.call(O::COMMAND, Some(request)).await
    }

    /// Sends `command` with `request` as its JSON payload and decodes the
    /// reply payload as `T`.
    ///
    /// `None` is sent as `{}`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Server`] when the reply status is not 2000; the
    ///   payload is not looked at.
    /// - [`ClientError::Deserialization`] when the payload does not fit `T`.
    /// - [`ClientError::Timeout`] when no reply arrives in time. The socket is
    ///   closed, since a late reply would otherwise answer the next call.
    pub async fn call<T, R>(&mut self, command: Command, request: Option<&R>) -> ClientResult<T>
    where
        T: DeserializeOwned,
        R: Serialize,
    {
        let payload = to_payload(request)?;
        let envelope = ClientEnvelope::new(command.as_str(), payload);

        debug!(parent: &self.span, %command, bytes = envelope.payload.len(), "sending request");
        self.channel.send(&envelope).await?;

        let reply = match tokio::time::timeout(self.request_timeout, self.channel.receive_frame())
            .await
        {
            Ok(reply) => reply?,
            Err(_) => {
                warn!(parent: &self.span, %command, "no reply, closing game channel");
                self.channel.close().await;
                return Err(ClientError::Timeout(format!(
                    "waiting {}s for {} reply",
                    self.request_timeout.as_secs(),
                    command
                )));
            }
        };

        if !reply.is_success() {
            let status = reply.status();
            debug!(
                parent: &self.span,
                %command,
                %status,
                message = %reply.message,
                "request rejected"
            );
            return Err(ClientError::Server {
                status,
                message: reply.message,
            });
        }

        debug!(parent: &self.span, %command, message = %reply.message, "reply received");
        from_payload(&reply.payload)
            .map_err(|source| ClientError::Deserialization { command, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKind;
    use crate::error::ErrorKind;
    use crate::test_support::{accept, listener, read_request, write_reply};
    use hangman_protocol::ServerEnvelope;
    use hangman_protocol::dto::{
        CreateRoomRequest, GetLeaderboardRequest, GuessLetterRequest, LeaderboardResponse,
    };

    fn correlator(port: u16) -> Correlator {
        Correlator::new(Channel::new(ChannelKind::Game, "127.0.0.1", port))
    }

    #[tokio::test]
    async fn create_room_returns_room_id() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener).await;
            let request = read_request(&mut socket).await;
            assert_eq!(request.command, "CREATE_ROOM");
            let payload: serde_json::Value = serde_json::from_slice(&request.payload).unwrap();
            assert_eq!(
                payload,
                serde_json::json!({
                    "player_username": "p1",
                    "room_id": "r1",
                    "password": "pw",
                    "category": "animals",
                    "difficulty": "easy"
                })
            );
            write_reply(
                &mut socket,
                &ServerEnvelope::success("ok", br#"{"message":"Room created","room_id":"r1"}"#.to_vec()),
            )
            .await;
        });

        let mut correlator = correlator(port);
        let request = CreateRoomRequest {
            player_username: "p1".into(),
            room_id: "r1".into(),
            password: "pw".into(),
            category: "animals".into(),
            difficulty: "easy".into(),
        };
        let response = correlator.execute(&request).await.unwrap();
        assert_eq!(response.room_id, "r1");
        assert_eq!(response.message, "Room created");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn server_error_leaves_channel_clean() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener).await;

            let request = read_request(&mut socket).await;
            assert_eq!(request.command, "GUESS_LETTER");
            write_reply(
                &mut socket,
                &ServerEnvelope::new(5000, "internal failure", b"not json".to_vec()),
            )
            .await;

            let request = read_request(&mut socket).await;
            assert_eq!(request.command, "GUESS_LETTER");
            write_reply(
                &mut socket,
                &ServerEnvelope::success(
                    "ok",
                    br#"{"player_username":"p1","is_correct":true,"game_over":false,"feedback":"nice"}"#
                        .to_vec(),
                ),
            )
            .await;
        });

        let mut correlator = correlator(port);
        let guess = GuessLetterRequest::new("p1", "r1", "pw", 'a');

        let err = correlator.execute(&guess).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        match &err {
            ClientError::Server { status, message } => {
                assert_eq!(status.as_i32(), 5000);
                assert_eq!(message, "internal failure");
            }
            other => panic!("unexpected error: {other}"),
        }

        let response = correlator.execute(&guess).await.unwrap();
        assert!(response.is_correct);
        assert_eq!(response.feedback, "nice");
        assert_eq!(correlator.channel().generation(), 1);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn absent_request_is_sent_as_empty_object() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener).await;
            let request = read_request(&mut socket).await;
            assert_eq!(request.command, "GET_LEADERBOARD");
            assert_eq!(request.payload, b"{}");
            write_reply(
                &mut socket,
                &ServerEnvelope::success("ok", br#"{"players":[{"username":"a","score":3}]}"#.to_vec()),
            )
            .await;
        });

        let mut correlator = correlator(port);
        let response: LeaderboardResponse = correlator
            .call(Command::GetLeaderboard, None::<&GetLeaderboardRequest>)
            .await
            .unwrap();
        assert_eq!(response.players.len(), 1);
        assert_eq!(response.players[0].score, 3);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn mismatched_payload_is_deserialization_error() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener).await;
            read_request(&mut socket).await;
            write_reply(
                &mut socket,
                &ServerEnvelope::success("ok", br#"{"players":"everyone"}"#.to_vec()),
            )
            .await;
        });

        let mut correlator = correlator(port);
        let err = correlator.execute(&GetLeaderboardRequest {}).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialization);
        assert!(err.to_string().contains("GET_LEADERBOARD"));
        // The frame was complete, the socket stays.
        assert!(correlator.channel().is_connected());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn missing_reply_times_out_and_closes() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener).await;
            read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_millis(300)).await;
        });

        let mut correlator = correlator(port).with_request_timeout(Duration::from_millis(50));
        let err = correlator.execute(&GetLeaderboardRequest {}).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!correlator.channel().is_connected());

        server.abort();
    }
}
