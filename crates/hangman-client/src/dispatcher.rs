//! Event pump over the notification channel.
//!
//! The dispatcher reads envelopes pushed by the server, maps each envelope's
//! `message` tag to a [`GameEvent`] and hands it to the caller. Envelopes
//! without payload are "nothing yet" and never surface as events.
//!
//! ```text
//! Idle -> AwaitingHeader -> AwaitingBody -> Dispatching -> Idle
//!   \_____________\______________\______________\_____> Cancelled
//! ```

use std::time::Duration;

use hangman_protocol::dto::SubscribeRequest;
use hangman_protocol::{
    ClientEnvelope, Command, FramePhase, GameEvent, ServerEnvelope, to_payload,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Span, debug, trace, warn};

use crate::cancel::CancellationToken;
use crate::channel::{Channel, Received};
use crate::error::ClientResult;

/// Capacity of the queue between a spawned dispatcher and its subscriber.
pub const EVENT_BUFFER: usize = 32;

/// Outcome of one poll of the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled {
    Event(GameEvent),
    /// An envelope arrived but carried no event.
    Empty,
    Cancelled,
}

/// Where the dispatcher is in its read/dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    Idle,
    AwaitingHeader,
    AwaitingBody,
    Dispatching,
    Cancelled,
}

/// Reads and classifies server-pushed events.
#[derive(Debug)]
pub struct EventDispatcher {
    channel: Channel,
    username: String,
    subscribe_on_connect: bool,
    subscribed_generation: u64,
    poll_interval: Duration,
    state: DispatchState,
    span: Span,
}

impl EventDispatcher {
    /// Wraps a notification channel for `username`.
    pub fn new(channel: Channel, username: impl Into<String>) -> Self {
        Self {
            channel,
            username: username.into(),
            subscribe_on_connect: true,
            subscribed_generation: 0,
            poll_interval: Duration::from_millis(100),
            state: DispatchState::Idle,
            span: Span::none(),
        }
    }

    /// Sets the pause between empty polls of [`next_event`](Self::next_event).
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enables or disables the `SUBSCRIBE` handshake.
    #[must_use]
    pub fn with_subscribe_on_connect(mut self, subscribe: bool) -> Self {
        self.subscribe_on_connect = subscribe;
        self
    }

    /// Sets the span dispatch events are recorded under.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Returns the underlying channel.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Returns the underlying channel mutably.
    pub fn channel_mut(&mut self) -> &mut Channel {
        &mut self.channel
    }

    /// Waits for the next event, skipping empty envelopes.
    ///
    /// Read timeouts and dropped sockets are polled through: the channel
    /// reconnects (and resubscribes) on the next iteration. Never returns
    /// [`Polled::Empty`].
    ///
    /// # Errors
    ///
    /// Connect failures, unknown tags and malformed event payloads.
    pub async fn next_event(&mut self, token: &CancellationToken) -> ClientResult<Polled> {
        loop {
            if token.is_cancelled() {
                return Ok(self.cancelled());
            }

            self.connect().await?;
            self.track_phase();

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                received = self.channel.receive() => Some(received),
            };
            let envelope = match outcome {
                None => return Ok(self.cancelled()),
                Some(received) => received?,
            };

            match self.dispatch(envelope)? {
                Polled::Empty => {}
                polled => return Ok(polled),
            }

            let slept = tokio::select! {
                biased;
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(self.poll_interval) => true,
            };
            if !slept {
                return Ok(self.cancelled());
            }
        }
    }

    /// Makes a single attempt to read one event.
    ///
    /// Waits until an envelope arrives or `token` fires, then returns
    /// [`Polled::Empty`] rather than retrying when the envelope carries no
    /// payload.
    pub async fn try_next_event(&mut self, token: &CancellationToken) -> ClientResult<Polled> {
        if token.is_cancelled() {
            return Ok(self.cancelled());
        }

        self.connect().await?;
        self.track_phase();

        match self.channel.receive_cancellable(token).await {
            Ok(Received::Envelope(envelope)) => self.dispatch(envelope),
            Ok(Received::Cancelled) => Ok(self.cancelled()),
            Err(e) => {
                self.state = DispatchState::Idle;
                Err(e)
            }
        }
    }

    /// Runs the dispatcher on its own task, forwarding events (and a final
    /// fatal error) to the returned receiver.
    ///
    /// The task stops on cancellation, when the receiver is dropped, or after
    /// forwarding an error. It hands the dispatcher back when it stops.
    pub fn spawn(
        mut self,
        token: CancellationToken,
    ) -> (mpsc::Receiver<ClientResult<GameEvent>>, JoinHandle<Self>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let handle = tokio::spawn(async move {
            loop {
                let polled = tokio::select! {
                    biased;
                    _ = tx.closed() => break,
                    polled = self.next_event(&token) => polled,
                };

                match polled {
                    Ok(Polled::Event(event)) => {
                        if tx.send(Ok(event)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Polled::Empty) => {}
                    Ok(Polled::Cancelled) => break,
                    Err(e) => {
                        warn!(parent: &self.span, error = %e, "event loop stopped");
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }
            }
            debug!(parent: &self.span, "event loop finished");
            self
        });

        (rx, handle)
    }

    /// Connects if needed and sends `SUBSCRIBE` once per socket.
    pub async fn connect(&mut self) -> ClientResult<()> {
        self.channel.ensure_connected().await?;

        let generation = self.channel.generation();
        if !self.subscribe_on_connect || generation == self.subscribed_generation {
            return Ok(());
        }

        let request = SubscribeRequest {
            player_username: self.username.clone(),
        };
        let payload = to_payload(Some(&request))?;
        let envelope = ClientEnvelope::new(Command::Subscribe.as_str(), payload);
        self.channel.send(&envelope).await?;
        self.subscribed_generation = generation;

        debug!(parent: &self.span, username = %self.username, generation, "subscribed");
        Ok(())
    }

    fn dispatch(&mut self, envelope: ServerEnvelope) -> ClientResult<Polled> {
        self.state = DispatchState::Dispatching;

        if !envelope.has_payload() {
            trace!(parent: &self.span, tag = %envelope.message, "empty envelope, no event");
            self.state = DispatchState::Idle;
            return Ok(Polled::Empty);
        }
        if !envelope.is_success() {
            warn!(
                parent: &self.span,
                status = %envelope.status(),
                tag = %envelope.message,
                "notification with non-success status"
            );
        }

        let decoded = GameEvent::decode(&envelope.message, &envelope.payload);
        self.state = DispatchState::Idle;

        let event = decoded?;
        debug!(parent: &self.span, kind = %event.kind(), "event received");
        Ok(Polled::Event(event))
    }

    fn track_phase(&mut self) {
        self.state = match self.channel.frame_phase() {
            FramePhase::AwaitingHeader => DispatchState::AwaitingHeader,
            FramePhase::AwaitingBody => DispatchState::AwaitingBody,
        };
    }

    fn cancelled(&mut self) -> Polled {
        self.state = DispatchState::Cancelled;
        trace!(parent: &self.span, buffered = self.channel.buffered(), "dispatch cancelled");
        Polled::Cancelled
    }
}
