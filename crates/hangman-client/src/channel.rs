//! One TCP connection to the game server.
//!
//! A [`Channel`] owns the socket of either the game port or the notification
//! port. Every operation starts with [`Channel::ensure_connected`], which
//! reopens the socket when it is down and hands back the current stream, so
//! nothing outside the channel ever holds a stale stream.
//!
//! Reads go through the channel's [`FrameAssembler`]. Each await point is a
//! single cancel-safe `read`, so a receive can be dropped (timeout,
//! cancellation) between reads and the next receive picks up the same frame
//! where it stopped.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use hangman_protocol::{
    ClientEnvelope, FrameAssembler, FramePhase, ProtocolError, ServerEnvelope, encode_frame,
};
use prost::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{Span, debug, info, trace, warn};

use crate::cancel::CancellationToken;
use crate::error::{ClientError, ClientResult};

/// Which server port a channel talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Request/response traffic.
    Game,
    /// Server-pushed events.
    Notification,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Game => f.write_str("game"),
            Self::Notification => f.write_str("notification"),
        }
    }
}

/// Outcome of a cancellable receive.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Envelope(ServerEnvelope),
    /// The token fired first. The connection and any partial frame are kept.
    Cancelled,
}

/// A reconnecting, framed TCP connection.
#[derive(Debug)]
pub struct Channel {
    kind: ChannelKind,
    address: String,
    port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
    stream: Option<TcpStream>,
    assembler: FrameAssembler,
    generation: u64,
    span: Span,
}

impl Channel {
    /// Creates a disconnected channel for `address:port`.
    pub fn new(kind: ChannelKind, address: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            address: address.into(),
            port,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(1),
            stream: None,
            assembler: FrameAssembler::new(),
            generation: 0,
            span: Span::none(),
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the timeout of a degraded [`receive`](Self::receive).
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the span channel events are recorded under.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Returns the channel kind.
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Returns `address:port` of the configured endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Returns true while a socket is open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Number of sockets opened so far. Changes on every (re)connect.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns where the channel is within the frame being read.
    pub fn frame_phase(&self) -> FramePhase {
        self.assembler.phase()
    }

    /// Bytes of a partially read frame held across abandoned reads.
    pub fn buffered(&self) -> usize {
        self.assembler.buffered()
    }

    /// Returns the peer address of the open socket.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.peer_addr().ok())
    }

    /// Raw access to the open socket, for callers that drive it directly.
    pub fn stream_mut(&mut self) -> Option<&mut TcpStream> {
        self.stream.as_mut()
    }

    /// Points the channel at `address:port` and opens a fresh socket.
    ///
    /// Any live socket is closed first.
    pub async fn connect(&mut self, address: impl Into<String>, port: u16) -> ClientResult<()> {
        self.address = address.into();
        self.port = port;
        self.reconnect().await
    }

    /// Drops the current socket (if any) and opens a new one.
    pub async fn reconnect(&mut self) -> ClientResult<()> {
        self.close().await;
        self.ensure_connected().await.map(|_| ())
    }

    /// Returns the open socket, connecting first when there is none.
    pub async fn ensure_connected(&mut self) -> ClientResult<&mut TcpStream> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                let stream = self.open().await?;
                self.assembler.reset();
                self.generation += 1;
                stream
            }
        };
        Ok(self.stream.insert(stream))
    }

    async fn open(&self) -> ClientResult<TcpStream> {
        let endpoint = self.endpoint();
        debug!(parent: &self.span, channel = %self.kind, %endpoint, "connecting");

        let stream = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((self.address.as_str(), self.port)),
        )
        .await
        .map_err(|_| {
            ClientError::connection(
                endpoint.clone(),
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no answer after {}s", self.connect_timeout.as_secs()),
                ),
            )
        })?
        .map_err(|e| ClientError::connection(endpoint.clone(), e))?;

        // Frames are small; do not wait to coalesce them.
        let _ = stream.set_nodelay(true);

        info!(parent: &self.span, channel = %self.kind, %endpoint, "connected");
        Ok(stream)
    }

    /// Shuts the socket down and forgets it. Errors are ignored.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            debug!(parent: &self.span, channel = %self.kind, "closed");
        }
        self.assembler.reset();
    }

    fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            debug!(parent: &self.span, channel = %self.kind, "dropping socket");
        }
        self.assembler.reset();
    }

    /// Writes one framed envelope, reconnecting first if needed.
    ///
    /// On a write error the socket is dropped and the error returned; the
    /// next operation reconnects.
    pub async fn send(&mut self, envelope: &ClientEnvelope) -> ClientResult<()> {
        let frame = encode_frame(envelope)?;
        let stream = self.ensure_connected().await?;

        let result = async {
            stream.write_all(&frame).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!(parent: &self.span, channel = %self.kind, error = %e, "send failed");
            self.disconnect();
            return Err(e.into());
        }

        trace!(
            parent: &self.span,
            channel = %self.kind,
            command = %envelope.command,
            bytes = frame.len(),
            "frame sent"
        );
        Ok(())
    }

    /// Reads one envelope, waiting at most the read timeout.
    ///
    /// A timeout or a broken socket yields the empty envelope instead of an
    /// error; a broken socket is also dropped so the next call reconnects.
    /// Connect failures and malformed frames are still errors.
    pub async fn receive(&mut self) -> ClientResult<ServerEnvelope> {
        self.ensure_connected().await?;

        match tokio::time::timeout(self.read_timeout, self.read_envelope()).await {
            Ok(Ok(envelope)) => Ok(envelope),
            Ok(Err(e)) if is_transport_failure(&e) => {
                warn!(
                    parent: &self.span,
                    channel = %self.kind,
                    error = %e,
                    "read failed, returning empty envelope"
                );
                self.disconnect();
                Ok(ServerEnvelope::default())
            }
            Ok(Err(e)) => Err(self.fail(e)),
            Err(_) => {
                trace!(
                    parent: &self.span,
                    channel = %self.kind,
                    buffered = self.buffered(),
                    "read timed out"
                );
                Ok(ServerEnvelope::default())
            }
        }
    }

    /// Reads one envelope with no timeout. Every failure is an error.
    pub async fn receive_frame(&mut self) -> ClientResult<ServerEnvelope> {
        self.ensure_connected().await?;
        match self.read_envelope().await {
            Ok(envelope) => Ok(envelope),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Reads one envelope unless `token` fires first.
    ///
    /// Cancellation leaves the socket open and keeps the bytes of a partial
    /// frame, so the next receive continues the same frame.
    pub async fn receive_cancellable(
        &mut self,
        token: &CancellationToken,
    ) -> ClientResult<Received> {
        if token.is_cancelled() {
            return Ok(Received::Cancelled);
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(Received::Cancelled),
            connected = self.ensure_connected() => { connected?; }
        }

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.read_envelope() => Some(result),
        };

        match outcome {
            None => {
                debug!(
                    parent: &self.span,
                    channel = %self.kind,
                    buffered = self.buffered(),
                    "receive cancelled"
                );
                Ok(Received::Cancelled)
            }
            Some(Ok(envelope)) => Ok(Received::Envelope(envelope)),
            Some(Err(e)) => Err(self.fail(e)),
        }
    }

    /// Feeds the assembler until a frame completes.
    ///
    /// Cancel-safe: the only await is `read`, and bytes it returns are
    /// recorded before the next await.
    async fn read_envelope(&mut self) -> ClientResult<ServerEnvelope> {
        let Self {
            stream, assembler, ..
        } = self;
        let Some(stream) = stream.as_mut() else {
            return Err(io::Error::from(io::ErrorKind::NotConnected).into());
        };

        loop {
            let n = match stream.read(assembler.unfilled()).await {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if let Some(body) = assembler.advance(n)? {
                let envelope =
                    ServerEnvelope::decode(body.as_slice()).map_err(ProtocolError::from)?;
                return Ok(envelope);
            }
        }
    }

    /// Drops the socket unless the stream is still aligned on a frame
    /// boundary, then hands the error back.
    fn fail(&mut self, err: ClientError) -> ClientError {
        let aligned = matches!(err, ClientError::Protocol(ProtocolError::Envelope(_)));
        if !aligned {
            self.disconnect();
        }
        warn!(parent: &self.span, channel = %self.kind, error = %err, "receive failed");
        err
    }
}

fn is_transport_failure(err: &ClientError) -> bool {
    match err {
        ClientError::Io(_) => true,
        ClientError::Protocol(e) => e.is_connection_closed(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{accept, listener, read_request, write_raw, write_reply};

    fn game_channel(port: u16) -> Channel {
        Channel::new(ChannelKind::Game, "127.0.0.1", port)
            .with_read_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn send_and_receive_frame() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener).await;
            let request = read_request(&mut socket).await;
            assert_eq!(request.command, "GET_ALL_ROOMS");
            assert_eq!(request.payload, b"{}");
            write_reply(&mut socket, &ServerEnvelope::success("ok", br#"{"rooms":[]}"#.to_vec()))
                .await;
        });

        let mut channel = game_channel(port);
        assert!(!channel.is_connected());

        channel
            .send(&ClientEnvelope::new("GET_ALL_ROOMS", b"{}".to_vec()))
            .await
            .unwrap();
        assert!(channel.is_connected());
        assert_eq!(channel.generation(), 1);
        assert_eq!(channel.peer_addr().map(|a| a.port()), Some(port));

        let reply = channel.receive_frame().await.unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.payload, br#"{"rooms":[]}"#);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connect_is_connection_error() {
        let (listener, port) = listener().await;
        drop(listener);

        let mut channel = game_channel(port);
        let err = channel.ensure_connected().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn receive_times_out_to_empty_envelope() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let socket = accept(&listener).await;
            tokio::time::sleep(Duration::from_millis(300)).await;
            drop(socket);
        });

        let mut channel = game_channel(port);
        let envelope = channel.receive().await.unwrap();
        assert!(envelope.is_empty());
        // A timeout keeps the socket.
        assert!(channel.is_connected());
        assert_eq!(channel.generation(), 1);

        server.abort();
    }

    #[tokio::test]
    async fn receive_after_peer_close_reconnects() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let first = accept(&listener).await;
            drop(first);

            let mut second = accept(&listener).await;
            write_reply(&mut second, &ServerEnvelope::success("PlayerLeft", b"{}".to_vec())).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        let mut channel = game_channel(port).with_read_timeout(Duration::from_millis(500));
        let envelope = channel.receive().await.unwrap();
        assert!(envelope.is_empty());
        assert!(!channel.is_connected());

        let envelope = channel.receive().await.unwrap();
        assert_eq!(envelope.message, "PlayerLeft");
        assert_eq!(channel.generation(), 2);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn zero_length_frame_is_empty_envelope() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener).await;
            write_raw(&mut socket, &0u32.to_be_bytes()).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        let mut channel = game_channel(port);
        let envelope = channel.receive_frame().await.unwrap();
        assert!(envelope.is_empty());
        assert!(channel.is_connected());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_mid_body_keeps_connection_usable() {
        let (listener, port) = listener().await;
        let (resume_tx, resume_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let mut socket = accept(&listener).await;

            let reply = ServerEnvelope::success("ok", br#"{"message":"first"}"#.to_vec());
            let frame = encode_frame(&reply).unwrap();
            let (head, tail) = frame.split_at(7);
            write_raw(&mut socket, head).await;

            resume_rx.await.unwrap();
            write_raw(&mut socket, tail).await;

            let request = read_request(&mut socket).await;
            assert_eq!(request.command, "GET_LEADERBOARD");
            write_reply(&mut socket, &ServerEnvelope::success("ok", br#"{"players":[]}"#.to_vec()))
                .await;
        });

        let mut channel = game_channel(port);
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let outcome = channel.receive_cancellable(&token).await.unwrap();
        assert_eq!(outcome, Received::Cancelled);
        assert!(channel.is_connected());
        assert_eq!(channel.frame_phase(), FramePhase::AwaitingBody);
        assert_eq!(channel.buffered(), 7);

        resume_tx.send(()).unwrap();
        let first = channel.receive_frame().await.unwrap();
        assert_eq!(first.payload, br#"{"message":"first"}"#);

        channel
            .send(&ClientEnvelope::new("GET_LEADERBOARD", b"{}".to_vec()))
            .await
            .unwrap();
        let second = channel.receive_frame().await.unwrap();
        assert_eq!(second.payload, br#"{"players":[]}"#);
        assert_eq!(channel.generation(), 1);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_token_returns_before_connecting() {
        let token = CancellationToken::new();
        token.cancel();

        let mut channel = game_channel(1);
        let outcome = channel.receive_cancellable(&token).await.unwrap();
        assert_eq!(outcome, Received::Cancelled);
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn peer_close_mid_frame_is_strict_error() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let mut socket = accept(&listener).await;
            let mut bytes = 20u32.to_be_bytes().to_vec();
            bytes.extend_from_slice(b"short");
            write_raw(&mut socket, &bytes).await;
        });

        let mut channel = game_channel(port);
        let err = channel.receive_frame().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(!channel.is_connected());
        assert_eq!(channel.buffered(), 0);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn close_then_send_reconnects() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            for _ in 0..2 {
                let mut socket = accept(&listener).await;
                let request = read_request(&mut socket).await;
                assert_eq!(request.command, "GET_ALL_ROOMS");
            }
        });

        let mut channel = game_channel(port);
        let envelope = ClientEnvelope::new("GET_ALL_ROOMS", b"{}".to_vec());
        channel.send(&envelope).await.unwrap();
        channel.close().await;
        assert!(!channel.is_connected());

        channel.send(&envelope).await.unwrap();
        assert_eq!(channel.generation(), 2);

        server.await.unwrap();
    }
}
