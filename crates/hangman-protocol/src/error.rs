//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while framing, decoding or classifying messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Header announces an envelope larger than the accepted maximum.
    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: u32, max: u32 },

    /// Envelope bytes are not a valid protobuf message.
    #[error("malformed envelope: {0}")]
    Envelope(#[from] prost::DecodeError),

    /// Payload JSON could not be produced or parsed.
    #[error("payload JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Buffer ends before the frame it announces.
    #[error("incomplete frame: expected {expected} bytes, got {received}")]
    IncompleteFrame { expected: usize, received: usize },

    /// The peer closed the stream while a frame was still pending.
    #[error("connection closed by peer: expected {expected} bytes, got {received}")]
    ConnectionClosed { expected: usize, received: usize },

    /// Notification envelope carried a tag outside the known event set.
    #[error("unknown event type: {0}")]
    UnknownEvent(String),
}

impl ProtocolError {
    /// Returns true if this error means the peer went away.
    pub fn is_connection_closed(&self) -> bool {
        match self {
            Self::ConnectionClosed { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
