//! Client error types.

use std::io;

use hangman_protocol::{Command, ProtocolError, StatusCode};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting (or reconnecting) a channel failed.
    #[error("failed to connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Malformed frame, unknown event tag, or peer closed mid-frame.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server answered with a non-success status code.
    #[error("server returned {status}: {message}")]
    Server { status: StatusCode, message: String },

    /// A success reply whose payload does not match the expected shape.
    #[error("failed to decode {command} reply: {source}")]
    Deserialization {
        command: Command,
        #[source]
        source: ProtocolError,
    },

    /// IO error on an established connection.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No reply arrived in time.
    #[error("timed out {0}")]
    Timeout(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Protocol,
    Server,
    Deserialization,
    Io,
    Timeout,
    Config,
}

impl ClientError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a connection error for `addr`.
    pub fn connection(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Connection {
            addr: addr.into(),
            source,
        }
    }

    /// Returns the kind of this error.
    ///
    /// A protocol error caused by the peer going away is reported as
    /// [`ErrorKind::Connection`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Protocol(e) if e.is_connection_closed() => ErrorKind::Connection,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Server { .. } => ErrorKind::Server,
            Self::Deserialization { .. } => ErrorKind::Deserialization,
            Self::Io(_) => ErrorKind::Io,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns the server status code, if this is a server error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
