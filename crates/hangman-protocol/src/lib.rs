//! Wire protocol for the hangman game client.
//!
//! Both the game channel and the notification channel carry the same frames:
//!
//! - 4 bytes: envelope length (u32, big-endian)
//! - N bytes: protobuf-encoded envelope
//!
//! # Envelopes
//!
//! Outbound frames carry a [`ClientEnvelope`] (`command` + opaque payload),
//! inbound frames carry a [`ServerEnvelope`] (`status_code`, `message` +
//! opaque payload). Payload bytes hold a UTF-8 JSON document with snake_case
//! keys, described by the types in [`dto`] and [`event`].
//!
//! # Example
//!
//! ```rust
//! use hangman_protocol::{decode_frame, encode_frame, ServerEnvelope};
//!
//! let reply = ServerEnvelope::success("ok", br#"{"room_id":"r1"}"#.to_vec());
//! let bytes = encode_frame(&reply).unwrap();
//! let decoded: ServerEnvelope = decode_frame(&bytes).unwrap();
//! assert_eq!(decoded, reply);
//! ```

pub mod dto;
mod envelope;
mod error;
pub mod event;
mod framing;

pub use dto::{Command, Operation, from_payload, to_payload};
pub use envelope::{ClientEnvelope, STATUS_SUCCESS, ServerEnvelope, StatusCode};
pub use error::{ProtocolError, ProtocolResult};
pub use event::{EventKind, GameEvent};
pub use framing::{
    FrameAssembler, FramePhase, FrameReader, FrameWriter, decode_body, decode_frame,
    decode_header, encode_frame, encode_request,
};

/// Size of the big-endian length prefix in front of every envelope.
pub const HEADER_LEN: usize = 4;

/// Maximum envelope size accepted from a header (16 MiB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;
