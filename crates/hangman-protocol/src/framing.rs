//! Length-prefixed frame codec.
//!
//! Every envelope travels behind a 4-byte big-endian length prefix:
//!
//! ```text
//! +----------------+------------------------+
//! | length (4 BE)  |  protobuf envelope     |
//! +----------------+------------------------+
//! ```
//!
//! A zero length is legal: the all-default envelope encodes to no bytes.

use std::io::{ErrorKind, Read, Write};

use prost::Message;

use crate::envelope::ClientEnvelope;
use crate::error::{ProtocolError, ProtocolResult};
use crate::{HEADER_LEN, MAX_FRAME_SIZE};

/// Encodes an envelope with its length prefix.
///
/// # Example
///
/// ```rust
/// use hangman_protocol::{encode_frame, ClientEnvelope};
///
/// let envelope = ClientEnvelope::new("GET_ALL_ROOMS", b"{}".to_vec());
/// let bytes = encode_frame(&envelope).unwrap();
/// assert_eq!(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize, bytes.len() - 4);
/// ```
pub fn encode_frame<M: Message>(message: &M) -> ProtocolResult<Vec<u8>> {
    let body = message.encode_to_vec();
    let len = u32::try_from(body.len()).unwrap_or(u32::MAX);

    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buffer = Vec::with_capacity(HEADER_LEN + body.len());
    buffer.extend_from_slice(&len.to_be_bytes());
    buffer.extend_from_slice(&body);
    Ok(buffer)
}

/// Builds a [`ClientEnvelope`] and encodes it as a frame.
pub fn encode_request(command: &str, payload: Vec<u8>) -> ProtocolResult<Vec<u8>> {
    encode_frame(&ClientEnvelope::new(command, payload))
}

/// Decodes the length prefix.
pub fn decode_header(header: [u8; HEADER_LEN]) -> u32 {
    u32::from_be_bytes(header)
}

/// Reads exactly `len` envelope bytes from `reader` and decodes them.
///
/// Short reads are retried until the body is complete; a read returning
/// zero bytes before that means the peer closed the connection.
pub fn decode_body<M, R>(len: u32, reader: &mut R) -> ProtocolResult<M>
where
    M: Message + Default,
    R: Read,
{
    check_size(len)?;

    let mut body = vec![0u8; len as usize];
    let mut filled = 0;
    while filled < body.len() {
        match reader.read(&mut body[filled..]) {
            Ok(0) => {
                return Err(ProtocolError::ConnectionClosed {
                    expected: body.len(),
                    received: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(M::decode(body.as_slice())?)
}

/// Decodes a complete frame (length prefix + envelope) held in memory.
pub fn decode_frame<M: Message + Default>(data: &[u8]) -> ProtocolResult<M> {
    if data.len() < HEADER_LEN {
        return Err(ProtocolError::IncompleteFrame {
            expected: HEADER_LEN,
            received: data.len(),
        });
    }

    let len = decode_header([data[0], data[1], data[2], data[3]]);
    check_size(len)?;

    let end = HEADER_LEN + len as usize;
    if data.len() < end {
        return Err(ProtocolError::IncompleteFrame {
            expected: end,
            received: data.len(),
        });
    }

    Ok(M::decode(&data[HEADER_LEN..end])?)
}

fn check_size(len: u32) -> ProtocolResult<()> {
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(())
}

/// Where a [`FrameAssembler`] is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Collecting the 4-byte length prefix.
    AwaitingHeader,
    /// Collecting the envelope bytes.
    AwaitingBody,
}

/// Incremental frame reassembly.
///
/// The assembler owns the partially read frame, so an I/O loop can be
/// abandoned between reads (timeout, cancellation) and resumed later without
/// losing stream alignment. Feed it with:
///
/// 1. [`unfilled`](Self::unfilled): the slice the next read should fill,
/// 2. [`advance`](Self::advance): how many bytes that read produced.
///
/// `advance` returns the complete envelope bytes once a frame is done.
#[derive(Debug)]
pub struct FrameAssembler {
    phase: FramePhase,
    header: [u8; HEADER_LEN],
    header_filled: usize,
    body: Vec<u8>,
    body_filled: usize,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    /// Creates an assembler waiting for a header.
    pub fn new() -> Self {
        Self {
            phase: FramePhase::AwaitingHeader,
            header: [0; HEADER_LEN],
            header_filled: 0,
            body: Vec::new(),
            body_filled: 0,
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Returns true if no byte of the next frame has been seen yet.
    pub fn is_idle(&self) -> bool {
        self.phase == FramePhase::AwaitingHeader && self.header_filled == 0
    }

    /// Number of bytes of the current frame buffered so far.
    pub fn buffered(&self) -> usize {
        self.header_filled + self.body_filled
    }

    /// Returns the slice the next read should write into. Never empty.
    pub fn unfilled(&mut self) -> &mut [u8] {
        match self.phase {
            FramePhase::AwaitingHeader => &mut self.header[self.header_filled..],
            FramePhase::AwaitingBody => &mut self.body[self.body_filled..],
        }
    }

    /// Records `n` freshly read bytes.
    ///
    /// Returns the envelope bytes when the frame is complete. `n == 0` means
    /// the reader hit end-of-stream and yields
    /// [`ProtocolError::ConnectionClosed`].
    pub fn advance(&mut self, n: usize) -> ProtocolResult<Option<Vec<u8>>> {
        if n == 0 {
            let (expected, received) = match self.phase {
                FramePhase::AwaitingHeader => (HEADER_LEN, self.header_filled),
                FramePhase::AwaitingBody => (self.body.len(), self.body_filled),
            };
            self.reset();
            return Err(ProtocolError::ConnectionClosed { expected, received });
        }

        match self.phase {
            FramePhase::AwaitingHeader => {
                self.header_filled += n;
                if self.header_filled < HEADER_LEN {
                    return Ok(None);
                }

                let len = decode_header(self.header);
                if let Err(e) = check_size(len) {
                    self.reset();
                    return Err(e);
                }
                if len == 0 {
                    self.reset();
                    return Ok(Some(Vec::new()));
                }

                self.body = vec![0u8; len as usize];
                self.body_filled = 0;
                self.phase = FramePhase::AwaitingBody;
                Ok(None)
            }
            FramePhase::AwaitingBody => {
                self.body_filled += n;
                if self.body_filled < self.body.len() {
                    return Ok(None);
                }

                let body = std::mem::take(&mut self.body);
                self.reset();
                Ok(Some(body))
            }
        }
    }

    /// Drops any partial frame.
    pub fn reset(&mut self) {
        self.phase = FramePhase::AwaitingHeader;
        self.header_filled = 0;
        self.body.clear();
        self.body_filled = 0;
    }
}

/// Reads framed envelopes from a blocking byte stream.
pub struct FrameReader<R> {
    reader: R,
    assembler: FrameAssembler,
}

impl<R: Read> FrameReader<R> {
    /// Creates a new FrameReader wrapping the given reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            assembler: FrameAssembler::new(),
        }
    }

    /// Reads a single framed envelope.
    ///
    /// Returns `Ok(None)` on a clean end-of-stream between frames.
    pub fn read_message<M: Message + Default>(&mut self) -> ProtocolResult<Option<M>> {
        loop {
            let n = match self.reader.read(self.assembler.unfilled()) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if n == 0 && self.assembler.is_idle() {
                return Ok(None);
            }

            if let Some(body) = self.assembler.advance(n)? {
                return Ok(Some(M::decode(body.as_slice())?));
            }
        }
    }

    /// Returns a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Unwraps this FrameReader, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writes framed envelopes to a blocking byte stream.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: Write> FrameWriter<W> {
    /// Creates a new FrameWriter wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a single framed envelope.
    pub fn write_message<M: Message>(&mut self, message: &M) -> ProtocolResult<()> {
        let data = encode_frame(message)?;
        self.writer.write_all(&data)?;
        Ok(())
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> ProtocolResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Unwraps this FrameWriter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
