//! Loopback fake server helpers for channel-level tests.

use hangman_protocol::{ClientEnvelope, ServerEnvelope, decode_frame, encode_frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Binds a listener on an ephemeral loopback port.
pub(crate) async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

pub(crate) async fn accept(listener: &TcpListener) -> TcpStream {
    let (socket, _) = listener.accept().await.unwrap();
    socket
}

/// Reads one framed client envelope.
pub(crate) async fn read_request(socket: &mut TcpStream) -> ClientEnvelope {
    let mut frame = vec![0u8; 4];
    socket.read_exact(&mut frame).await.unwrap();
    let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    frame.resize(4 + len, 0);
    socket.read_exact(&mut frame[4..]).await.unwrap();
    decode_frame(&frame).unwrap()
}

pub(crate) async fn write_reply(socket: &mut TcpStream, reply: &ServerEnvelope) {
    let frame = encode_frame(reply).unwrap();
    write_raw(socket, &frame).await;
}

pub(crate) async fn write_raw(socket: &mut TcpStream, bytes: &[u8]) {
    socket.write_all(bytes).await.unwrap();
    socket.flush().await.unwrap();
}

/// Builds a notification envelope.
pub(crate) fn event(tag: &str, payload: &str) -> ServerEnvelope {
    ServerEnvelope::success(tag, payload.as_bytes().to_vec())
}
