//! Hangman game client.
//!
//! Two TCP connections to the game server:
//!
//! - the **game channel** carries request/reply pairs ([`Correlator`],
//!   [`GameDriver`]),
//! - the **notification channel** carries server-pushed events
//!   ([`EventDispatcher`]).
//!
//! [`GameClient`] owns both. This crate also provides the `hangman`
//! command-line interface.

pub mod cancel;
pub mod channel;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod correlator;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod secret;
pub mod tracing;

#[cfg(test)]
mod test_support;

pub use cancel::CancellationToken;
pub use channel::{Channel, ChannelKind, Received};
pub use cli::Cli;
pub use client::GameClient;
pub use config::{ClientConfig, ClientOptions};
pub use correlator::Correlator;
pub use dispatcher::{DispatchState, EventDispatcher, Polled};
pub use driver::{GameDriver, RoomChanges};
pub use error::{ClientError, ClientResult, ErrorKind};
