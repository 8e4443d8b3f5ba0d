//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ClientConfig;
use crate::tracing::TracingOutputFormat;

/// hangman - play networked hangman from the terminal
#[derive(Debug, Parser)]
#[command(name = "hangman")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "HANGMAN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log line format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = TracingOutputFormat::Compact, global = true)]
    pub log_format: TracingOutputFormat,

    // --- Connection flags ---
    /// Game server host
    #[arg(long, env = "HANGMAN_ADDRESS", global = true)]
    pub address: Option<String>,

    /// Port of the game channel
    #[arg(long, env = "HANGMAN_GAME_PORT", global = true)]
    pub game_port: Option<u16>,

    /// Port of the notification channel
    #[arg(long, env = "HANGMAN_NOTIFICATION_PORT", global = true)]
    pub notification_port: Option<u16>,

    /// Connection timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Do not send the SUBSCRIBE handshake on the notification channel
    #[arg(long, global = true)]
    pub no_subscribe: bool,

    // --- Player flags ---
    /// Player username
    #[arg(long, short, env = "HANGMAN_USERNAME", global = true)]
    pub username: Option<String>,

    /// Room password (supports `env::VAR` and `pass::path`)
    #[arg(long, short, env = "HANGMAN_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Overrides file values with the flags that were given.
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(ref address) = self.address {
            config.server.address = address.clone();
        }
        if let Some(port) = self.game_port {
            config.server.game_port = port;
        }
        if let Some(port) = self.notification_port {
            config.server.notification_port = port;
        }
        if let Some(timeout) = self.timeout {
            config.server.connect_timeout_secs = timeout;
        }
        if self.no_subscribe {
            config.server.subscribe_on_connect = false;
        }
        if let Some(ref username) = self.username {
            config.player.username = Some(username.clone());
        }
        if let Some(ref password) = self.password {
            config.player.password = Some(password.clone());
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a room and become its owner
    CreateRoom {
        room_id: String,
        #[arg(long, default_value = "animals")]
        category: String,
        #[arg(long, default_value = "easy")]
        difficulty: String,
    },

    /// Join a room
    JoinRoom { room_id: String },

    /// Start the game in a room you own
    StartGame { room_id: String },

    /// Leave a room
    LeaveRoom { room_id: String },

    /// Delete a room you own
    DeleteRoom { room_id: String },

    /// Guess one letter
    Guess { room_id: String, letter: char },

    /// Show every player's progress in a room's game
    GameState { room_id: String },

    /// Show a room's owner, state and players
    RoomState { room_id: String },

    /// List rooms
    Rooms,

    /// Show the leaderboard
    Leaderboard,

    /// Change room settings
    UpdateRoom {
        room_id: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
        #[arg(long)]
        new_password: Option<String>,
    },

    /// Check whether a username is free
    CheckUsername { username: String },

    /// Print server events as JSON lines until interrupted
    Watch,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
