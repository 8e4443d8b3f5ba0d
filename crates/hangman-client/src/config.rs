//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/hangman/config.toml` by default:
//!
//! ```toml
//! [server]
//! address = "127.0.0.1"
//! game_port = 8001
//! notification_port = 8002
//!
//! [player]
//! username = "alice"
//! password = "env::HANGMAN_PASSWORD"
//! ```
//!
//! The player password supports secret references:
//! - `pass::path/in/store`: resolved via `pass show`
//! - `env::VAR_NAME`: resolved from the environment
//! - plain text: used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Span;

use crate::error::{ClientError, ClientResult};

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the hangman client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Game server endpoints and timings.
    pub server: ServerSettings,

    /// Player identity.
    pub player: PlayerSettings,
}

/// Server endpoints and channel timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host name or IP address of the game server.
    pub address: String,

    /// Port of the request/response channel.
    pub game_port: u16,

    /// Port of the server-push notification channel.
    pub notification_port: u16,

    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Read timeout of one notification poll, in milliseconds.
    pub read_timeout_ms: u64,

    /// Maximum wait for a reply on the game channel, in seconds.
    pub request_timeout_secs: u64,

    /// Pause between empty notification polls, in milliseconds.
    pub poll_interval_ms: u64,

    /// Send a `SUBSCRIBE` handshake on every notification (re)connect.
    pub subscribe_on_connect: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            game_port: 8001,
            notification_port: 8002,
            connect_timeout_secs: 5,
            read_timeout_ms: 1000,
            request_timeout_secs: 10,
            poll_interval_ms: 100,
            subscribe_on_connect: true,
        }
    }
}

/// Player identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Username sent as `player_username` with every request.
    pub username: Option<String>,

    /// Room password (supports `pass::` and `env::` prefixes).
    pub password: Option<String>,
}

impl PlayerSettings {
    /// Resolves the password, expanding secret references.
    pub fn resolve_password(&self) -> ClientResult<Option<String>> {
        self.password
            .as_deref()
            .map(|raw| {
                crate::secret::resolve(raw)
                    .map_err(|e| ClientError::config(format!("failed to resolve password: {}", e)))
            })
            .transpose()
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hangman")
    }

    /// Checks values that deserialize fine but cannot work.
    pub fn validate(&self) -> ClientResult<()> {
        let server = &self.server;
        if server.address.trim().is_empty() {
            return Err(ClientError::config("server.address must not be empty"));
        }
        if server.game_port == 0 || server.notification_port == 0 {
            return Err(ClientError::config("server ports must be non-zero"));
        }
        if server.game_port == server.notification_port {
            return Err(ClientError::config(
                "server.game_port and server.notification_port must differ",
            ));
        }
        if server.read_timeout_ms == 0 {
            return Err(ClientError::config("server.read_timeout_ms must be non-zero"));
        }
        if let Some(username) = &self.player.username
            && username.trim().is_empty()
        {
            return Err(ClientError::config("player.username must not be blank"));
        }
        self.player.resolve_password()?;
        Ok(())
    }

    /// Builds runtime options from the `[server]` section.
    pub fn options(&self) -> ClientOptions {
        let server = &self.server;
        ClientOptions {
            address: server.address.clone(),
            game_port: server.game_port,
            notification_port: server.notification_port,
            connect_timeout: Duration::from_secs(server.connect_timeout_secs),
            read_timeout: Duration::from_millis(server.read_timeout_ms),
            request_timeout: Duration::from_secs(server.request_timeout_secs),
            poll_interval: Duration::from_millis(server.poll_interval_ms),
            subscribe_on_connect: server.subscribe_on_connect,
            span: Span::none(),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientOptions (runtime)
// ---------------------------------------------------------------------------

/// Resolved connection settings handed to [`GameClient::connect`].
///
/// [`GameClient::connect`]: crate::GameClient::connect
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub address: String,
    pub game_port: u16,
    pub notification_port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub subscribe_on_connect: bool,
    /// Parent span for every component the client builds.
    pub span: Span,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientConfig::default().options()
    }
}

impl ClientOptions {
    /// Creates options for `address` with default ports and timings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets both channel ports.
    #[must_use]
    pub fn with_ports(mut self, game_port: u16, notification_port: u16) -> Self {
        self.game_port = game_port;
        self.notification_port = notification_port;
        self
    }

    /// Sets the notification poll read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the game channel reply timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the pause between empty notification polls.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enables or disables the notification handshake.
    #[must_use]
    pub fn with_subscribe_on_connect(mut self, subscribe: bool) -> Self {
        self.subscribe_on_connect = subscribe;
        self
    }

    /// Sets the parent span for client logging.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_server_ports() {
        let config = ClientConfig::default();
        assert_eq!(config.server.address, "127.0.0.1");
        assert_eq!(config.server.game_port, 8001);
        assert_eq!(config.server.notification_port, 8002);
        assert!(config.server.subscribe_on_connect);
        assert!(config.player.username.is_none());

        let options = config.options();
        assert_eq!(options.connect_timeout, Duration::from_secs(5));
        assert_eq!(options.read_timeout, Duration::from_millis(1000));
        assert_eq!(options.poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
[server]
address = "game.example.net"
game_port = 9001

[player]
username = "alice"
"#,
        )
        .unwrap();
        assert_eq!(config.server.address, "game.example.net");
        assert_eq!(config.server.game_port, 9001);
        assert_eq!(config.server.notification_port, 8002);
        assert_eq!(config.player.username.as_deref(), Some("alice"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nnotification_port = 9100\npoll_interval_ms = 250\nsubscribe_on_connect = false"
        )
        .unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();
        let options = config.options();
        assert_eq!(options.notification_port, 9100);
        assert_eq!(options.poll_interval, Duration::from_millis(250));
        assert!(!options.subscribe_on_connect);
    }

    #[test]
    fn load_from_invalid_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\naddress = ").unwrap();

        let err = ClientConfig::load_from(file.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn validate_rejects_shared_port() {
        let mut config = ClientConfig::default();
        config.server.notification_port = config.server.game_port;
        assert!(config.validate().is_err());

        config.server.notification_port = 8002;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn password_env_reference_resolves() {
        unsafe {
            std::env::set_var("_HANGMAN_CONFIG_TEST_PASSWORD", "hunter2");
        }
        let player = PlayerSettings {
            username: Some("alice".to_string()),
            password: Some("env::_HANGMAN_CONFIG_TEST_PASSWORD".to_string()),
        };
        assert_eq!(player.resolve_password().unwrap().as_deref(), Some("hunter2"));
        unsafe {
            std::env::remove_var("_HANGMAN_CONFIG_TEST_PASSWORD");
        }
    }

    #[test]
    fn options_builder() {
        let options = ClientOptions::new("10.0.0.5")
            .with_ports(7001, 7002)
            .with_poll_interval(Duration::from_millis(5))
            .with_subscribe_on_connect(false);
        assert_eq!(options.address, "10.0.0.5");
        assert_eq!(options.game_port, 7001);
        assert_eq!(options.notification_port, 7002);
        assert!(!options.subscribe_on_connect);
    }
}
