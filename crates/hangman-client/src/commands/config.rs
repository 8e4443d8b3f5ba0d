//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret;

/// Dump the effective configuration to stdout.
///
/// A plain-text password is masked; secret references are shown as written.
pub fn dump(config: &ClientConfig) -> ClientResult<()> {
    println!("# config.toml ({})", ClientConfig::default_path().display());
    println!("{}", render(config)?);
    Ok(())
}

fn render(config: &ClientConfig) -> ClientResult<String> {
    let mut shown = config.clone();
    if let Some(password) = shown.player.password.as_mut()
        && !secret::is_reference(password)
    {
        *password = "********".to_string();
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| ClientError::config(format!("failed to serialize config: {}", e)))
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;
    if config.player.username.is_none() {
        println!("No [player] username set; pass --username to play.");
    }
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(explicit: Option<&Path>) -> ClientResult<()> {
    match explicit {
        Some(path) => println!("config: {}", path.display()),
        None => println!("config: {}", ClientConfig::default_path().display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_masks_plain_password() {
        let mut config = ClientConfig::default();
        config.player.username = Some("alice".to_string());
        config.player.password = Some("hunter2".to_string());

        let rendered = render(&config).unwrap();
        assert!(rendered.contains("username = \"alice\""));
        assert!(rendered.contains("********"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("game_port = 8001"));
    }

    #[test]
    fn render_keeps_secret_reference() {
        let mut config = ClientConfig::default();
        config.player.password = Some("env::ROOM_PASSWORD".to_string());

        let rendered = render(&config).unwrap();
        assert!(rendered.contains("env::ROOM_PASSWORD"));
    }

    #[test]
    fn rendered_config_parses_back() {
        let config = ClientConfig::default();
        let rendered = render(&config).unwrap();
        let parsed: ClientConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.server, config.server);
    }
}
