//! Game commands: one request per invocation, or an event stream.

use std::io::Write;

use serde::Serialize;
use tracing::{Span, debug};

use crate::cancel::{CancellationToken, spawn_signal_listener};
use crate::cli::Command;
use crate::client::GameClient;
use crate::config::ClientConfig;
use crate::driver::RoomChanges;
use crate::error::{ClientError, ClientResult};

/// Connects as the configured player and runs `command`, printing the
/// reply as JSON.
pub async fn run(command: Command, config: &ClientConfig, span: Span) -> ClientResult<()> {
    let username = config.player.username.clone().ok_or_else(|| {
        ClientError::config(format!(
            "no username set. Pass --username or add to {}:\n  [player]\n  username = \"alice\"",
            ClientConfig::default_path().display()
        ))
    })?;
    let password = config.player.resolve_password()?.unwrap_or_default();

    let options = config.options().with_span(span);
    let mut client = GameClient::connect(&options, username).await?;

    let result = match command {
        Command::CreateRoom {
            room_id,
            category,
            difficulty,
        } => print_json(
            &client
                .create_room(&room_id, &password, &category, &difficulty)
                .await?,
        ),
        Command::JoinRoom { room_id } => print_json(&client.join_room(&room_id, &password).await?),
        Command::StartGame { room_id } => {
            print_json(&client.start_game(&room_id, &password).await?)
        }
        Command::LeaveRoom { room_id } => {
            print_json(&client.leave_room(&room_id, &password).await?)
        }
        Command::DeleteRoom { room_id } => {
            print_json(&client.delete_room(&room_id, &password).await?)
        }
        Command::Guess { room_id, letter } => {
            print_json(&client.guess_letter(&room_id, &password, letter).await?)
        }
        Command::GameState { room_id } => print_json(&client.game_state(&room_id).await?),
        Command::RoomState { room_id } => {
            print_json(&client.room_state(&room_id, &password).await?)
        }
        Command::Rooms => print_json(&client.all_rooms().await?),
        Command::Leaderboard => print_json(&client.leaderboard().await?),
        Command::UpdateRoom {
            room_id,
            category,
            difficulty,
            new_password,
        } => {
            let changes = RoomChanges {
                category,
                difficulty,
                new_password,
            };
            print_json(&client.update_room(&room_id, &password, changes).await?)
        }
        Command::CheckUsername { username } => {
            print_json(&client.check_username(&username).await?)
        }
        Command::Watch => return watch(client).await,
        Command::Config { .. } => Err(ClientError::config(
            "config commands do not need a connection",
        )),
    };

    client.close().await;
    result
}

/// Streams events as JSON lines until Ctrl+C or a fatal error.
async fn watch(client: GameClient) -> ClientResult<()> {
    let token = CancellationToken::new();
    let listener = spawn_signal_listener(token.clone());

    let (_driver, dispatcher) = client.split();
    let (mut events, handle) = dispatcher.spawn(token.clone());

    let mut outcome = Ok(());
    while let Some(event) = events.recv().await {
        match event {
            Ok(event) => {
                if let Err(e) = print_json_line(&event) {
                    outcome = Err(e);
                    break;
                }
            }
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }

    token.cancel();
    drop(events);
    if let Ok(mut dispatcher) = handle.await {
        dispatcher.channel_mut().close().await;
    }
    listener.abort();
    debug!("watch finished");
    outcome
}

fn print_json<T: Serialize>(value: &T) -> ClientResult<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(|e| ClientError::Io(e.into()))?;
    writeln!(stdout)?;
    Ok(())
}

fn print_json_line<T: Serialize>(value: &T) -> ClientResult<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value).map_err(|e| ClientError::Io(e.into()))?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn missing_username_is_config_error() {
        let config = ClientConfig::default();
        let err = run(Command::Rooms, &config, Span::none()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("--username"));
    }
}
