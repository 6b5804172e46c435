//! Control surface of the host.
//!
//! Thin functions over [`AppState`] that bridge I/O threads to the tick
//! thread through its command channel.

use std::thread::JoinHandle;

use anyhow::{anyhow, bail, Context, Result};

use vantage_core::commands::SessionCommand;
use vantage_core::config::VantageConfig;
use vantage_core::state::TickSnapshot;

use crate::game_loop;
use crate::state::{AppState, LoopCommand};

/// Start the tick thread. Fails if a session is already running.
pub fn start_session(state: &AppState, config: VantageConfig) -> Result<JoinHandle<()>> {
    let mut running = state.running.lock().map_err(|e| anyhow!(e.to_string()))?;
    if *running {
        bail!("session already running");
    }

    let (cmd_tx, handle) = game_loop::spawn_game_loop(config, state.latest_snapshot.clone())
        .context("failed to spawn tick thread")?;

    let mut tx_lock = state.command_tx.lock().map_err(|e| anyhow!(e.to_string()))?;
    *tx_lock = Some(cmd_tx);
    *running = true;
    log::info!("session started");
    Ok(handle)
}

/// Forward a command to the running session.
pub fn send_command(state: &AppState, command: SessionCommand) -> Result<()> {
    send(state, LoopCommand::Session(command))
}

/// Ask the tick thread to stop.
pub fn stop_session(state: &AppState) -> Result<()> {
    send(state, LoopCommand::Shutdown)?;
    *state.running.lock().map_err(|e| anyhow!(e.to_string()))? = false;
    *state.command_tx.lock().map_err(|e| anyhow!(e.to_string()))? = None;
    Ok(())
}

fn send(state: &AppState, command: LoopCommand) -> Result<()> {
    let tx_lock = state.command_tx.lock().map_err(|e| anyhow!(e.to_string()))?;
    match tx_lock.as_ref() {
        Some(tx) => tx
            .send(command)
            .map_err(|e| anyhow!("failed to send command: {e}")),
        None => bail!("session not started"),
    }
}

/// Latest snapshot, `None` before the first tick.
pub fn get_snapshot(state: &AppState) -> Result<Option<TickSnapshot>> {
    let lock = state
        .latest_snapshot
        .lock()
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(lock.clone())
}

/// Parse one line of host input into a command.
pub fn parse_command(line: &str) -> Result<SessionCommand> {
    serde_json::from_str(line).with_context(|| format!("invalid command: {line}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_before_start_fails() {
        let state = AppState::new();
        let err = send_command(&state, SessionCommand::Populate { count: 1 }).unwrap_err();
        assert!(err.to_string().contains("not started"));
    }

    #[test]
    fn test_start_twice_fails_and_stop_joins() {
        let state = AppState::new();
        let handle = start_session(&state, VantageConfig::default()).unwrap();
        assert!(start_session(&state, VantageConfig::default()).is_err());

        send_command(&state, SessionCommand::Populate { count: 2 }).unwrap();
        stop_session(&state).unwrap();
        handle.join().unwrap();
        assert!(!*state.running.lock().unwrap());
    }

    #[test]
    fn test_parse_command() {
        let command = parse_command(r#"{"type":"EnableModule","name":"ProjectileAimbot"}"#).unwrap();
        assert_eq!(
            command,
            SessionCommand::EnableModule {
                name: "ProjectileAimbot".into()
            }
        );
        assert!(parse_command("{\"type\":\"Jump\"}").is_err());
    }
}
