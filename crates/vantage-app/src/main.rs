//! Headless host: reads JSON commands from stdin, one per line, and prints
//! the final snapshot as JSON when input ends.
//!
//! Usage: `vantage-app [config.json]`. Set `RUST_LOG` for logging.

use std::io::{self, BufRead};

use anyhow::{Context, Result};

use vantage_app::control;
use vantage_app::state::AppState;
use vantage_core::config::VantageConfig;

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => VantageConfig::load(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => VantageConfig::default(),
    };

    let state = AppState::new();
    let handle = control::start_session(&state, config)?;

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        match control::parse_command(&line) {
            Ok(command) => control::send_command(&state, command)?,
            Err(err) => log::warn!("{err:#}"),
        }
    }

    control::stop_session(&state)?;
    if handle.join().is_err() {
        anyhow::bail!("tick thread panicked");
    }

    if let Some(snapshot) = control::get_snapshot(&state)? {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}
