//! Tick thread: runs the aim session at the host tick rate.
//!
//! The session is built inside the thread because it is not `Send`.
//! Commands arrive via `mpsc` and are applied at the next tick boundary;
//! each tick's snapshot is stored in shared state for polling.

use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use vantage_aim::AimSession;
use vantage_core::config::VantageConfig;
use vantage_core::constants::TICKS_PER_SECOND;
use vantage_core::state::TickSnapshot;

use crate::state::LoopCommand;

/// Nominal duration of one tick.
const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICKS_PER_SECOND as u64);

/// Spawn the tick thread.
///
/// Returns the command sender and the thread handle.
pub fn spawn_game_loop(
    config: VantageConfig,
    latest_snapshot: Arc<Mutex<Option<TickSnapshot>>>,
) -> io::Result<(mpsc::Sender<LoopCommand>, JoinHandle<()>)> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<LoopCommand>();

    let handle = std::thread::Builder::new()
        .name("vantage-tick".into())
        .spawn(move || {
            let mut session = AimSession::new(config);
            run_game_loop(&mut session, cmd_rx, &latest_snapshot, TICK_DURATION);
        })?;

    Ok((cmd_tx, handle))
}

/// Tick until a Shutdown command arrives or every sender is gone.
///
/// Returns the number of ticks run.
pub fn run_game_loop(
    session: &mut AimSession,
    cmd_rx: mpsc::Receiver<LoopCommand>,
    latest_snapshot: &Mutex<Option<TickSnapshot>>,
    tick_duration: Duration,
) -> u64 {
    let mut next_tick_time = Instant::now();
    let mut ticks = 0;

    loop {
        // 1. Drain pending commands
        let mut queued = 0;
        let mut stopping = false;
        loop {
            match cmd_rx.try_recv() {
                Ok(LoopCommand::Session(cmd)) => {
                    session.queue_command(cmd);
                    queued += 1;
                }
                Ok(LoopCommand::Shutdown) | Err(mpsc::TryRecvError::Disconnected) => {
                    stopping = true;
                    break;
                }
                Err(mpsc::TryRecvError::Empty) => break,
            }
        }

        // Commands sent ahead of the stop still get their tick.
        if stopping && queued == 0 {
            log::info!("tick loop stopping after {ticks} ticks");
            return ticks;
        }

        // 2. Advance one tick
        let snapshot = session.tick();
        ticks += 1;
        log::trace!("tick {} rotation {:?}", snapshot.tick, snapshot.rotation);

        // 3. Publish for polling
        if let Ok(mut lock) = latest_snapshot.lock() {
            *lock = Some(snapshot);
        }

        if stopping {
            log::info!("tick loop stopping after {ticks} ticks");
            return ticks;
        }

        // 4. Sleep until the next tick
        next_tick_time += tick_duration;
        let now = Instant::now();
        if next_tick_time > now {
            std::thread::sleep(next_tick_time - now);
        } else if now - next_tick_time > tick_duration * 2 {
            // Too far behind: reset instead of bursting to catch up
            log::warn!("tick loop is {:?} behind", now - next_tick_time);
            next_tick_time = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use vantage_core::commands::{EntitySpawn, SessionCommand};

    #[test]
    fn test_command_channel_round_trip() {
        let (tx, rx) = mpsc::channel::<LoopCommand>();

        tx.send(LoopCommand::Session(SessionCommand::Populate { count: 3 }))
            .unwrap();
        tx.send(LoopCommand::Session(SessionCommand::SetInventoryOpen {
            open: true,
        }))
        .unwrap();
        tx.send(LoopCommand::Shutdown).unwrap();

        let commands: Vec<_> = rx.try_iter().collect();
        assert_eq!(commands.len(), 3);
        assert!(matches!(
            commands[0],
            LoopCommand::Session(SessionCommand::Populate { count: 3 })
        ));
        assert!(matches!(commands[2], LoopCommand::Shutdown));
    }

    #[test]
    fn test_loop_applies_commands_and_stops_on_disconnect() {
        let (tx, rx) = mpsc::channel::<LoopCommand>();
        let latest = Mutex::new(None);
        let mut session = AimSession::new(VantageConfig::default());

        tx.send(LoopCommand::Session(SessionCommand::SpawnEntity {
            spawn: EntitySpawn {
                position: DVec3::new(0.0, 0.0, 15.0),
                ..EntitySpawn::default()
            },
        }))
        .unwrap();
        drop(tx);

        // The spawn is applied on one last tick, then the disconnect ends
        // the loop.
        let ticks = run_game_loop(&mut session, rx, &latest, Duration::ZERO);
        assert_eq!(ticks, 1);
        let snapshot = latest.lock().unwrap().clone().unwrap();
        assert_eq!(snapshot.tick, 1);
        assert!(snapshot.target.is_some());
    }

    #[test]
    fn test_commands_before_shutdown_are_applied() {
        let (tx, rx) = mpsc::channel::<LoopCommand>();
        let latest = Mutex::new(None);
        let mut session = AimSession::new(VantageConfig::default());

        tx.send(LoopCommand::Session(SessionCommand::Populate { count: 5 }))
            .unwrap();
        tx.send(LoopCommand::Shutdown).unwrap();

        let ticks = run_game_loop(&mut session, rx, &latest, Duration::ZERO);
        assert_eq!(ticks, 1);
        assert_eq!(session.context().world.len(), 6);
        let snapshot = latest.lock().unwrap().clone().unwrap();
        assert_eq!(snapshot.tick, 1);
    }

    #[test]
    fn test_idle_shutdown_runs_no_tick() {
        let (tx, rx) = mpsc::channel::<LoopCommand>();
        let latest = Mutex::new(None);
        let mut session = AimSession::new(VantageConfig::default());

        tx.send(LoopCommand::Shutdown).unwrap();

        let ticks = run_game_loop(&mut session, rx, &latest, Duration::ZERO);
        assert_eq!(ticks, 0);
        assert!(latest.lock().unwrap().is_none());
    }

    #[test]
    fn test_spawned_loop_publishes_snapshots() {
        let latest = Arc::new(Mutex::new(None));
        let (tx, handle) = spawn_game_loop(VantageConfig::default(), latest.clone()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while latest.lock().unwrap().is_none() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        tx.send(LoopCommand::Shutdown).unwrap();
        handle.join().unwrap();

        let snapshot = latest.lock().unwrap().clone().unwrap();
        assert!(snapshot.tick >= 1);
    }

    #[test]
    fn test_snapshot_serialization_under_3ms() {
        let mut session = AimSession::new(VantageConfig::default());
        session.queue_command(SessionCommand::Populate { count: 30 });
        for _ in 0..20 {
            session.tick();
        }

        let snapshot = session.tick();
        let start = Instant::now();
        let json = serde_json::to_string(&snapshot).unwrap();
        let elapsed = start.elapsed();

        assert!(
            elapsed < Duration::from_millis(3),
            "Snapshot serialization took {:?}, should be <3ms",
            elapsed
        );
        assert!(!json.is_empty());
    }

    #[test]
    fn test_tick_duration_constant() {
        // 20Hz = 50ms per tick
        assert_eq!(TICK_DURATION, Duration::from_millis(50));
    }
}
