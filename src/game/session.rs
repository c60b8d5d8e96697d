use super::config::GameConfig;
use super::engine::GameEngine;
use super::types::{Direction, Food, GameState, GameStatus};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone, Copy)]
enum SessionCommand {
    SetDirection(Direction),
    Pause,
    Resume,
    Reset,
}

/// Handle to a running game driven by its own tokio task. One tick timer and
/// one food-expiry timer are active per session; both fire inside the same
/// task, so no two callbacks ever overlap. Dropping the handle cancels the
/// task; no tick after cancellation mutates state.
#[derive(Debug)]
pub struct GameSession {
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshots: watch::Receiver<GameState>,
}

impl GameSession {
    pub fn spawn(config: GameConfig) -> Self {
        let now = epoch_millis();
        Self::spawn_engine(GameEngine::new(config, now), now)
    }

    fn spawn_engine(engine: GameEngine, epoch: i64) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.state().clone());
        tokio::spawn(run_session(engine, epoch, command_rx, snapshot_tx));
        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    pub fn set_direction(&self, direction: Direction) {
        let _ = self.commands.send(SessionCommand::SetDirection(direction));
    }

    pub fn pause(&self) {
        let _ = self.commands.send(SessionCommand::Pause);
    }

    pub fn resume(&self) {
        let _ = self.commands.send(SessionCommand::Resume);
    }

    pub fn reset(&self) {
        let _ = self.commands.send(SessionCommand::Reset);
    }

    pub fn snapshot(&self) -> GameState {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<GameState> {
        self.snapshots.clone()
    }

    /// Wait for the game to end and return the final score, ready for
    /// submission to the leaderboard.
    pub async fn finished_score(&self) -> i64 {
        let mut snapshots = self.snapshots.clone();
        loop {
            {
                let state = snapshots.borrow();
                if state.is_game_over() {
                    return state.score;
                }
            }
            if snapshots.changed().await.is_err() {
                // Session task is gone; report the last observed score.
                return snapshots.borrow().score;
            }
        }
    }
}

async fn run_session(
    mut engine: GameEngine,
    epoch: i64,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    snapshots: watch::Sender<GameState>,
) {
    let origin = Instant::now();
    let now_ms = |origin: Instant| epoch + origin.elapsed().as_millis() as i64;
    let mut next_tick = origin + engine.tick_interval();

    loop {
        if engine.state().status == GameStatus::Running {
            let expiry = match engine.state().food {
                Food::Special { expires_at, .. } => Some(
                    origin
                        + Duration::from_millis(expires_at.saturating_sub(epoch).max(0) as u64),
                ),
                Food::Regular { .. } => None,
            };
            let expiry_deadline =
                expiry.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    apply_command(&mut engine, command, &mut next_tick, now_ms(origin));
                    let _ = snapshots.send(engine.state().clone());
                }
                _ = sleep_until(next_tick) => {
                    engine.tick(now_ms(origin));
                    // The interval is a function of snake length; recompute
                    // after every state change.
                    next_tick = Instant::now() + engine.tick_interval();
                    let _ = snapshots.send(engine.state().clone());
                }
                _ = sleep_until(expiry_deadline), if expiry.is_some() => {
                    if engine.expire_food(now_ms(origin)) {
                        let _ = snapshots.send(engine.state().clone());
                    }
                }
            }
        } else {
            // Paused or finished: both timers are dead, only commands arrive.
            let Some(command) = commands.recv().await else { break };
            apply_command(&mut engine, command, &mut next_tick, now_ms(origin));
            let _ = snapshots.send(engine.state().clone());
        }
    }
}

fn apply_command(engine: &mut GameEngine, command: SessionCommand, next_tick: &mut Instant, now: i64) {
    match command {
        SessionCommand::SetDirection(direction) => engine.set_direction(direction),
        SessionCommand::Pause => engine.pause(),
        SessionCommand::Resume => {
            engine.resume();
            // Resuming starts a fresh tick timer.
            *next_tick = Instant::now() + engine.tick_interval();
        }
        SessionCommand::Reset => {
            engine.reset(now);
            *next_tick = Instant::now() + engine.tick_interval();
        }
    }
}

fn epoch_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
