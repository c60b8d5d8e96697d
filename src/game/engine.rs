use super::config::GameConfig;
use super::types::{Direction, Food, GameState, GameStatus, Position};
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;

const MAX_SPAWN_ATTEMPTS: usize = 64;

/// Deterministic per-tick snake simulation. The engine owns its `GameState`
/// and is the only thing that mutates it; gameplay inputs never fail, they
/// are either applied or silently dropped.
#[derive(Debug)]
pub struct GameEngine {
    config: GameConfig,
    state: GameState,
}

impl GameEngine {
    /// `now` is the current time in epoch milliseconds and anchors the expiry
    /// of any special food spawned at start.
    pub fn new(config: GameConfig, now: i64) -> Self {
        Self::new_with_rng(&mut rand::thread_rng(), config, now)
    }

    pub fn new_with_rng(rng: &mut impl Rng, config: GameConfig, now: i64) -> Self {
        Self {
            state: initial_state(rng, &config, now),
            config,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_state(config: GameConfig, state: GameState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Advance the simulation by one step. Does nothing unless Running.
    pub fn tick(&mut self, now: i64) {
        self.tick_with_rng(&mut rand::thread_rng(), now);
    }

    pub fn tick_with_rng(&mut self, rng: &mut impl Rng, now: i64) {
        if self.state.status != GameStatus::Running {
            return;
        }
        if let Some(direction) = self.state.pending_direction.take() {
            self.state.direction = direction;
        }
        let Some(head) = self.state.head() else { return };
        let next = step(head, self.state.direction, self.config.grid_size);

        // The head lands on an occupied cell: the game ends and the snake is
        // left exactly as it was before the tick. Moving into the tail cell
        // counts; the tail is not vacated first.
        if self.state.snake.contains(&next) {
            self.state.status = GameStatus::GameOver;
            return;
        }

        self.state.snake.push_front(next);
        if next == self.state.food.position() {
            self.state.score += match self.state.food {
                Food::Regular { .. } => self.config.regular_food_points,
                Food::Special { .. } => self.config.special_food_points,
            };
            match spawn_food(rng, &self.state.snake, &self.config, now) {
                Some(food) => self.state.food = food,
                // The snake covers every cell; nothing left to eat.
                None => self.state.status = GameStatus::GameOver,
            }
        } else {
            self.state.snake.pop_back();
        }
    }

    /// Request a direction change. Rejected (silently) when it would reverse
    /// the snake through its own neck, or when the game is not running.
    /// Accepted requests take effect on the next tick; a later accepted
    /// request before that tick replaces the earlier one.
    pub fn set_direction(&mut self, direction: Direction) {
        if self.state.status != GameStatus::Running {
            return;
        }
        if direction.is_opposite(self.state.direction) {
            return;
        }
        self.state.pending_direction = Some(direction);
    }

    pub fn pause(&mut self) {
        if self.state.status == GameStatus::Running {
            self.state.status = GameStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state.status == GameStatus::Paused {
            self.state.status = GameStatus::Running;
        }
    }

    /// Discard the current game and start a fresh one, whatever state the old
    /// one was in.
    pub fn reset(&mut self, now: i64) {
        self.reset_with_rng(&mut rand::thread_rng(), now);
    }

    pub fn reset_with_rng(&mut self, rng: &mut impl Rng, now: i64) {
        self.state = initial_state(rng, &self.config, now);
    }

    /// Replace special food whose expiry has passed. Runs off a timer separate
    /// from the movement tick; a paused or finished game never expires food.
    /// Returns whether the food was replaced.
    pub fn expire_food(&mut self, now: i64) -> bool {
        self.expire_food_with_rng(&mut rand::thread_rng(), now)
    }

    pub fn expire_food_with_rng(&mut self, rng: &mut impl Rng, now: i64) -> bool {
        if self.state.status != GameStatus::Running {
            return false;
        }
        let Food::Special { expires_at, .. } = self.state.food else {
            return false;
        };
        if now < expires_at {
            return false;
        }
        if let Some(food) = spawn_food(rng, &self.state.snake, &self.config, now) {
            self.state.food = food;
        }
        true
    }

    /// Current tick interval: a non-increasing step function of snake length,
    /// floored at `min_tick_ms`.
    pub fn tick_interval(&self) -> Duration {
        let length = self.state.snake.len().max(1);
        let steps = ((length - 1) / self.config.speedup_step) as u64;
        let ms = self
            .config
            .base_tick_ms
            .saturating_sub(steps * self.config.speedup_decrement_ms)
            .max(self.config.min_tick_ms);
        Duration::from_millis(ms)
    }
}

fn initial_state(rng: &mut impl Rng, config: &GameConfig, now: i64) -> GameState {
    let start = Position::new(config.grid_size / 2, config.grid_size / 2);
    let snake: VecDeque<Position> = VecDeque::from([start]);
    let food =
        spawn_food(rng, &snake, config, now).unwrap_or(Food::Regular { position: start });
    GameState {
        snake,
        food,
        direction: Direction::Right,
        pending_direction: None,
        score: 0,
        status: GameStatus::Running,
    }
}

fn wrapping_inc(value: u16, size: u16) -> u16 {
    if value + 1 >= size {
        0
    } else {
        value + 1
    }
}

fn wrapping_dec(value: u16, size: u16) -> u16 {
    if value == 0 {
        size - 1
    } else {
        value - 1
    }
}

fn step(head: Position, direction: Direction, grid_size: u16) -> Position {
    match direction {
        Direction::Up => Position::new(head.x, wrapping_dec(head.y, grid_size)),
        Direction::Down => Position::new(head.x, wrapping_inc(head.y, grid_size)),
        Direction::Left => Position::new(wrapping_dec(head.x, grid_size), head.y),
        Direction::Right => Position::new(wrapping_inc(head.x, grid_size), head.y),
    }
}

/// Pick a uniformly random free cell for new food, rejecting cells occupied by
/// the snake. Falls back to a scan so a free cell is always found when one
/// exists; returns `None` only when the snake covers the whole board.
pub fn spawn_food(
    rng: &mut impl Rng,
    snake: &VecDeque<Position>,
    config: &GameConfig,
    now: i64,
) -> Option<Food> {
    for _ in 0..MAX_SPAWN_ATTEMPTS {
        let position = Position::new(
            rng.gen_range(0..config.grid_size),
            rng.gen_range(0..config.grid_size),
        );
        if !snake.contains(&position) {
            return Some(food_at(rng, position, config, now));
        }
    }
    for y in 0..config.grid_size {
        for x in 0..config.grid_size {
            let position = Position::new(x, y);
            if !snake.contains(&position) {
                return Some(food_at(rng, position, config, now));
            }
        }
    }
    None
}

fn food_at(rng: &mut impl Rng, position: Position, config: &GameConfig, now: i64) -> Food {
    if rng.gen_bool(config.special_food_chance) {
        Food::Special {
            position,
            expires_at: now + config.special_food_ttl_ms,
        }
    } else {
        Food::Regular { position }
    }
}
