use serde::Serialize;
use std::collections::VecDeque;

/// A cell on the toroidal grid. Coordinates always satisfy `0 <= x,y < grid_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn is_opposite(self, other: Direction) -> bool {
        matches!(
            (self, other),
            (Direction::Up, Direction::Down)
                | (Direction::Down, Direction::Up)
                | (Direction::Left, Direction::Right)
                | (Direction::Right, Direction::Left)
        )
    }
}

/// Food on the board. Special food carries an absolute expiry timestamp in
/// epoch milliseconds; regular food never expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Food {
    Regular {
        position: Position,
    },
    Special {
        position: Position,
        #[serde(rename = "expiresAt")]
        expires_at: i64,
    },
}

impl Food {
    pub fn position(&self) -> Position {
        match self {
            Food::Regular { position } | Food::Special { position, .. } => *position,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    Running,
    Paused,
    GameOver,
}

/// Full simulation state for one game. Mutated only by the engine, once per
/// tick; snapshots handed out by the session are clones.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameState {
    /// Head-first body segments. All positions distinct while alive; length >= 1.
    pub snake: VecDeque<Position>,
    pub food: Food,
    pub direction: Direction,
    /// Direction accepted since the last tick, applied at the start of the next one.
    #[serde(skip)]
    pub pending_direction: Option<Direction>,
    pub score: i64,
    pub status: GameStatus,
}

impl GameState {
    pub fn head(&self) -> Option<Position> {
        self.snake.front().copied()
    }

    pub fn is_game_over(&self) -> bool {
        self.status == GameStatus::GameOver
    }
}
