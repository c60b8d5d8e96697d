mod config;
mod engine;
mod session;
mod types;

pub use config::GameConfig;
pub use engine::{spawn_food, GameEngine};
pub use session::GameSession;
pub use types::{Direction, Food, GameState, GameStatus, Position};
