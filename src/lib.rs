pub mod game;
pub mod http;
pub mod leaderboard;
