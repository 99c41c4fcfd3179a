pub mod auth;
pub mod credits;
pub mod health;
pub mod leaderboard;
pub mod progression;
pub mod save;
