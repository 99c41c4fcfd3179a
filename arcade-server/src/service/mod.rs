pub mod credits;
pub mod identity;
pub mod leaderboard;
pub mod progression;
pub mod save;
