pub mod assistant;
pub mod checkins;
pub mod metrics;
pub mod preferences;
pub mod recognition;
pub mod team;
