pub mod assistant;
pub mod checkins;
pub mod health;
pub mod me;
pub mod preferences;
pub mod recognitions;
pub mod team;
pub mod ws;
