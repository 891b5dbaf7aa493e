pub mod checkin;
pub mod recognition;
pub mod team;
pub mod user;
pub mod weather;
