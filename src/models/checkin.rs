use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::weather::Weather;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CheckIn {
    pub id: Uuid,
    pub user_id: Uuid,
    pub checkin_date: NaiveDate,
    pub energy: i32,
    pub mental_pressure: i32,
    pub personal_concerns: i32,
    pub achievements: i32,
    pub exceptional_day: i32,
    pub weather: Weather,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully validated set of check-in values, ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInMetrics {
    pub energy: i32,
    pub mental_pressure: i32,
    pub personal_concerns: i32,
    pub achievements: i32,
    pub exceptional_day: i32,
    pub weather: Weather,
}
