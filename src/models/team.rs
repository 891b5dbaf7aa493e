use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::weather::Weather;

/// One pre-aggregated day of a team's check-ins. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TeamDailyAggregate {
    pub date: NaiveDate,
    pub role: Option<String>,
    pub member_count: i64,
    pub avg_energy: f64,
    pub avg_mental_pressure: f64,
    pub avg_personal_concerns: f64,
    pub avg_achievements: f64,
    pub avg_exceptional_day: f64,
    pub most_common_weather: Option<Weather>,
}

/// Where aggregate rows come from: the live view or the demo RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateSource {
    Live,
    Demo,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Teammate {
    pub user_id: Uuid,
    pub display_name: Option<String>,
}
