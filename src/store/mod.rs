//! Persistence boundary.
//!
//! Every table, view and RPC the service touches goes through [`GardenStore`].
//! Two backends implement it: [`postgres::PgStore`] for deployments and
//! [`memory::MemoryStore`] for local runs and tests. Uniqueness rules (one
//! check-in per user per day, one recognition per sender/receiver per day)
//! live in the backend, never in the callers.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::checkin::{CheckIn, CheckInMetrics};
use crate::models::recognition::{
    NewRecognition, Recognition, RecognitionCategory, RecognitionListing,
};
use crate::models::team::{AggregateSource, TeamDailyAggregate, Teammate};
use crate::models::user::UserProfile;
use crate::models::weather::{Weather, WeatherEmotion};

const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("store unreachable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION) =>
            {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                StoreError::UniqueViolation(constraint)
            }
            sqlx::Error::Io(ref e) => StoreError::Unavailable(e.to_string()),
            sqlx::Error::PoolTimedOut => StoreError::Unavailable("connection pool timed out".into()),
            sqlx::Error::PoolClosed => StoreError::Unavailable("connection pool closed".into()),
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait GardenStore: Send + Sync {
    /// Cheap round-trip used by `/readyz`.
    async fn ping(&self) -> StoreResult<()>;

    async fn profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>>;

    /// People sharing a team with `user_id` (their leader and fellow members,
    /// or a leader's members), excluding the user.
    async fn teammates(&self, user_id: Uuid) -> StoreResult<Vec<Teammate>>;

    async fn find_check_in(&self, user_id: Uuid, date: NaiveDate)
        -> StoreResult<Option<CheckIn>>;

    /// Inserts the day's row. A concurrent insert for the same (user, date)
    /// resolves last-write-wins instead of failing.
    async fn insert_check_in(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        metrics: &CheckInMetrics,
    ) -> StoreResult<CheckIn>;

    async fn update_check_in(&self, id: Uuid, metrics: &CheckInMetrics) -> StoreResult<CheckIn>;

    /// Rows with `start <= date <= end`, newest first.
    async fn list_check_ins(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<CheckIn>>;

    /// Grouped by weather; within a weather, in the order they were written.
    async fn weather_emotions(&self, user_id: Uuid) -> StoreResult<Vec<WeatherEmotion>>;

    /// Drops every stored tag for the user, then writes `rows`.
    async fn replace_weather_emotions(
        &self,
        user_id: Uuid,
        rows: &[(Weather, String)],
    ) -> StoreResult<()>;

    /// Up to `limit` daily aggregates for the leader's team, newest first.
    async fn team_aggregates(
        &self,
        leader_id: Uuid,
        source: AggregateSource,
        limit: i64,
    ) -> StoreResult<Vec<TeamDailyAggregate>>;

    async fn recognition_categories(&self) -> StoreResult<Vec<RecognitionCategory>>;

    /// Fails with [`StoreError::UniqueViolation`] when the sender already
    /// recognised the receiver on that date.
    async fn insert_recognition(&self, new: &NewRecognition) -> StoreResult<Recognition>;

    /// Returns whether a row owned by `receiver_id` was found and flagged.
    async fn mark_recognition_read(&self, id: Uuid, receiver_id: Uuid) -> StoreResult<bool>;

    async fn received_recognitions(&self, receiver_id: Uuid)
        -> StoreResult<Vec<RecognitionListing>>;

    async fn sent_recognitions(&self, sender_id: Uuid) -> StoreResult<Vec<RecognitionListing>>;

    async fn unread_recognitions(&self, receiver_id: Uuid) -> StoreResult<i64>;
}
