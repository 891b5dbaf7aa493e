use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::{GardenStore, StoreResult};
use crate::models::checkin::{CheckIn, CheckInMetrics};
use crate::models::recognition::{
    NewRecognition, Recognition, RecognitionCategory, RecognitionListing,
};
use crate::models::team::{AggregateSource, TeamDailyAggregate, Teammate};
use crate::models::user::UserProfile;
use crate::models::weather::{Weather, WeatherEmotion};

const LISTING_COLUMNS: &str = r#"
    r.id, r.sender_id, s.display_name AS sender_name,
    r.receiver_id, v.display_name AS receiver_name,
    r.message, r.category_id, c.name AS category_name, c.emoji AS category_emoji,
    r.recognition_date, r.is_read, r.created_at
"#;

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GardenStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }

    async fn profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT user_id, display_name, role, created_at FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    async fn teammates(&self, user_id: Uuid) -> StoreResult<Vec<Teammate>> {
        let rows = sqlx::query_as::<_, Teammate>(
            r#"
            WITH leaders AS (
                SELECT leader_id FROM team_members WHERE member_id = $1
                UNION
                SELECT $1::uuid
            )
            SELECT DISTINCT p.user_id, p.display_name
            FROM user_profiles p
            WHERE p.user_id <> $1
              AND (
                p.user_id IN (SELECT member_id FROM team_members WHERE leader_id IN (SELECT leader_id FROM leaders))
                OR p.user_id IN (SELECT leader_id FROM team_members WHERE member_id = $1)
              )
            ORDER BY p.display_name NULLS LAST
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_check_in(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<CheckIn>> {
        let row = sqlx::query_as::<_, CheckIn>(
            "SELECT * FROM garden_checkins WHERE user_id = $1 AND checkin_date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert_check_in(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        metrics: &CheckInMetrics,
    ) -> StoreResult<CheckIn> {
        let row = sqlx::query_as::<_, CheckIn>(
            r#"
            INSERT INTO garden_checkins (
                id, user_id, checkin_date, energy, mental_pressure,
                personal_concerns, achievements, exceptional_day, weather
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, checkin_date) DO UPDATE SET
                energy = EXCLUDED.energy,
                mental_pressure = EXCLUDED.mental_pressure,
                personal_concerns = EXCLUDED.personal_concerns,
                achievements = EXCLUDED.achievements,
                exceptional_day = EXCLUDED.exceptional_day,
                weather = EXCLUDED.weather,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(date)
        .bind(metrics.energy)
        .bind(metrics.mental_pressure)
        .bind(metrics.personal_concerns)
        .bind(metrics.achievements)
        .bind(metrics.exceptional_day)
        .bind(metrics.weather)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_check_in(&self, id: Uuid, metrics: &CheckInMetrics) -> StoreResult<CheckIn> {
        let row = sqlx::query_as::<_, CheckIn>(
            r#"
            UPDATE garden_checkins SET
                energy = $2,
                mental_pressure = $3,
                personal_concerns = $4,
                achievements = $5,
                exceptional_day = $6,
                weather = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(metrics.energy)
        .bind(metrics.mental_pressure)
        .bind(metrics.personal_concerns)
        .bind(metrics.achievements)
        .bind(metrics.exceptional_day)
        .bind(metrics.weather)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_check_ins(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<CheckIn>> {
        let rows = sqlx::query_as::<_, CheckIn>(
            r#"
            SELECT * FROM garden_checkins
            WHERE user_id = $1 AND checkin_date BETWEEN $2 AND $3
            ORDER BY checkin_date DESC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn weather_emotions(&self, user_id: Uuid) -> StoreResult<Vec<WeatherEmotion>> {
        let rows = sqlx::query_as::<_, WeatherEmotion>(
            r#"
            SELECT user_id, weather, emotion FROM weather_emotions
            WHERE user_id = $1
            ORDER BY weather, position
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn replace_weather_emotions(
        &self,
        user_id: Uuid,
        rows: &[(Weather, String)],
    ) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM weather_emotions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for (position, (weather, emotion)) in rows.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO weather_emotions (user_id, weather, emotion, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(user_id)
            .bind(weather)
            .bind(emotion)
            .bind(position as i16)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn team_aggregates(
        &self,
        leader_id: Uuid,
        source: AggregateSource,
        limit: i64,
    ) -> StoreResult<Vec<TeamDailyAggregate>> {
        let rows = match source {
            AggregateSource::Live => {
                sqlx::query_as::<_, TeamDailyAggregate>(
                    r#"
                    SELECT date, role, member_count, avg_energy, avg_mental_pressure,
                           avg_personal_concerns, avg_achievements, avg_exceptional_day,
                           most_common_weather
                    FROM team_emotional_data
                    WHERE leader_id = $1
                    ORDER BY date DESC
                    LIMIT $2
                    "#,
                )
                .bind(leader_id)
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
            AggregateSource::Demo => {
                sqlx::query_as::<_, TeamDailyAggregate>(
                    "SELECT * FROM get_team_emotional_demo() ORDER BY date DESC LIMIT $1",
                )
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
        };
        Ok(rows)
    }

    async fn recognition_categories(&self) -> StoreResult<Vec<RecognitionCategory>> {
        let rows = sqlx::query_as::<_, RecognitionCategory>(
            "SELECT id, name, emoji FROM recognition_categories ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert_recognition(&self, new: &NewRecognition) -> StoreResult<Recognition> {
        let row = sqlx::query_as::<_, Recognition>(
            r#"
            INSERT INTO emotional_recognitions (
                id, sender_id, receiver_id, message, category_id, recognition_date
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.sender_id)
        .bind(new.receiver_id)
        .bind(&new.message)
        .bind(new.category_id)
        .bind(new.recognition_date)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn mark_recognition_read(&self, id: Uuid, receiver_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE emotional_recognitions SET is_read = true WHERE id = $1 AND receiver_id = $2",
        )
        .bind(id)
        .bind(receiver_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn received_recognitions(
        &self,
        receiver_id: Uuid,
    ) -> StoreResult<Vec<RecognitionListing>> {
        let sql = format!(
            r#"
            SELECT {LISTING_COLUMNS}
            FROM emotional_recognitions r
            LEFT JOIN user_profiles s ON s.user_id = r.sender_id
            LEFT JOIN user_profiles v ON v.user_id = r.receiver_id
            LEFT JOIN recognition_categories c ON c.id = r.category_id
            WHERE r.receiver_id = $1
            ORDER BY r.created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, RecognitionListing>(&sql)
            .bind(receiver_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn sent_recognitions(&self, sender_id: Uuid) -> StoreResult<Vec<RecognitionListing>> {
        let sql = format!(
            r#"
            SELECT {LISTING_COLUMNS}
            FROM emotional_recognitions r
            LEFT JOIN user_profiles s ON s.user_id = r.sender_id
            LEFT JOIN user_profiles v ON v.user_id = r.receiver_id
            LEFT JOIN recognition_categories c ON c.id = r.category_id
            WHERE r.sender_id = $1
            ORDER BY r.created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, RecognitionListing>(&sql)
            .bind(sender_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn unread_recognitions(&self, receiver_id: Uuid) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM emotional_recognitions WHERE receiver_id = $1 AND is_read = false",
        )
        .bind(receiver_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }
}
