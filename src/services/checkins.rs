use chrono::{Duration, NaiveDate};
use uuid::Uuid;
use validator::Validate;

use crate::dto::SaveCheckInRequest;
use crate::error::{AppError, AppResult};
use crate::models::checkin::{CheckIn, CheckInMetrics};
use crate::store::GardenStore;

/// How far ahead of the server's date a client may stamp a check-in.
const MAX_DAYS_AHEAD: i64 = 1;
const DEFAULT_HISTORY_DAYS: i64 = 30;

impl CheckInMetrics {
    /// Validates a raw request into writable metrics.
    pub fn from_request(req: &SaveCheckInRequest) -> AppResult<Self> {
        req.validate()?;

        let weather = req
            .weather
            .ok_or_else(|| AppError::Validation("Pick a weather for today".into()))?;
        let required = |value: Option<i32>, name: &str| {
            value.ok_or_else(|| AppError::Validation(format!("{name} is required")))
        };

        Ok(Self {
            energy: required(req.energy, "energy")?,
            mental_pressure: required(req.mental_pressure, "mental_pressure")?,
            personal_concerns: required(req.personal_concerns, "personal_concerns")?,
            achievements: required(req.achievements, "achievements")?,
            exceptional_day: req.exceptional_day.unwrap_or(0),
            weather,
        })
    }
}

/// Resolves the calendar date a check-in belongs to.
pub fn resolve_date(requested: Option<NaiveDate>, today: NaiveDate) -> AppResult<NaiveDate> {
    let date = requested.unwrap_or(today);
    if date > today + Duration::days(MAX_DAYS_AHEAD) {
        return Err(AppError::Validation(
            "checkin_date cannot be in the future".into(),
        ));
    }
    Ok(date)
}

/// Records the user's check-in for `date`: updates the day's row when it
/// exists, inserts it otherwise. Validation runs before any store call.
pub async fn save_check_in(
    store: &dyn GardenStore,
    user_id: Uuid,
    date: NaiveDate,
    req: &SaveCheckInRequest,
) -> AppResult<CheckIn> {
    let metrics = CheckInMetrics::from_request(req)?;

    let saved = match store.find_check_in(user_id, date).await? {
        Some(existing) => store.update_check_in(existing.id, &metrics).await?,
        None => store.insert_check_in(user_id, date, &metrics).await?,
    };

    tracing::debug!(
        user_id = %user_id,
        date = %date,
        weather = saved.weather.as_str(),
        "Check-in saved"
    );
    Ok(saved)
}

pub async fn today(
    store: &dyn GardenStore,
    user_id: Uuid,
    today: NaiveDate,
) -> AppResult<Option<CheckIn>> {
    Ok(store.find_check_in(user_id, today).await?)
}

pub async fn history(
    store: &dyn GardenStore,
    user_id: Uuid,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> AppResult<Vec<CheckIn>> {
    let end = end.unwrap_or(today);
    let start = start.unwrap_or_else(|| end - Duration::days(DEFAULT_HISTORY_DAYS));
    if start > end {
        return Err(AppError::Validation(
            "start_date must not be after end_date".into(),
        ));
    }
    Ok(store.list_check_ins(user_id, start, end).await?)
}
