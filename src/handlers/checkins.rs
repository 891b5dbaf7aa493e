use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;

use crate::auth::middleware::AuthUser;
use crate::dto::{CheckInHistoryQuery, SaveCheckInRequest};
use crate::error::AppResult;
use crate::models::checkin::CheckIn;
use crate::services::checkins;
use crate::AppState;

pub async fn save_check_in(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<SaveCheckInRequest>,
) -> AppResult<(StatusCode, Json<CheckIn>)> {
    let today = Utc::now().date_naive();
    let date = checkins::resolve_date(req.checkin_date, today)?;
    let saved = checkins::save_check_in(state.store.as_ref(), auth_user.id, date, &req).await?;
    Ok((StatusCode::OK, Json(saved)))
}

pub async fn today(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Option<CheckIn>>> {
    let today = Utc::now().date_naive();
    let row = checkins::today(state.store.as_ref(), auth_user.id, today).await?;
    Ok(Json(row))
}

pub async fn list_check_ins(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<CheckInHistoryQuery>,
) -> AppResult<Json<Vec<CheckIn>>> {
    let rows = checkins::history(
        state.store.as_ref(),
        auth_user.id,
        query.start_date,
        query.end_date,
        Utc::now().date_naive(),
    )
    .await?;
    Ok(Json(rows))
}
