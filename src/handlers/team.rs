use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::auth::middleware::AuthUser;
use crate::dto::{TeamDashboardQuery, TeammateResponse};
use crate::error::AppResult;
use crate::models::team::AggregateSource;
use crate::services::metrics::TeamTrends;
use crate::services::team;
use crate::AppState;

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<TeamDashboardQuery>,
) -> AppResult<Json<TeamTrends>> {
    let store = state.store.as_ref();
    let source = if query.demo.unwrap_or(false) {
        AggregateSource::Demo
    } else {
        team::require_leader(store, auth_user.id).await?;
        AggregateSource::Live
    };
    let trends = team::dashboard(store, auth_user.id, source, team::clamp_days(query.days)).await?;
    Ok(Json(trends))
}

pub async fn members(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<TeammateResponse>>> {
    let mates = team::teammates(state.store.as_ref(), auth_user.id).await?;
    Ok(Json(mates))
}
