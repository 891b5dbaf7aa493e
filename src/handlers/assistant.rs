use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{AskRequest, AskResponse};
use crate::error::{AppError, AppResult};
use crate::services::team;
use crate::AppState;

pub async fn ask(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<AskRequest>,
) -> AppResult<Json<AskResponse>> {
    req.validate()?;
    let question = req.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("Question cannot be empty".into()));
    }

    let store = state.store.as_ref();
    let team_state = match req.team_state {
        Some(s) => s,
        None => team::latest_team_state(store, auth_user.id)
            .await?
            .ok_or_else(|| {
                AppError::Validation("No team data yet; include team_state".into())
            })?,
    };
    // The stored profile is authoritative; a claimed role must agree with it.
    let user_role = store
        .profile(auth_user.id)
        .await?
        .map(|p| p.role)
        .unwrap_or_default();
    if let Some(claimed) = req.user_role {
        if claimed != user_role {
            tracing::warn!(
                user_id = %auth_user.id,
                claimed = claimed.as_str(),
                stored = user_role.as_str(),
                "Assistant role claim rejected"
            );
            return Err(AppError::Validation(
                "user_role does not match your profile".into(),
            ));
        }
    }

    tracing::info!(
        user_id = %auth_user.id,
        climate = team_state.climate_trend.as_str(),
        "Assistant question received"
    );
    let answer = state
        .assistant
        .ask(user_role, &team_state, question)
        .await?;
    Ok(Json(AskResponse { answer }))
}
