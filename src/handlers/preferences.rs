use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::dto::{
    PreferencesResponse, ReplacePreferencesRequest, ToggleEmotionRequest, ToggleEmotionResponse,
};
use crate::error::AppResult;
use crate::services::preferences;
use crate::AppState;

pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<PreferencesResponse>> {
    let prefs = preferences::get_preferences(state.store.as_ref(), auth_user.id).await?;
    Ok(Json(prefs))
}

pub async fn replace_preferences(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<ReplacePreferencesRequest>,
) -> AppResult<Json<PreferencesResponse>> {
    let prefs =
        preferences::replace_preferences(state.store.as_ref(), auth_user.id, &req.emotions)
            .await?;
    Ok(Json(prefs))
}

pub async fn toggle_emotion(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<ToggleEmotionRequest>,
) -> AppResult<Json<ToggleEmotionResponse>> {
    let toggled = preferences::toggle_preference(
        state.store.as_ref(),
        auth_user.id,
        req.weather,
        &req.emotion,
    )
    .await?;
    Ok(Json(toggled))
}
