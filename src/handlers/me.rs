use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::dto::ProfileResponse;
use crate::error::AppResult;
use crate::services::{preferences, recognition};
use crate::AppState;

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<ProfileResponse>> {
    let store = state.store.as_ref();
    let profile = store.profile(auth_user.id).await?;
    let prefs = preferences::get_preferences(store, auth_user.id).await?;

    let (display_name, role) = match profile {
        Some(p) => (p.display_name, p.role),
        None => (None, Default::default()),
    };

    Ok(Json(ProfileResponse {
        user_id: auth_user.id,
        email: auth_user.email,
        display_name: recognition::display_name(display_name),
        role,
        onboarding_complete: prefs.onboarding_complete,
    }))
}
