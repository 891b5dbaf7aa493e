use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::jwt::verify_token;
use crate::error::{AppError, AppResult};
use crate::services::assistant::AssistantError;
use crate::AppState;

/// Session context of the signed-in user, inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn authenticate(headers: &HeaderMap, secret: &str) -> AppResult<AuthUser> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    let data = verify_token(token, secret)?;
    Ok(AuthUser {
        id: data.claims.sub,
        email: data.claims.email.filter(|e| !e.is_empty()),
    })
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = authenticate(req.headers(), &state.config.jwt_secret)?;
    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}

/// Same check as [`require_auth`], answering in the assistant's error shape.
pub async fn require_auth_assistant(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AssistantError> {
    let auth_user =
        authenticate(req.headers(), &state.config.jwt_secret).map_err(|_| AssistantError::Auth)?;
    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}
