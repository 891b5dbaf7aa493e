use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::{
    MarkReadResponse, RecognitionResponse, SendRecognitionRequest, SendRecognitionResponse,
    UnreadCountResponse,
};
use crate::error::AppResult;
use crate::handlers::ws::{self, GardenEvent};
use crate::models::recognition::RecognitionCategory;
use crate::services::recognition::{self, SendOutcome};
use crate::AppState;

pub async fn send_recognition(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<SendRecognitionRequest>,
) -> AppResult<(StatusCode, Json<SendRecognitionResponse>)> {
    let today = Utc::now().date_naive();
    let outcome = recognition::send(state.store.as_ref(), auth_user.id, &req, today).await?;

    let status = if outcome.is_sent() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let body = match outcome {
        SendOutcome::Sent(rec) => {
            ws::publish(&state, &GardenEvent::recognition_received(&rec));
            SendRecognitionResponse {
                sent: true,
                reason: None,
                message: None,
                recognition: Some(rec),
            }
        }
        SendOutcome::LimitReached => SendRecognitionResponse {
            sent: false,
            reason: Some("limit_reached"),
            message: Some("You already recognised this teammate today".into()),
            recognition: None,
        },
    };
    Ok((status, Json(body)))
}

pub async fn received(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<RecognitionResponse>>> {
    let rows = recognition::list_received(state.store.as_ref(), auth_user.id).await?;
    Ok(Json(rows))
}

pub async fn sent(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<RecognitionResponse>>> {
    let rows = recognition::list_sent(state.store.as_ref(), auth_user.id).await?;
    Ok(Json(rows))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UnreadCountResponse>> {
    let unread = recognition::unread_count(state.store.as_ref(), auth_user.id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(recognition_id): Path<Uuid>,
) -> AppResult<Json<MarkReadResponse>> {
    let updated = recognition::mark_read(state.store.as_ref(), recognition_id, auth_user.id).await?;
    Ok(Json(MarkReadResponse { updated }))
}

pub async fn categories(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<RecognitionCategory>>> {
    let categories = recognition::categories(state.store.as_ref()).await?;
    Ok(Json(categories))
}
