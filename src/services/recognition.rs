use chrono::NaiveDate;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{RecognitionResponse, SendRecognitionRequest};
use crate::error::{AppError, AppResult};
use crate::models::recognition::{NewRecognition, Recognition, RecognitionCategory, RecognitionListing};
use crate::store::{GardenStore, StoreError};

/// Shown when a profile has no display name.
pub const UNKNOWN_DISPLAY_NAME: &str = "Teammate";

#[derive(Debug, Clone)]
pub enum SendOutcome {
    Sent(Recognition),
    /// The sender already recognised this receiver today.
    LimitReached,
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent(_))
    }
}

/// Sends a recognition dated `today`. The daily (sender, receiver) limit is
/// enforced by the store; hitting it is an expected outcome, not a failure.
pub async fn send(
    store: &dyn GardenStore,
    sender_id: Uuid,
    req: &SendRecognitionRequest,
    today: NaiveDate,
) -> AppResult<SendOutcome> {
    req.validate()?;

    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".into()));
    }
    if req.receiver_id == sender_id {
        return Err(AppError::Validation("You cannot recognise yourself".into()));
    }
    let categories = store.recognition_categories().await?;
    if !categories.iter().any(|c| c.id == req.category_id) {
        return Err(AppError::Validation("Unknown recognition category".into()));
    }

    let new = NewRecognition {
        sender_id,
        receiver_id: req.receiver_id,
        message: message.to_string(),
        category_id: req.category_id,
        recognition_date: today,
    };

    match store.insert_recognition(&new).await {
        Ok(recognition) => {
            tracing::info!(
                sender_id = %sender_id,
                receiver_id = %req.receiver_id,
                recognition_id = %recognition.id,
                "Recognition sent"
            );
            Ok(SendOutcome::Sent(recognition))
        }
        Err(StoreError::UniqueViolation(_)) => {
            tracing::debug!(
                sender_id = %sender_id,
                receiver_id = %req.receiver_id,
                "Daily recognition limit reached"
            );
            Ok(SendOutcome::LimitReached)
        }
        Err(e) => Err(e.into()),
    }
}

/// Flags the recognition as read when `receiver_id` is its receiver.
/// Returns false, changing nothing, for anyone else or an unknown id.
pub async fn mark_read(
    store: &dyn GardenStore,
    recognition_id: Uuid,
    receiver_id: Uuid,
) -> AppResult<bool> {
    let updated = store
        .mark_recognition_read(recognition_id, receiver_id)
        .await?;
    if !updated {
        tracing::debug!(
            recognition_id = %recognition_id,
            caller = %receiver_id,
            "Mark-read ignored: not the receiver"
        );
    }
    Ok(updated)
}

pub async fn list_received(
    store: &dyn GardenStore,
    receiver_id: Uuid,
) -> AppResult<Vec<RecognitionResponse>> {
    let rows = store.received_recognitions(receiver_id).await?;
    Ok(rows.into_iter().map(to_response).collect())
}

pub async fn list_sent(
    store: &dyn GardenStore,
    sender_id: Uuid,
) -> AppResult<Vec<RecognitionResponse>> {
    let rows = store.sent_recognitions(sender_id).await?;
    Ok(rows.into_iter().map(to_response).collect())
}

pub async fn unread_count(store: &dyn GardenStore, receiver_id: Uuid) -> AppResult<i64> {
    Ok(store.unread_recognitions(receiver_id).await?)
}

pub async fn categories(store: &dyn GardenStore) -> AppResult<Vec<RecognitionCategory>> {
    Ok(store.recognition_categories().await?)
}

pub fn display_name(name: Option<String>) -> String {
    name.filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string())
}

fn to_response(row: RecognitionListing) -> RecognitionResponse {
    let category = match (row.category_name, row.category_emoji) {
        (Some(name), Some(emoji)) => Some(RecognitionCategory {
            id: row.category_id,
            name,
            emoji,
        }),
        _ => None,
    };
    RecognitionResponse {
        id: row.id,
        sender_id: row.sender_id,
        sender_name: display_name(row.sender_name),
        receiver_id: row.receiver_id,
        receiver_name: display_name(row.receiver_name),
        message: row.message,
        category,
        recognition_date: row.recognition_date,
        is_read: row.is_read,
        created_at: row.created_at,
    }
}
