use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recognition {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message: String,
    pub category_id: i32,
    pub recognition_date: NaiveDate,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecognitionCategory {
    pub id: i32,
    pub name: String,
    pub emoji: String,
}

#[derive(Debug, Clone)]
pub struct NewRecognition {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message: String,
    pub category_id: i32,
    pub recognition_date: NaiveDate,
}

/// Recognition joined with both display names and its category.
#[derive(Debug, Clone, FromRow)]
pub struct RecognitionListing {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: Option<String>,
    pub receiver_id: Uuid,
    pub receiver_name: Option<String>,
    pub message: String,
    pub category_id: i32,
    pub category_name: Option<String>,
    pub category_emoji: Option<String>,
    pub recognition_date: NaiveDate,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
