//! # Emotional Garden: Request/Response DTOs
//!
//! API contract types shared by the handlers and services.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body
//! - `*Query`    → deserialized from query params
//! - `*Response` → serialized to client JSON
//! - Field rules are expressed via `validator` derive macros; rules that
//!   depend on trimming or on stored data live in the services

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::recognition::{Recognition, RecognitionCategory};
use crate::models::user::UserRole;
use crate::models::weather::Weather;
use crate::services::assistant::TeamState;

// ============================================================================
// Profile
// ============================================================================

/// GET /api/me
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub display_name: String,
    pub role: UserRole,
    pub onboarding_complete: bool,
}

// ============================================================================
// Check-ins
// ============================================================================

/// POST /api/checkins
///
/// Every metric is required; `Option` only lets a missing field surface as a
/// validation message instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SaveCheckInRequest {
    /// Default: today (UTC). At most one day ahead of server-now.
    pub checkin_date: Option<NaiveDate>,

    #[validate(range(min = 1, max = 10, message = "energy must be between 1 and 10"))]
    pub energy: Option<i32>,

    #[validate(range(min = 1, max = 10, message = "mental_pressure must be between 1 and 10"))]
    pub mental_pressure: Option<i32>,

    #[validate(range(min = 1, max = 10, message = "personal_concerns must be between 1 and 10"))]
    pub personal_concerns: Option<i32>,

    #[validate(range(min = 1, max = 10, message = "achievements must be between 1 and 10"))]
    pub achievements: Option<i32>,

    /// 0 or 1. Default: 0
    #[validate(range(min = 0, max = 1, message = "exceptional_day must be 0 or 1"))]
    pub exceptional_day: Option<i32>,

    pub weather: Option<Weather>,
}

/// GET /api/checkins query params
#[derive(Debug, Deserialize)]
pub struct CheckInHistoryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// ============================================================================
// Weather emotions (onboarding)
// ============================================================================

/// PUT /api/weather-emotions
#[derive(Debug, Deserialize)]
pub struct ReplacePreferencesRequest {
    pub emotions: BTreeMap<Weather, Vec<String>>,
}

/// GET/PUT /api/weather-emotions
#[derive(Debug, Serialize, PartialEq)]
pub struct PreferencesResponse {
    pub emotions: BTreeMap<Weather, Vec<String>>,
    pub onboarding_complete: bool,
}

/// POST /api/weather-emotions/toggle
#[derive(Debug, Deserialize)]
pub struct ToggleEmotionRequest {
    pub weather: Weather,
    pub emotion: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleEmotionResponse {
    /// Whether the tag is selected after the toggle
    pub selected: bool,
    #[serde(flatten)]
    pub preferences: PreferencesResponse,
}

// ============================================================================
// Team
// ============================================================================

/// GET /api/team/dashboard query params
#[derive(Debug, Deserialize)]
pub struct TeamDashboardQuery {
    /// Read the demo RPC instead of the live view. Default: false
    pub demo: Option<bool>,
    /// Days of history. Default: 30, clamped to 8..=90
    pub days: Option<i64>,
}

/// GET /api/team/members
#[derive(Debug, Serialize)]
pub struct TeammateResponse {
    pub user_id: Uuid,
    pub display_name: String,
}

// ============================================================================
// Recognitions
// ============================================================================

/// POST /api/recognitions
#[derive(Debug, Deserialize, Validate)]
pub struct SendRecognitionRequest {
    pub receiver_id: Uuid,

    #[validate(length(min = 1, max = 500, message = "Message must be 1-500 characters"))]
    pub message: String,

    pub category_id: i32,
}

/// Response for POST /api/recognitions
#[derive(Debug, Serialize)]
pub struct SendRecognitionResponse {
    pub sent: bool,

    /// "limit_reached" when the daily recognition for this receiver was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognition: Option<Recognition>,
}

/// Recognition as listed to sender or receiver
#[derive(Debug, Serialize)]
pub struct RecognitionResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub receiver_id: Uuid,
    pub receiver_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<RecognitionCategory>,
    pub recognition_date: NaiveDate,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// POST /api/recognitions/{id}/read
#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: bool,
}

/// GET /api/recognitions/unread-count
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

// ============================================================================
// Assistant
// ============================================================================

/// POST /api/assistant/ask
#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    /// Must match the caller's stored role; free text is rejected at parse time
    pub user_role: Option<UserRole>,

    /// Derived from the leader's latest team aggregate when absent
    pub team_state: Option<TeamState>,

    #[validate(length(min = 1, max = 1000, message = "Question must be 1-1000 characters"))]
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}
