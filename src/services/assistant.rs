//! Bridge to the hosted LLM that answers leaders' questions about their team.
//!
//! The prompt carries only aggregate numbers (never individual check-ins).
//! Every failure is classified into an [`AssistantError`] whose kind drives
//! the message and icon the client shows; nothing is retried here.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::models::team::TeamDailyAggregate;
use crate::models::user::UserRole;

const LOW_ENERGY_BELOW: f64 = 4.0;
const HIGH_PRESSURE_ABOVE: f64 = 7.0;
const HIGH_CONCERNS_ABOVE: f64 = 6.0;
const LOW_ACHIEVEMENTS_BELOW: f64 = 3.0;
const POSITIVE_CLIMATE_ABOVE: f64 = 3.0;
const NEGATIVE_CLIMATE_BELOW: f64 = 0.0;
const MAX_ANSWER_TOKENS: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClimateTrend {
    Positive,
    Neutral,
    Negative,
}

impl ClimateTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClimateTrend::Positive => "positive",
            ClimateTrend::Neutral => "neutral",
            ClimateTrend::Negative => "negative",
        }
    }
}

/// `energy - pressure / 2`: above 3 is positive, below 0 negative.
pub fn climate_trend(energy_avg: f64, pressure_avg: f64) -> ClimateTrend {
    let score = energy_avg - pressure_avg / 2.0;
    if score > POSITIVE_CLIMATE_ABOVE {
        ClimateTrend::Positive
    } else if score < NEGATIVE_CLIMATE_BELOW {
        ClimateTrend::Negative
    } else {
        ClimateTrend::Neutral
    }
}

pub fn threshold_alerts(agg: &TeamDailyAggregate) -> Vec<String> {
    let mut alerts = Vec::new();
    if agg.avg_energy < LOW_ENERGY_BELOW {
        alerts.push("low energy".to_string());
    }
    if agg.avg_mental_pressure > HIGH_PRESSURE_ABOVE {
        alerts.push("high mental pressure".to_string());
    }
    if agg.avg_personal_concerns > HIGH_CONCERNS_ABOVE {
        alerts.push("elevated personal concerns".to_string());
    }
    if agg.avg_achievements < LOW_ACHIEVEMENTS_BELOW {
        alerts.push("reduced achievements".to_string());
    }
    alerts
}

/// Team snapshot the assistant reasons about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamState {
    pub energy_avg: f64,
    pub pressure_avg: f64,
    pub climate_trend: ClimateTrend,
    #[serde(default)]
    pub recent_alerts: Vec<String>,
}

impl TeamState {
    pub fn from_aggregate(agg: &TeamDailyAggregate) -> Self {
        Self {
            energy_avg: agg.avg_energy,
            pressure_avg: agg.avg_mental_pressure,
            climate_trend: climate_trend(agg.avg_energy, agg.avg_mental_pressure),
            recent_alerts: threshold_alerts(agg),
        }
    }
}

/// Only the typed role reaches the prompt; callers never pass free text here.
pub fn build_system_prompt(user_role: UserRole, state: &TeamState) -> String {
    let alerts = if state.recent_alerts.is_empty() {
        "none".to_string()
    } else {
        state.recent_alerts.join(", ")
    };
    format!(
        "You are a supportive assistant helping a {} look after their team's \
         emotional wellbeing. Current team state: average energy {:.1}/10, average mental \
         pressure {:.1}/10, overall climate {}. Recent alerts: {alerts}. \
         Answer in at most three short paragraphs with concrete, kind suggestions. \
         Never guess about individual team members; the data is anonymous and aggregated.",
        user_role.as_str(),
        state.energy_avg,
        state.pressure_avg,
        state.climate_trend.as_str(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantErrorKind {
    Connection,
    Auth,
    Quota,
    Configuration,
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("could not reach the assistant: {0}")]
    Connection(String),

    #[error("sign-in required")]
    Auth,

    #[error("assistant quota exceeded")]
    Quota,

    #[error("assistant is not configured: {0}")]
    Configuration(String),

    #[error("assistant upstream returned {status}: {detail}")]
    Upstream { status: u16, detail: String },

    #[error("unexpected assistant failure: {0}")]
    Unknown(String),
}

impl AssistantError {
    pub fn kind(&self) -> AssistantErrorKind {
        match self {
            AssistantError::Connection(_) => AssistantErrorKind::Connection,
            AssistantError::Auth => AssistantErrorKind::Auth,
            AssistantError::Quota => AssistantErrorKind::Quota,
            AssistantError::Configuration(_) => AssistantErrorKind::Configuration,
            AssistantError::Upstream { .. } | AssistantError::Unknown(_) => {
                AssistantErrorKind::Unknown
            }
        }
    }

    /// Wire value of `errorType`.
    pub fn error_type(&self) -> &'static str {
        match self {
            AssistantError::Connection(_) | AssistantError::Upstream { .. } => "openai_api_error",
            AssistantError::Auth => "auth",
            AssistantError::Quota => "quota_exceeded",
            AssistantError::Configuration(_) => "configuration_error",
            AssistantError::Unknown(_) => "unknown_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AssistantError::Auth => StatusCode::UNAUTHORIZED,
            AssistantError::Quota => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            AssistantErrorKind::Connection => {
                "We couldn't reach the assistant. Check your connection and try again."
            }
            AssistantErrorKind::Auth => "Your session has expired. Please sign in again.",
            AssistantErrorKind::Quota => {
                "The assistant is taking a breather. Please try again in a little while."
            }
            AssistantErrorKind::Configuration => {
                "The assistant isn't set up yet. Please contact your administrator."
            }
            AssistantErrorKind::Unknown => "Something went wrong. Please try again.",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self.kind() {
            AssistantErrorKind::Connection => "wifi-off",
            AssistantErrorKind::Auth => "lock",
            AssistantErrorKind::Quota => "hourglass",
            AssistantErrorKind::Configuration => "settings",
            AssistantErrorKind::Unknown => "alert-circle",
        }
    }
}

impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        match self.kind() {
            AssistantErrorKind::Auth | AssistantErrorKind::Quota => {
                tracing::info!(error = %self, "Assistant request refused")
            }
            _ => tracing::error!(error = %self, "Assistant request failed"),
        }
        let body = json!({
            "error": self.user_message(),
            "errorType": self.error_type(),
            "icon": self.icon(),
        });
        (self.status(), Json(body)).into_response()
    }
}

/// OpenAI-compatible chat completions client.
pub struct AssistantClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AssistantClient {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.assistant_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn ask(
        &self,
        user_role: UserRole,
        state: &TeamState,
        question: &str,
    ) -> Result<String, AssistantError> {
        if self.api_key.trim().is_empty() {
            return Err(AssistantError::Configuration("OPENAI_API_KEY is not set".into()));
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "max_tokens": MAX_ANSWER_TOKENS,
                "messages": [
                    { "role": "system", "content": build_system_prompt(user_role, state) },
                    { "role": "user", "content": question },
                ]
            }))
            .send()
            .await
            .map_err(|e| AssistantError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_upstream(status.as_u16(), &body));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Unknown(format!("malformed response: {e}")))?;
        let answer = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AssistantError::Unknown("empty answer".into()))?;

        tracing::debug!(model = %self.model, chars = answer.len(), "Assistant answered");
        Ok(answer.to_string())
    }
}

fn classify_upstream(status: u16, body: &str) -> AssistantError {
    let code = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["code"].as_str().map(str::to_string));

    match status {
        401 | 403 => AssistantError::Configuration(format!("upstream rejected credentials ({status})")),
        429 => AssistantError::Quota,
        _ if code.as_deref() == Some("insufficient_quota") => AssistantError::Quota,
        _ => AssistantError::Upstream {
            status,
            detail: body.chars().take(200).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use axum::{routing::post, Router};
    use chrono::NaiveDate;
    use tokio::net::TcpListener;

    use super::*;

    fn aggregate(energy: f64, pressure: f64, concerns: f64, achievements: f64) -> TeamDailyAggregate {
        TeamDailyAggregate {
            date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            role: Some("team".into()),
            member_count: 5,
            avg_energy: energy,
            avg_mental_pressure: pressure,
            avg_personal_concerns: concerns,
            avg_achievements: achievements,
            avg_exceptional_day: 0.0,
            most_common_weather: None,
        }
    }

    fn state() -> TeamState {
        TeamState::from_aggregate(&aggregate(6.0, 4.0, 3.0, 6.0))
    }

    async fn fake_upstream(status: StatusCode, body: serde_json::Value) -> String {
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: String, api_key: &str) -> AssistantClient {
        let mut config = Config::for_tests();
        config.openai_base_url = base_url;
        config.openai_api_key = api_key.into();
        AssistantClient::from_config(&config).unwrap()
    }

    #[test]
    fn climate_trend_thresholds() {
        assert_eq!(climate_trend(8.0, 2.0), ClimateTrend::Positive);
        // exactly 3 is not above 3
        assert_eq!(climate_trend(5.0, 4.0), ClimateTrend::Neutral);
        assert_eq!(climate_trend(2.0, 4.0), ClimateTrend::Neutral);
        assert_eq!(climate_trend(3.0, 9.0), ClimateTrend::Negative);
    }

    #[test]
    fn threshold_alerts_cover_each_metric() {
        let alerts = threshold_alerts(&aggregate(3.0, 8.0, 7.0, 2.0));
        assert_eq!(
            alerts,
            vec![
                "low energy",
                "high mental pressure",
                "elevated personal concerns",
                "reduced achievements"
            ]
        );
        assert!(threshold_alerts(&aggregate(4.0, 7.0, 6.0, 3.0)).is_empty());
    }

    #[test]
    fn prompt_carries_team_numbers() {
        let mut s = state();
        s.recent_alerts = vec!["low energy".into()];
        let prompt = build_system_prompt(UserRole::Leader, &s);
        assert!(prompt.contains("average energy 6.0/10"));
        assert!(prompt.contains("mental pressure 4.0/10"));
        assert!(prompt.contains("climate positive"));
        assert!(prompt.contains("Recent alerts: low energy."));
        assert!(prompt.starts_with("You are a supportive assistant helping a leader look after"));

        let member = build_system_prompt(UserRole::Member, &state());
        assert!(member.contains("helping a member look after"));
    }

    #[test]
    fn error_kinds_map_to_wire_contract() {
        assert_eq!(AssistantError::Quota.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AssistantError::Quota.error_type(), "quota_exceeded");
        assert_eq!(AssistantError::Auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AssistantError::Auth.error_type(), "auth");
        let config = AssistantError::Configuration("x".into());
        assert_eq!(config.error_type(), "configuration_error");
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AssistantError::Unknown("x".into()).error_type(), "unknown_error");
        assert_eq!(
            AssistantError::Connection("x".into()).kind(),
            AssistantErrorKind::Connection
        );

        let icons: std::collections::HashSet<_> = [
            AssistantError::Connection("x".into()),
            AssistantError::Auth,
            AssistantError::Quota,
            AssistantError::Configuration("x".into()),
            AssistantError::Unknown("x".into()),
        ]
        .iter()
        .map(|e| e.icon())
        .collect();
        assert_eq!(icons.len(), 5);
    }

    #[test]
    fn upstream_statuses_are_classified() {
        assert!(matches!(classify_upstream(401, ""), AssistantError::Configuration(_)));
        assert!(matches!(classify_upstream(429, ""), AssistantError::Quota));
        assert!(matches!(
            classify_upstream(400, r#"{"error":{"code":"insufficient_quota"}}"#),
            AssistantError::Quota
        ));
        assert!(matches!(
            classify_upstream(502, "bad gateway"),
            AssistantError::Upstream { status: 502, .. }
        ));
    }

    #[tokio::test]
    async fn missing_key_is_a_configuration_error() {
        let err = client("http://127.0.0.1:9".into(), "")
            .ask(UserRole::Leader, &state(), "How is the team?")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AssistantErrorKind::Configuration);
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let base = fake_upstream(
            StatusCode::OK,
            json!({ "choices": [{ "message": { "role": "assistant", "content": "  Take a break together. " } }] }),
        )
        .await;
        let answer = client(base, "sk-test")
            .ask(UserRole::Leader, &state(), "Any advice?")
            .await
            .unwrap();
        assert_eq!(answer, "Take a break together.");
    }

    #[tokio::test]
    async fn upstream_429_is_quota() {
        let base = fake_upstream(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": { "code": "rate_limit_exceeded" } }),
        )
        .await;
        let err = client(base, "sk-test")
            .ask(UserRole::Leader, &state(), "Any advice?")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AssistantErrorKind::Quota);
    }

    #[tokio::test]
    async fn empty_choices_are_unknown() {
        let base = fake_upstream(StatusCode::OK, json!({ "choices": [] })).await;
        let err = client(base, "sk-test")
            .ask(UserRole::Leader, &state(), "Any advice?")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "unknown_error");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{addr}"), "sk-test")
            .ask(UserRole::Leader, &state(), "Any advice?")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AssistantErrorKind::Connection);
    }
}
