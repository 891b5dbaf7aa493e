use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::auth::middleware::AuthUser;
use crate::services::assistant::AssistantError;
use crate::AppState;

const ASSISTANT_WINDOW_SECS: u64 = 3600;

/// In-memory fixed-window limiter (single-instance deployments).
#[derive(Clone, Default)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
    window: Duration,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one request for `key`. Returns Ok(remaining) or Err(retry_after).
    pub async fn check_with_limits(
        &self,
        key: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
            window,
        });

        if now.duration_since(entry.window_start) > entry.window {
            entry.count = 0;
            entry.window_start = now;
            entry.window = window;
        }

        if entry.count >= max_requests {
            let retry_after = entry
                .window
                .saturating_sub(now.duration_since(entry.window_start));
            return Err(retry_after);
        }

        entry.count += 1;
        Ok(max_requests - entry.count)
    }

    /// Drops entries whose window has passed (call from a background task).
    pub async fn cleanup(&self) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, entry| now.duration_since(entry.window_start) < entry.window * 2);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

/// Per-user hourly limit on assistant questions. Runs after auth.
pub async fn rate_limit_assistant(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AssistantError> {
    let key = format!("assistant:{}", auth_user.id);
    let max = state.config.assistant_rate_limit_per_hour;

    match state
        .rate_limiter
        .check_with_limits(&key, max, ASSISTANT_WINDOW_SECS)
        .await
    {
        Ok(remaining) => {
            tracing::debug!(user_id = %auth_user.id, remaining, "Assistant rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                user_id = %auth_user.id,
                retry_after_secs = retry_after.as_secs(),
                "Assistant rate limit exceeded"
            );
            Err(AssistantError::Quota)
        }
    }
}
