use jsonwebtoken::{decode, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Access-token claims issued by the hosted auth provider. Only HS256
/// signatures made with the shared project secret are accepted.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Provider role ("authenticated", "anon", ...), not the team role.
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

const ANONYMOUS_ROLE: &str = "anon";

pub fn verify_token(token: &str, secret: &str) -> AppResult<TokenData<Claims>> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // Provider tokens carry an audience we don't pin.
    validation.validate_aud = false;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::Unauthorized
    })?;

    if data.claims.role.as_deref() == Some(ANONYMOUS_ROLE) {
        return Err(AppError::Unauthorized);
    }
    Ok(data)
}

/// Mints a token the way the auth provider would. Tests only.
#[cfg(test)]
pub fn create_access_token(user_id: Uuid, secret: &str, ttl_secs: i64) -> String {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        email: Some(format!("{}@garden.test", &user_id.to_string()[..8])),
        role: Some("authenticated".into()),
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
