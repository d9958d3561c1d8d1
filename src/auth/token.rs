use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{self as jwt, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

const MAX_TTL_DAYS: i64 = 100 * 365;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Issues and checks HS256 bearer tokens. Holds no state besides the key.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self> {
        if secret.trim().is_empty() {
            anyhow::bail!("jwt secret is not configured");
        }
        if ttl <= Duration::zero() {
            anyhow::bail!("token ttl must be positive, got {ttl}");
        }
        if ttl > Duration::days(MAX_TTL_DAYS) {
            anyhow::bail!("token ttl of {} hours exceeds {MAX_TTL_DAYS} days", ttl.num_hours());
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "iat"]);

        Ok(TokenService {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: i64, username: &str) -> Result<String> {
        self.issue_at(user_id, username, Utc::now())
    }

    fn issue_at(&self, user_id: i64, username: &str, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: now
                .checked_add_signed(self.ttl)
                .ok_or_else(|| anyhow::anyhow!("token expiry out of range"))?
                .timestamp(),
        };

        Ok(jwt::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        jwt::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}

/// Extracts the token from an `Authorization` value of the exact form
/// `Bearer <token>`.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(*token),
        _ => Err(AuthError::MalformedHeader),
    }
}
