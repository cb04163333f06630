//! HS256 access and refresh tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use thoughtful_core::types::{RefreshTokenId, UserId};

pub const ACCESS_TOKEN_EXPIRE_HOURS: i64 = 6;
pub const REFRESH_TOKEN_EXPIRE_DAYS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Encode(String),
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token is missing the '{0}' claim")]
    MissingClaim(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Claims {
    sub: UserId,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<RefreshTokenId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub token_id: RefreshTokenId,
    /// Expiry as epoch seconds, stored as the refresh table TTL.
    pub expires_at: i64,
}

/// Verified refresh token identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshIdentity {
    pub user_id: UserId,
    pub token_id: RefreshTokenId,
}

fn sign(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|error| TokenError::Encode(error.to_string()))
}

pub fn create_access_token(
    user_id: &UserId,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let claims = Claims {
        sub: user_id.clone(),
        exp: (now + Duration::hours(ACCESS_TOKEN_EXPIRE_HOURS)).timestamp(),
        jti: None,
    };
    sign(&claims, secret)
}

pub fn create_refresh_token(
    user_id: &UserId,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<IssuedRefreshToken, TokenError> {
    let token_id = uuid::Uuid::new_v4().to_string();
    let expires_at = (now + Duration::days(REFRESH_TOKEN_EXPIRE_DAYS)).timestamp();
    let claims = Claims {
        sub: user_id.clone(),
        exp: expires_at,
        jti: Some(token_id.clone()),
    };
    Ok(IssuedRefreshToken {
        token: sign(&claims, secret)?,
        token_id,
        expires_at,
    })
}

/// Verifies signature and expiry and returns every claim in the token.
pub fn verify_token(token: &str, secret: &str) -> Result<Map<String, Value>, TokenError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Map<String, Value>>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|error| TokenError::Invalid(error.to_string()))?;
    Ok(data.claims)
}

pub fn subject(claims: &Map<String, Value>) -> Result<UserId, TokenError> {
    claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|sub| !sub.is_empty())
        .map(str::to_string)
        .ok_or(TokenError::MissingClaim("sub"))
}

pub fn verify_refresh_token(token: &str, secret: &str) -> Result<RefreshIdentity, TokenError> {
    let claims = verify_token(token, secret)?;
    let user_id = subject(&claims)?;
    let token_id = claims
        .get("jti")
        .and_then(Value::as_str)
        .filter(|jti| !jti.is_empty())
        .map(str::to_string)
        .ok_or(TokenError::MissingClaim("jti"))?;
    Ok(RefreshIdentity { user_id, token_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn access_token_carries_subject_and_six_hour_expiry() {
        let now = Utc::now();
        let token = create_access_token(&"a@b.c".to_string(), SECRET, now).expect("sign");
        let claims = verify_token(&token, SECRET).expect("verify");
        assert_eq!(subject(&claims).as_deref(), Ok("a@b.c"));
        assert_eq!(
            claims["exp"].as_i64(),
            Some((now + Duration::hours(6)).timestamp())
        );
        assert!(claims.get("jti").is_none());
    }

    #[test]
    fn refresh_token_round_trips_identity() {
        let now = Utc::now();
        let issued = create_refresh_token(&"a@b.c".to_string(), SECRET, now).expect("sign");
        assert_eq!(issued.expires_at, (now + Duration::days(60)).timestamp());

        let identity = verify_refresh_token(&issued.token, SECRET).expect("verify");
        assert_eq!(identity.user_id, "a@b.c");
        assert_eq!(identity.token_id, issued.token_id);
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let token = create_access_token(&"a@b.c".to_string(), SECRET, Utc::now()).expect("sign");
        assert_eq!(
            verify_refresh_token(&token, SECRET),
            Err(TokenError::MissingClaim("jti"))
        );
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let token = create_access_token(&"a@b.c".to_string(), SECRET, Utc::now()).expect("sign");
        let wrong_secret = verify_token(&token, "other");
        assert!(matches!(wrong_secret, Err(TokenError::Invalid(_))));

        let issued_at = Utc::now() - Duration::hours(8);
        let stale = create_access_token(&"a@b.c".to_string(), SECRET, issued_at).expect("sign");
        let expired = verify_token(&stale, SECRET);
        assert!(matches!(expired, Err(TokenError::Invalid(_))));
    }
}
