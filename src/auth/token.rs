//! JWT signing and verification for session tokens.
//!
//! Lifetimes are expressed as human-readable strings like `"15m"` or `"7d"`.
//! An unparseable lifetime falls back to 24 hours instead of failing, so a
//! misconfigured expiry never locks the whole flow out.

use chrono::{DateTime, Duration as TimeDelta, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed token, or expired token. There is no
    /// partial/soft verification mode.
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// The identity claim embedded in every session token. Immutable once
/// issued; sessions are stateless and never stored server-side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub user_id: String,
    pub email: String,
}

/// A signed token together with its absolute expiry, so callers can set
/// cookie expiration without re-deriving it.
#[derive(Clone, Debug)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access/refresh pair signed with independent secrets and lifetimes.
#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: String,
    email: String,
    exp: i64,
    iat: i64,
}

/// Sign `payload` with an expiration of now + `duration`.
///
/// # Errors
/// Returns `TokenError::Signing` if JWT encoding fails.
pub fn sign(payload: &SessionPayload, duration: &str, secret: &str) -> Result<SignedToken, TokenError> {
    let now = Utc::now();
    let expires_at = now + delta(lifetime(duration));

    let claims = Claims {
        user_id: payload.user_id.clone(),
        email: payload.email.clone(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Signing)?;

    Ok(SignedToken { token, expires_at })
}

/// Sign the same payload twice with independent secrets and lifetimes.
///
/// Separating the signing secret by duration class lets access and refresh
/// tokens be rotated or invalidated independently.
///
/// # Errors
/// Returns `TokenError::Signing` if either encoding fails.
pub fn sign_pair(
    payload: &SessionPayload,
    access_secret: &str,
    refresh_secret: &str,
    access_duration: &str,
    refresh_duration: &str,
) -> Result<TokenPair, TokenError> {
    let access = sign(payload, access_duration, access_secret)?;
    let refresh = sign(payload, refresh_duration, refresh_secret)?;

    Ok(TokenPair {
        access_token: access.token,
        refresh_token: refresh.token,
        access_expires_at: access.expires_at,
        refresh_expires_at: refresh.expires_at,
    })
}

/// Verify a token and recover its session payload.
///
/// # Errors
/// Returns `TokenError::InvalidToken` on signature mismatch, malformed
/// input, or expiry.
pub fn verify(token: &str, secret: &str) -> Result<SessionPayload, TokenError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| SessionPayload {
        user_id: data.claims.user_id,
        email: data.claims.email,
    })
    .map_err(|_| TokenError::InvalidToken)
}

/// Parse `<integer><unit>` with unit in {s,m,h,d,w,y}; anything else means
/// the 24 hour default.
fn lifetime(duration: &str) -> Duration {
    let Ok(re) = Regex::new(r"^(\d+)([smhdwy])$") else {
        return DEFAULT_LIFETIME;
    };
    let Some(caps) = re.captures(duration) else {
        return DEFAULT_LIFETIME;
    };
    let Ok(value) = caps[1].parse::<u64>() else {
        return DEFAULT_LIFETIME;
    };
    let unit_seconds: u64 = match &caps[2] {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        // Julian year, matching the 365.25 day convention
        "y" => 31_557_600,
        _ => return DEFAULT_LIFETIME,
    };

    value
        .checked_mul(unit_seconds)
        .map_or(DEFAULT_LIFETIME, Duration::from_secs)
}

fn delta(lifetime: Duration) -> TimeDelta {
    TimeDelta::from_std(lifetime).unwrap_or_else(|_| TimeDelta::hours(24))
}
