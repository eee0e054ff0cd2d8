//! Session cookie handling and the authorization gate.
//!
//! Protected routes sit behind [`require_session`]: it verifies the JWT from
//! the `token` cookie and injects the decoded [`SessionPayload`] into
//! request extensions for handlers to extract. Public routes simply are not
//! layered with it.

use axum::{
    extract::{Extension, Request},
    http::{
        header::{InvalidHeaderValue, COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use std::sync::Arc;

use crate::auth::{token, AuthFlow};

use super::envelope::ApiError;

pub const SESSION_COOKIE_NAME: &str = "token";

/// Authorization gate applied ahead of protected handlers.
pub async fn require_session(
    Extension(flow): Extension<Arc<AuthFlow>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(raw_token) = extract_session_token(request.headers()) else {
        return ApiError::Unauthorized.into_response();
    };
    let Some(secret) = flow.config().jwt_secret() else {
        // Without a secret no cookie can have been signed by us.
        return ApiError::Unauthorized.into_response();
    };

    match token::verify(&raw_token, secret.expose_secret()) {
        Ok(payload) => {
            request.extensions_mut().insert(payload);
            next.run(request).await
        }
        Err(_) => ApiError::Unauthorized.into_response(),
    }
}

/// Build the `HttpOnly` session cookie with an absolute expiry matching the
/// issued token.
///
/// # Errors
/// Returns an error if the cookie value is not a valid header value.
pub(crate) fn session_cookie(
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let expires = expires_at.format("%a, %d %b %Y %H:%M:%S GMT");
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Expires={expires}"
    ))
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::TimeZone;

    #[test]
    fn extract_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("token=abc123"));
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_token_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; token=abc123; lang=en"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn missing_cookie_header_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn other_cookies_do_not_match() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session=abc123"));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn session_cookie_format() -> Result<()> {
        let expires_at = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).single().unwrap();
        let cookie = session_cookie("jwt-value", expires_at)?;
        assert_eq!(
            cookie.to_str()?,
            "token=jwt-value; Path=/; HttpOnly; SameSite=Lax; Expires=Thu, 06 Aug 2026 12:00:00 GMT"
        );
        Ok(())
    }

    #[test]
    fn session_cookie_round_trips_through_extraction() -> Result<()> {
        let expires_at = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).single().unwrap();
        let cookie = session_cookie("jwt-value", expires_at)?;

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie.to_str()?)?);
        // The Set-Cookie attributes after ';' are ignored by the parser.
        assert_eq!(
            extract_session_token(&headers),
            Some("jwt-value".to_string())
        );
        Ok(())
    }
}
