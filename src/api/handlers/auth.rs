//! Passwordless authentication endpoints.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::{AuthFlow, SessionPayload, SignedToken};

use super::super::envelope::{ApiError, Envelope};
use super::super::session::session_cookie;
use super::{normalize_email, valid_email};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RequestCodeRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RequestCodeData {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConfirmCodeRequest {
    pub token: String,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConfirmCodeData {
    pub result: bool,
}

/// Request an email verification code. The returned token correlates the
/// later confirmation with this request.
#[utoipa::path(
    post,
    path = "/api/v1/auth/request-code",
    request_body = RequestCodeRequest,
    responses(
        (status = 200, description = "Code sent. Returns a token for confirmation.", body = RequestCodeData),
        (status = 400, description = "Invalid email."),
        (status = 429, description = "Rate limited.")
    ),
    tag = "auth"
)]
pub async fn request_code(
    Extension(flow): Extension<Arc<AuthFlow>>,
    payload: Option<Json<RequestCodeRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return ApiError::Validation("Missing payload".to_string()).into_response();
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return ApiError::Validation("email must be an email".to_string()).into_response();
    }

    match flow.request_email_code(&email).await {
        Ok(token) => Envelope::new(RequestCodeData { token }).into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// Confirm a verification code and receive the session cookie.
#[utoipa::path(
    post,
    path = "/api/v1/auth/confirm-code",
    request_body = ConfirmCodeRequest,
    responses(
        (status = 200, description = "JWT set in an HttpOnly cookie.", body = ConfirmCodeData),
        (status = 400, description = "Invalid confirmation token or code."),
        (status = 429, description = "Rate limited.")
    ),
    tag = "auth"
)]
pub async fn confirm_code(
    Extension(flow): Extension<Arc<AuthFlow>>,
    payload: Option<Json<ConfirmCodeRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return ApiError::Validation("Missing payload".to_string()).into_response();
    };

    let token = request.token.trim();
    if token.is_empty() {
        return ApiError::Validation("token must be a string".to_string()).into_response();
    }
    if request.code.len() != 6 {
        return ApiError::Validation("code must be exactly 6 characters".to_string())
            .into_response();
    }

    match flow.confirm_email_code(token, &request.code).await {
        Ok(signed) => cookie_response(&signed),
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// Re-issue the session token from the verified cookie payload.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "JWT refreshed and cookie rotated.", body = ConfirmCodeData),
        (status = 401, description = "Missing or invalid session cookie.")
    ),
    tag = "auth"
)]
pub async fn refresh(
    Extension(flow): Extension<Arc<AuthFlow>>,
    Extension(payload): Extension<SessionPayload>,
) -> impl IntoResponse {
    match flow.refresh(&payload) {
        Ok(signed) => cookie_response(&signed),
        Err(err) => ApiError::from(err).into_response(),
    }
}

fn cookie_response(signed: &SignedToken) -> axum::response::Response {
    match session_cookie(&signed.token, signed.expires_at) {
        Ok(cookie) => {
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);
            (headers, Envelope::new(ConfirmCodeData { result: true })).into_response()
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            ApiError::Internal(err.into()).into_response()
        }
    }
}
