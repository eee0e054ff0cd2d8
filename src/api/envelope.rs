//! Response envelopes and the error-to-status boundary translator.
//!
//! Every success body is `{"status": true, "data": ...}` and every error
//! body is `{"status": false, "errorCode": ..., "errorMessage": ...}`,
//! applied uniformly at the outermost request boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::auth::AuthFlowError;

/// Success envelope wrapping a payload.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: bool,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    #[must_use]
    pub fn new(data: T) -> Self {
        Self { status: true, data }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: bool,
    pub error_code: u16,
    pub error_message: String,
}

/// The service error taxonomy, mapped to HTTP at the boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input.
    #[error("{0}")]
    Validation(String),
    /// Bad, expired, or consumed verification token, or a mismatched code.
    #[error("Invalid confirmation token or code")]
    InvalidVerification,
    /// Missing or invalid session cookie.
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    NotFound(&'static str),
    /// Missing required configuration, surfaced lazily at first use.
    #[error("{0}")]
    Configuration(&'static str),
    /// Anything unexpected; the source is logged, the client gets a safe
    /// message.
    #[error("Unexpected error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidVerification | Self::Configuration(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("Unhandled error: {err:#}");
        }

        let status = self.status();
        let body = ErrorBody {
            status: false,
            error_code: status.as_u16(),
            error_message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AuthFlowError> for ApiError {
    fn from(err: AuthFlowError) -> Self {
        match err {
            AuthFlowError::InvalidVerification => Self::InvalidVerification,
            AuthFlowError::MissingSecret => Self::Configuration("JWT secret not configured"),
            AuthFlowError::Token(err) => Self::Internal(err.into()),
            AuthFlowError::Directory(err) => Self::Internal(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context, Result};
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .context("failed to read body")?;
        serde_json::from_slice(&bytes).context("body is not JSON")
    }

    #[tokio::test]
    async fn success_envelope_shape() -> Result<()> {
        let response = Envelope::new(serde_json::json!({"token": "T1"})).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let value = body_json(response).await?;
        assert_eq!(value["status"], Value::Bool(true));
        assert_eq!(value["data"]["token"], "T1");
        Ok(())
    }

    #[tokio::test]
    async fn validation_error_is_400_with_envelope() -> Result<()> {
        let response = ApiError::Validation("email must be an email".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let value = body_json(response).await?;
        assert_eq!(value["status"], Value::Bool(false));
        assert_eq!(value["errorCode"], 400);
        assert_eq!(value["errorMessage"], "email must be an email");
        Ok(())
    }

    #[tokio::test]
    async fn internal_error_hides_the_source() -> Result<()> {
        let response = ApiError::Internal(anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let value = body_json(response).await?;
        assert_eq!(value["errorCode"], 500);
        assert_eq!(value["errorMessage"], "Unexpected error");
        Ok(())
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Validation(String::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidVerification.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::NotFound("User not found").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Configuration("JWT secret not configured").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn flow_errors_translate() {
        assert!(matches!(
            ApiError::from(AuthFlowError::InvalidVerification),
            ApiError::InvalidVerification
        ));
        assert!(matches!(
            ApiError::from(AuthFlowError::MissingSecret),
            ApiError::Configuration("JWT secret not configured")
        ));
        assert!(matches!(
            ApiError::from(AuthFlowError::Directory(sqlx::Error::RowNotFound)),
            ApiError::Internal(_)
        ));
    }
}
