//! The verification flow orchestrator.
//!
//! Per attempt the flow is a small state machine driven by two client
//! actions: `request_email_code` creates a pending verification, and
//! `confirm_email_code` either consumes it (code match → user upsert → JWT)
//! or leaves it intact for retry (mismatch). Expiry is handled by the store.

use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use ulid::Ulid;

use crate::cache::{PendingVerification, VerificationStore};
use crate::mail::Mailer;
use crate::users::repo;

use super::token::{self, SessionPayload, SignedToken, TokenError};

const DEFAULT_SESSION_DURATION: &str = "7d";
const DEFAULT_VERIFICATION_TTL_SECONDS: u64 = 10 * 60;
const DEFAULT_CACHE_CAPACITY: u64 = 1000;
const MAIL_SUBJECT: &str = "Email confirmation";

#[derive(Debug, Error)]
pub enum AuthFlowError {
    /// Unknown/expired/consumed request token, or the code does not match.
    #[error("Invalid confirmation token or code")]
    InvalidVerification,
    /// No signing secret configured. A startup-class fault surfaced lazily
    /// at first use.
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("user directory query failed")]
    Directory(#[from] sqlx::Error),
}

/// Flow configuration: signing secret, session lifetime, and verification
/// store sizing.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    jwt_secret: Option<SecretString>,
    session_duration: String,
    verification_ttl: Duration,
    verification_cache_capacity: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            jwt_secret: None,
            session_duration: DEFAULT_SESSION_DURATION.to_string(),
            verification_ttl: Duration::from_secs(DEFAULT_VERIFICATION_TTL_SECONDS),
            verification_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_jwt_secret(mut self, secret: SecretString) -> Self {
        self.jwt_secret = Some(secret);
        self
    }

    #[must_use]
    pub fn with_session_duration(mut self, duration: String) -> Self {
        self.session_duration = duration;
        self
    }

    #[must_use]
    pub fn with_verification_ttl_seconds(mut self, seconds: u64) -> Self {
        self.verification_ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_verification_cache_capacity(mut self, capacity: u64) -> Self {
        self.verification_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn jwt_secret(&self) -> Option<&SecretString> {
        self.jwt_secret.as_ref()
    }

    #[must_use]
    pub fn session_duration(&self) -> &str {
        &self.session_duration
    }

    #[must_use]
    pub fn verification_ttl(&self) -> Duration {
        self.verification_ttl
    }

    #[must_use]
    pub fn verification_cache_capacity(&self) -> u64 {
        self.verification_cache_capacity
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordinates code generation, the verification store, the user directory,
/// and token issuance. Collaborators are injected at construction; there is
/// no ambient state.
pub struct AuthFlow {
    config: AuthConfig,
    store: VerificationStore,
    mailer: Arc<dyn Mailer>,
    pool: PgPool,
}

impl AuthFlow {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: VerificationStore,
        mailer: Arc<dyn Mailer>,
        pool: PgPool,
    ) -> Self {
        Self {
            config,
            store,
            mailer,
            pool,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Mint a request token, stash the pending verification, and dispatch
    /// the code. Mail failure is logged and swallowed: the token already
    /// exists, and the caller may retry or receive the code out of band.
    ///
    /// # Errors
    /// Infallible today; kept as `Result` so callers treat it like the rest
    /// of the flow.
    pub async fn request_email_code(&self, email: &str) -> Result<String, AuthFlowError> {
        let token = Ulid::new().to_string();
        let code = generate_code();

        self.store.set(
            &token,
            PendingVerification {
                email: email.to_string(),
                code: code.clone(),
            },
            self.config.verification_ttl(),
        );

        let body = format!("<p>Your confirmation code: <strong>{code}</strong></p>");
        if let Err(err) = self.mailer.send(email, MAIL_SUBJECT, &body).await {
            warn!("Failed to send email to {email}: {err:#}");
        }

        Ok(token)
    }

    /// Validate the code against its request token, upsert the user, and
    /// issue a session token. The pending entry is only consumed after a
    /// successful match, so a wrong code leaves it available for retry.
    ///
    /// # Errors
    /// `InvalidVerification` on unknown token or code mismatch,
    /// `MissingSecret` without a configured secret, `Directory` on database
    /// failure.
    pub async fn confirm_email_code(
        &self,
        token: &str,
        code: &str,
    ) -> Result<SignedToken, AuthFlowError> {
        let pending = self
            .store
            .get(token)
            .ok_or(AuthFlowError::InvalidVerification)?;
        // Exact match only; no trimming or case folding of the code.
        if pending.code != code {
            return Err(AuthFlowError::InvalidVerification);
        }

        let user = repo::activate_or_create(&self.pool, &pending.email).await?;

        // Single use: gone regardless of what happens downstream.
        self.store.delete(token);

        let payload = SessionPayload {
            user_id: user.id.to_string(),
            email: user.email,
        };
        self.sign_session(&payload)
    }

    /// Re-sign an already-verified payload with a fresh expiry. Deliberately
    /// skips the directory: refresh stays cheap and trusts the incoming
    /// session.
    ///
    /// # Errors
    /// `MissingSecret` without a configured secret.
    pub fn refresh(&self, payload: &SessionPayload) -> Result<SignedToken, AuthFlowError> {
        self.sign_session(payload)
    }

    fn sign_session(&self, payload: &SessionPayload) -> Result<SignedToken, AuthFlowError> {
        let secret = self
            .config
            .jwt_secret()
            .ok_or(AuthFlowError::MissingSecret)?;
        let signed = token::sign(
            payload,
            self.config.session_duration(),
            secret.expose_secret(),
        )?;
        Ok(signed)
    }
}

/// Uniformly random 6-digit code: 100000..=899999, so never a leading zero.
fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..900_000).to_string()
}
