use crate::{
    api,
    auth::AuthConfig,
    mail::{LogMailer, Mailer, SmtpConfig, SmtpMailer},
};
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub rate_limit_replenish_seconds: u64,
    pub rate_limit_burst: u32,
    pub jwt_secret: Option<SecretString>,
    pub jwt_expires_in: String,
    pub verification_ttl_seconds: u64,
    pub verification_cache_capacity: u64,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_secure: bool,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<SecretString>,
    pub smtp_from: String,
    pub smtp_log_only: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the mailer cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let mut auth_config = AuthConfig::new()
        .with_session_duration(args.jwt_expires_in)
        .with_verification_ttl_seconds(args.verification_ttl_seconds)
        .with_verification_cache_capacity(args.verification_cache_capacity);
    if let Some(secret) = args.jwt_secret {
        auth_config = auth_config.with_jwt_secret(secret);
    } else {
        // The server still starts; confirmations fail until a secret is set.
        warn!("No JWT secret configured; session issuance will fail");
    }

    let mailer: Arc<dyn Mailer> = if args.smtp_log_only {
        Arc::new(LogMailer)
    } else {
        let smtp_config = SmtpConfig::new()
            .with_host(args.smtp_host)
            .with_port(args.smtp_port)
            .with_secure(args.smtp_secure)
            .with_username(args.smtp_user)
            .with_password(args.smtp_pass)
            .with_from(args.smtp_from);
        Arc::new(SmtpMailer::new(&smtp_config)?)
    };

    let http_config = api::HttpConfig::new()
        .with_frontend_base_url(args.frontend_base_url)
        .with_rate_limit_replenish_seconds(args.rate_limit_replenish_seconds)
        .with_rate_limit_burst(args.rate_limit_burst);

    api::new(args.port, args.dsn, auth_config, mailer, http_config).await
}
