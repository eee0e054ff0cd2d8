//! Outbound email delivery.
//!
//! The auth flow only depends on the [`Mailer`] trait; delivery failures are
//! the caller's business to log and swallow. Two senders exist: a real SMTP
//! transport and a log-only sender for local development, where codes show
//! up in the service log instead of a mailbox.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

/// Email delivery abstraction used by the auth flow.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error for the caller to log.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// SMTP relay settings. Defaults target a local development relay
/// (`localhost:1025`) without TLS or credentials.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    host: String,
    port: u16,
    secure: bool,
    username: Option<String>,
    password: Option<SecretString>,
    from: String,
}

impl SmtpConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1025,
            secure: false,
            username: None,
            password: None,
            from: "no-reply@localhost".to_string(),
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: Option<SecretString>) -> Self {
        self.password = password;
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: String) -> Self {
        self.from = from;
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// SMTP sender backed by an async lettre transport with connection pooling.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport from config. Credentials are only attached when
    /// both username and password are present, mirroring optional relay
    /// auth.
    ///
    /// # Errors
    /// Returns an error if the relay host or `from` address is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .with_context(|| format!("invalid SMTP relay host: {}", config.host))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid SMTP from address: {}", config.from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, to: &str, subject: &str, html_body: &str) -> Result<Message> {
        let to = to
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient address: {to}"))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .context("failed to build email message")
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let message = self.build_message(to, subject, html_body)?;
        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        info!(to_email = %to, subject = %subject, body = %html_body, "email send stub");
        Ok(())
    }
}
