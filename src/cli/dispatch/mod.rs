//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, smtp};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let frontend_base_url = matches
        .get_one::<String>("frontend-base-url")
        .cloned()
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let rate_limit_replenish_seconds = matches
        .get_one::<u64>("rate-limit-replenish-seconds")
        .copied()
        .unwrap_or(4);
    let rate_limit_burst = matches
        .get_one::<u32>("rate-limit-burst")
        .copied()
        .unwrap_or(15);

    let auth_opts = auth::Options::parse(matches);
    let smtp_opts = smtp::Options::parse(matches);

    Ok(Action::Server(Box::new(Args {
        port,
        dsn,
        frontend_base_url,
        rate_limit_replenish_seconds,
        rate_limit_burst,
        jwt_secret: auth_opts.jwt_secret,
        jwt_expires_in: auth_opts.jwt_expires_in,
        verification_ttl_seconds: auth_opts.verification_ttl_seconds,
        verification_cache_capacity: auth_opts.verification_cache_capacity,
        smtp_host: smtp_opts.host,
        smtp_port: smtp_opts.port,
        smtp_secure: smtp_opts.secure,
        smtp_user: smtp_opts.user,
        smtp_pass: smtp_opts.pass,
        smtp_from: smtp_opts.from,
        smtp_log_only: smtp_opts.log_only,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_server_action_with_defaults() {
        temp_env::with_vars(
            [
                ("SESAMO_PORT", None::<&str>),
                ("SESAMO_JWT_SECRET", Some("super-secret")),
                ("SESAMO_DSN", Some("postgres://localhost/sesamo")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["sesamo"]);
                let action = handler(&matches).expect("handler should succeed");

                let Action::Server(args) = action;
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://localhost/sesamo");
                assert_eq!(args.jwt_expires_in, "7d");
                assert_eq!(args.verification_ttl_seconds, 600);
                assert!(args.jwt_secret.is_some());
                assert!(!args.smtp_log_only);
            },
        );
    }
}
