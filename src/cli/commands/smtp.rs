use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("smtp-host")
                .long("smtp-host")
                .help("SMTP relay host")
                .env("SESAMO_SMTP_HOST")
                .default_value("localhost"),
        )
        .arg(
            Arg::new("smtp-port")
                .long("smtp-port")
                .help("SMTP relay port")
                .env("SESAMO_SMTP_PORT")
                .default_value("1025")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("smtp-secure")
                .long("smtp-secure")
                .help("Use an implicit TLS connection to the relay")
                .env("SESAMO_SMTP_SECURE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("smtp-user")
                .long("smtp-user")
                .help("SMTP relay username")
                .env("SESAMO_SMTP_USER"),
        )
        .arg(
            Arg::new("smtp-pass")
                .long("smtp-pass")
                .help("SMTP relay password")
                .env("SESAMO_SMTP_PASS"),
        )
        .arg(
            Arg::new("smtp-from")
                .long("smtp-from")
                .help("From address for outbound mail")
                .env("SESAMO_SMTP_FROM")
                .default_value("no-reply@localhost"),
        )
        .arg(
            Arg::new("smtp-log-only")
                .long("smtp-log-only")
                .help("Log outbound mail instead of delivering it (local dev)")
                .env("SESAMO_SMTP_LOG_ONLY")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug)]
pub struct Options {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub user: Option<String>,
    pub pass: Option<SecretString>,
    pub from: String,
    pub log_only: bool,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            host: matches
                .get_one::<String>("smtp-host")
                .cloned()
                .unwrap_or_else(|| "localhost".to_string()),
            port: matches.get_one::<u16>("smtp-port").copied().unwrap_or(1025),
            secure: matches.get_flag("smtp-secure"),
            user: matches.get_one::<String>("smtp-user").cloned(),
            pass: matches
                .get_one::<String>("smtp-pass")
                .map(|pass| SecretString::from(pass.clone())),
            from: matches
                .get_one::<String>("smtp-from")
                .cloned()
                .unwrap_or_else(|| "no-reply@localhost".to_string()),
            log_only: matches.get_flag("smtp-log-only"),
        }
    }
}
