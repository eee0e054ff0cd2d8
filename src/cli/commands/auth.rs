use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long("jwt-secret")
                .help("Secret used to sign session tokens")
                .env("SESAMO_JWT_SECRET"),
        )
        .arg(
            Arg::new("jwt-expires-in")
                .long("jwt-expires-in")
                .help("Session token lifetime, e.g. 15m, 12h, 7d")
                .env("SESAMO_JWT_EXPIRES_IN")
                .default_value("7d"),
        )
        .arg(
            Arg::new("verification-ttl-seconds")
                .long("verification-ttl-seconds")
                .help("Pending verification TTL in seconds")
                .env("SESAMO_VERIFICATION_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("verification-cache-capacity")
                .long("verification-cache-capacity")
                .help("Max pending verifications held in memory")
                .env("SESAMO_VERIFICATION_CACHE_CAPACITY")
                .default_value("1000")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub jwt_secret: Option<SecretString>,
    pub jwt_expires_in: String,
    pub verification_ttl_seconds: u64,
    pub verification_cache_capacity: u64,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            jwt_secret: matches
                .get_one::<String>(ARG_JWT_SECRET)
                .map(|secret| SecretString::from(secret.clone())),
            jwt_expires_in: matches
                .get_one::<String>("jwt-expires-in")
                .cloned()
                .unwrap_or_else(|| "7d".to_string()),
            verification_ttl_seconds: matches
                .get_one::<u64>("verification-ttl-seconds")
                .copied()
                .unwrap_or(600),
            verification_cache_capacity: matches
                .get_one::<u64>("verification-cache-capacity")
                .copied()
                .unwrap_or(1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn parse_defaults_leave_secret_unset() {
        temp_env::with_vars([("SESAMO_JWT_SECRET", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let matches =
                command.get_matches_from(vec!["sesamo", "--dsn", "postgres://localhost"]);
            let options = Options::parse(&matches);

            assert!(options.jwt_secret.is_none());
            assert_eq!(options.jwt_expires_in, "7d");
            assert_eq!(options.verification_ttl_seconds, 600);
            assert_eq!(options.verification_cache_capacity, 1000);
        });
    }

    #[test]
    fn parse_overrides() {
        let command = crate::cli::commands::new();
        let matches = command.get_matches_from(vec![
            "sesamo",
            "--dsn",
            "postgres://localhost",
            "--jwt-secret",
            "super-secret",
            "--jwt-expires-in",
            "12h",
            "--verification-ttl-seconds",
            "120",
            "--verification-cache-capacity",
            "50",
        ]);
        let options = Options::parse(&matches);

        assert_eq!(
            options.jwt_secret.map(|s| s.expose_secret().to_string()),
            Some("super-secret".to_string())
        );
        assert_eq!(options.jwt_expires_in, "12h");
        assert_eq!(options.verification_ttl_seconds, 120);
        assert_eq!(options.verification_cache_capacity, 50);
    }
}
