use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_JSON: &str = "log-json";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("SESAMO_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .arg(
            Arg::new(ARG_LOG_JSON)
                .long("log-json")
                .help("Emit logs as JSON")
                .env("SESAMO_LOG_JSON")
                .global(true)
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_accepts_names_and_numbers() {
        let parser = validator_log_level();
        let command = Command::new("test").arg(
            Arg::new("level")
                .long("level")
                .value_parser(parser)
                .action(ArgAction::Set),
        );

        for (value, expected) in [
            ("error", 0u8),
            ("WARN", 1),
            ("info", 2),
            ("debug", 3),
            ("trace", 4),
            ("3", 3),
        ] {
            let matches = command
                .clone()
                .get_matches_from(vec!["test", "--level", value]);
            assert_eq!(matches.get_one::<u8>("level").copied(), Some(expected));
        }
    }

    #[test]
    fn log_level_rejects_garbage() {
        let command = Command::new("test").arg(
            Arg::new("level")
                .long("level")
                .value_parser(validator_log_level())
                .action(ArgAction::Set),
        );
        let result = command.try_get_matches_from(vec!["test", "--level", "loud"]);
        assert!(result.is_err());
    }
}
