use clap::{builder::PossibleValuesParser, Arg, ArgAction, ArgMatches, Command};

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_FORMAT: &str = "log-format";

/// Level names in verbosity order; the index is the `-v` count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn from_matches(matches: &ArgMatches) -> Self {
        match matches.get_one::<String>(ARG_LOG_FORMAT).map(String::as_str) {
            Some("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// `JOTTER_LOG_LEVEL` accepts a level name or the equivalent `-v` count.
///
/// # Errors
/// Returns a message naming the accepted values.
pub fn parse_log_level(level: &str) -> Result<u8, String> {
    let level = level.trim();
    let index = match level.parse::<usize>() {
        Ok(count) => Some(count).filter(|count| *count < LEVEL_NAMES.len()),
        Err(_) => LEVEL_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(level)),
    };
    index
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("expected one of {} or 0-4", LEVEL_NAMES.join(", ")))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Increase verbosity (-v warn, -vv info, -vvv debug, -vvvv trace)")
                .env("JOTTER_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(parse_log_level),
        )
        .arg(
            Arg::new(ARG_LOG_FORMAT)
                .long(ARG_LOG_FORMAT)
                .help("Log output format")
                .env("JOTTER_LOG_FORMAT")
                .default_value("pretty")
                .value_parser(PossibleValuesParser::new(["pretty", "json"])),
        )
}
