use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Read `SILVERGYM_LOG_LEVEL` as a level name or a verbosity count.
///
/// # Errors
/// Returns a message listing the accepted names for anything else.
pub fn parse_log_level(raw: &str) -> Result<u8, String> {
    let level = raw.trim().to_ascii_lowercase();
    let level = if level == "warning" { "warn" } else { level.as_str() };

    if let Ok(count) = level.parse::<u8>() {
        return (usize::from(count) < LEVELS.len())
            .then_some(count)
            .ok_or_else(|| format!("log level {count} is out of range 0-{}", LEVELS.len() - 1));
    }

    LEVELS
        .iter()
        .position(|name| *name == level)
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("unknown log level {raw:?}, expected one of {}", LEVELS.join(", ")))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_log_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity; repeat -v or set SILVERGYM_LOG_LEVEL (error, warn, info, debug, trace)")
            .env("SILVERGYM_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
