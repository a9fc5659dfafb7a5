use crate::gym::ResetTime;
use clap::{Arg, Command, builder::ValueParser};

pub const ARG_RESET_AT: &str = "reset-at";

/// Accept `HH:MM` wall-clock times in UTC.
#[must_use]
pub fn validator_reset_at() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<ResetTime, String> {
        value.parse::<ResetTime>()
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_RESET_AT)
            .long(ARG_RESET_AT)
            .help("Daily workout reset time, HH:MM in UTC")
            .env("SILVERGYM_RESET_AT")
            .default_value("23:59")
            .value_parser(validator_reset_at()),
    )
}
