use crate::api::state::{DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME, DEFAULT_JWT_SECRET};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_ADMIN_USERNAME: &str = "admin-username";
pub const ARG_ADMIN_PASSWORD: &str = "admin-password";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

/// Ten years.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

pub struct Options {
    pub jwt_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub admin_username: String,
    pub admin_password: SecretString,
    pub frontend_base_url: Option<String>,
}

impl Options {
    /// Read the credential options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .cloned()
            .context("missing required argument: --jwt-secret")?;
        let token_ttl_seconds = matches
            .get_one::<i64>(ARG_TOKEN_TTL_SECONDS)
            .copied()
            .context("missing required argument: --token-ttl-seconds")?;
        let admin_username = matches
            .get_one::<String>(ARG_ADMIN_USERNAME)
            .cloned()
            .context("missing required argument: --admin-username")?;
        let admin_password = matches
            .get_one::<String>(ARG_ADMIN_PASSWORD)
            .cloned()
            .context("missing required argument: --admin-password")?;

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret),
            token_ttl_seconds,
            admin_username,
            admin_password: SecretString::from(admin_password),
            frontend_base_url: matches.get_one::<String>(ARG_FRONTEND_BASE_URL).cloned(),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HMAC secret used to sign session tokens")
                .env("SILVERGYM_JWT_SECRET")
                .hide_env_values(true)
                .default_value(DEFAULT_JWT_SECRET),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Session token TTL in seconds (at most ten years)")
                .env("SILVERGYM_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_ADMIN_USERNAME)
                .long(ARG_ADMIN_USERNAME)
                .help("Operator login name")
                .env("SILVERGYM_ADMIN_USERNAME")
                .default_value(DEFAULT_ADMIN_USERNAME),
        )
        .arg(
            Arg::new(ARG_ADMIN_PASSWORD)
                .long(ARG_ADMIN_PASSWORD)
                .help("Operator password")
                .env("SILVERGYM_ADMIN_PASSWORD")
                .hide_env_values(true)
                .default_value(DEFAULT_ADMIN_PASSWORD),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL allowed by CORS (any origin when unset)")
                .env("SILVERGYM_FRONTEND_BASE_URL"),
        )
}
