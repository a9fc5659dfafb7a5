//! Map validated CLI matches to the action the binary runs.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, scheduler};
use crate::gym::ResetTime;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches.get_one::<String>("dsn").cloned();

    let reset_at = matches
        .get_one::<ResetTime>(scheduler::ARG_RESET_AT)
        .copied()
        .context("missing required argument: --reset-at")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret: auth_opts.jwt_secret,
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        admin_username: auth_opts.admin_username,
        admin_password: auth_opts.admin_password,
        reset_at,
        frontend_base_url: auth_opts.frontend_base_url,
    }))
}
