use crate::{
    api::{
        self,
        state::{DEFAULT_ADMIN_PASSWORD, DEFAULT_JWT_SECRET, GymConfig, GymState},
    },
    gym::{OperatorCredentials, ResetTime},
    store::{MemoryStore, PgStore, Store},
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc};
use tracing::{info, warn};
use url::Url;

pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub jwt_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub admin_username: String,
    pub admin_password: SecretString,
    pub reset_at: ResetTime,
    pub frontend_base_url: Option<String>,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &self.dsn.as_deref().map(redact_dsn))
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"[REDACTED]")
            .field("reset_at", &self.reset_at)
            .field("frontend_base_url", &self.frontend_base_url)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be reached or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    if args.jwt_secret.expose_secret() == DEFAULT_JWT_SECRET {
        warn!("Using the built-in JWT secret; set SILVERGYM_JWT_SECRET in production");
    }
    if args.admin_password.expose_secret() == DEFAULT_ADMIN_PASSWORD {
        warn!("Using the built-in operator password; set SILVERGYM_ADMIN_PASSWORD in production");
    }

    let store: Arc<dyn Store> = match &args.dsn {
        Some(dsn) => Arc::new(
            PgStore::connect(dsn)
                .await
                .context("Failed to connect to database")?,
        ),
        None => {
            warn!("No DSN configured; accounts and completions are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let config = GymConfig::new(args.jwt_secret)
        .with_token_ttl_seconds(args.token_ttl_seconds)
        .with_operator(OperatorCredentials::new(
            args.admin_username,
            args.admin_password,
        ))
        .with_reset_at(args.reset_at)
        .with_frontend_base_url(args.frontend_base_url);

    let state = Arc::new(GymState::new(store, &config));

    api::new(args.port, state, config.frontend_base_url()).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "store",
            args.dsn
                .as_deref()
                .map_or_else(|| "memory".to_string(), redact_dsn),
        ),
        ("token_ttl_seconds", args.token_ttl_seconds.to_string()),
        ("admin_username", args.admin_username.clone()),
        ("reset_at", format!("{} UTC", args.reset_at)),
        (
            "frontend_base_url",
            args.frontend_base_url
                .clone()
                .unwrap_or_else(|| "any origin".to_string()),
        ),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> String {
    hash.trim().chars().take(7).collect()
}
