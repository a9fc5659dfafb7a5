//! Shared request state and the configuration it is built from.

use secrecy::SecretString;
use std::{fmt, sync::Arc};
use time::Duration;

use crate::{
    gym::{
        AccessGate, AccountDirectory, Catalog, CompletionLedger, CredentialCodec,
        DEFAULT_TOKEN_TTL, DailyResetScheduler, OperatorCredentials, ResetTime,
    },
    store::Store,
};

pub const DEFAULT_JWT_SECRET: &str = "silver_gym_secret_key_2024";
pub const DEFAULT_ADMIN_USERNAME: &str = "Silver Gym";
pub const DEFAULT_ADMIN_PASSWORD: &str = "silver101";

#[derive(Clone)]
pub struct GymConfig {
    jwt_secret: SecretString,
    token_ttl: Duration,
    operator: OperatorCredentials,
    reset_at: ResetTime,
    frontend_base_url: Option<String>,
}

impl Default for GymConfig {
    fn default() -> Self {
        Self::new(SecretString::from(DEFAULT_JWT_SECRET.to_string()))
    }
}

impl fmt::Debug for GymConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GymConfig")
            .field("jwt_secret", &"***")
            .field("token_ttl", &self.token_ttl)
            .field("operator", &self.operator)
            .field("reset_at", &self.reset_at)
            .field("frontend_base_url", &self.frontend_base_url)
            .finish()
    }
}

impl GymConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString) -> Self {
        Self {
            jwt_secret,
            token_ttl: DEFAULT_TOKEN_TTL,
            operator: OperatorCredentials::new(
                DEFAULT_ADMIN_USERNAME,
                SecretString::from(DEFAULT_ADMIN_PASSWORD.to_string()),
            ),
            reset_at: ResetTime::default(),
            frontend_base_url: None,
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl = Duration::seconds(seconds);
        self
    }

    #[must_use]
    pub fn with_operator(mut self, operator: OperatorCredentials) -> Self {
        self.operator = operator;
        self
    }

    #[must_use]
    pub fn with_reset_at(mut self, reset_at: ResetTime) -> Self {
        self.reset_at = reset_at;
        self
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, frontend_base_url: Option<String>) -> Self {
        self.frontend_base_url = frontend_base_url;
        self
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    #[must_use]
    pub fn reset_at(&self) -> ResetTime {
        self.reset_at
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> Option<&str> {
        self.frontend_base_url.as_deref()
    }
}

/// Everything a handler needs, wired once at startup.
#[derive(Clone)]
pub struct GymState {
    store: Arc<dyn Store>,
    directory: AccountDirectory,
    gate: AccessGate,
    ledger: CompletionLedger,
    scheduler: DailyResetScheduler,
}

impl fmt::Debug for GymState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GymState")
            .field("gate", &self.gate)
            .field("ledger", &self.ledger)
            .field("reset_at", &self.scheduler.reset_at())
            .finish_non_exhaustive()
    }
}

impl GymState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: &GymConfig) -> Self {
        Self::with_catalog(store, config, Catalog::standard())
    }

    #[must_use]
    pub fn with_catalog(store: Arc<dyn Store>, config: &GymConfig, catalog: Catalog) -> Self {
        let directory = AccountDirectory::new(store.clone());
        let gate = AccessGate::new(
            CredentialCodec::new(config.jwt_secret.clone()),
            directory.clone(),
            config.operator.clone(),
        )
        .with_token_ttl(config.token_ttl);
        let ledger = CompletionLedger::new(store.clone(), Arc::new(catalog));
        let scheduler = DailyResetScheduler::new(ledger.clone(), directory.clone(), config.reset_at);

        Self {
            store,
            directory,
            gate,
            ledger,
            scheduler,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    #[must_use]
    pub fn directory(&self) -> &AccountDirectory {
        &self.directory
    }

    #[must_use]
    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    #[must_use]
    pub fn ledger(&self) -> &CompletionLedger {
        &self.ledger
    }

    #[must_use]
    pub fn scheduler(&self) -> &DailyResetScheduler {
        &self.scheduler
    }
}
