//! Turns presented credentials into principals and issues new ones on login.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    credential::{CredentialCodec, DEFAULT_TOKEN_TTL},
    directory::AccountDirectory,
    error::{Error, Result},
    model::Account,
};

/// Subject carried by operator credentials.
pub const ADMIN_SUBJECT: &str = "admin";

/// Who is behind a request.
#[derive(Clone, Debug)]
pub enum Principal {
    RegularUser { account: Account },
    Administrator,
}

/// Operator login configured at startup. The operator is not a stored account.
#[derive(Clone)]
pub struct OperatorCredentials {
    username: String,
    password: SecretString,
}

impl OperatorCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        let user_ok = self.username.as_bytes().ct_eq(username.as_bytes());
        let password_ok = self
            .password
            .expose_secret()
            .as_bytes()
            .ct_eq(password.as_bytes());
        (user_ok & password_ok).into()
    }
}

impl fmt::Debug for OperatorCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Result of a successful member login.
#[derive(Clone, Debug)]
pub struct LoginGrant {
    pub token: String,
    pub account: Account,
}

#[derive(Clone, Debug)]
pub struct AccessGate {
    codec: CredentialCodec,
    directory: AccountDirectory,
    operator: OperatorCredentials,
    token_ttl: Duration,
}

impl AccessGate {
    #[must_use]
    pub fn new(
        codec: CredentialCodec,
        directory: AccountDirectory,
        operator: OperatorCredentials,
    ) -> Self {
        Self {
            codec,
            directory,
            operator,
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    #[must_use]
    pub fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Resolve a presented credential.
    ///
    /// # Errors
    /// [`Error::InvalidCredential`] when the credential does not verify,
    /// [`Error::Unauthorized`] when it names an account that no longer exists.
    pub async fn authenticate(&self, token: &str) -> Result<Principal> {
        let claims = self.codec.verify(token)?;
        if claims.is_admin {
            return Ok(Principal::Administrator);
        }

        let Ok(account_id) = Uuid::parse_str(&claims.sub) else {
            debug!(subject = %claims.sub, "credential subject is not an account id");
            return Err(Error::Unauthorized);
        };

        match self.directory.find(account_id).await? {
            Some(account) => Ok(Principal::RegularUser { account }),
            None => {
                debug!(%account_id, "credential for deleted account");
                Err(Error::Unauthorized)
            }
        }
    }

    /// Member login.
    ///
    /// # Errors
    /// See [`AccountDirectory::authenticate_credentials`].
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant> {
        let account = self
            .directory
            .authenticate_credentials(username, password)
            .await?;
        let token = self
            .codec
            .issue(&account.id.to_string(), false, self.token_ttl)?;
        info!(account_id = %account.id, "member logged in");
        Ok(LoginGrant { token, account })
    }

    /// Operator login against the configured credentials.
    ///
    /// # Errors
    /// [`Error::InvalidCredential`] on mismatch.
    pub fn admin_login(&self, username: &str, password: &str) -> Result<String> {
        if !self.operator.matches(username, password) {
            warn!("rejected administrator login");
            return Err(Error::InvalidCredential);
        }
        let token = self.codec.issue(ADMIN_SUBJECT, true, self.token_ttl)?;
        info!("administrator logged in");
        Ok(token)
    }
}

/// # Errors
/// [`Error::Forbidden`] unless the principal is the administrator.
pub fn require_admin(principal: &Principal) -> Result<()> {
    match principal {
        Principal::Administrator => Ok(()),
        Principal::RegularUser { .. } => Err(Error::Forbidden),
    }
}

/// Members only; the administrator owns no workout state.
///
/// # Errors
/// [`Error::Unauthorized`] for the administrator principal.
pub fn require_user(principal: Principal) -> Result<Account> {
    match principal {
        Principal::RegularUser { account } => Ok(account),
        Principal::Administrator => Err(Error::Unauthorized),
    }
}
