use thiserror::Error;

/// Failures surfaced by the membership and workout operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("username or email already registered")]
    Conflict,
    #[error("not found")]
    NotFound,
    #[error("invalid credentials")]
    InvalidCredential,
    #[error("account is not approved")]
    NotApproved,
    #[error("administrator access required")]
    Forbidden,
    #[error("exercise already completed today")]
    AlreadyCompleted,
    #[error("not authenticated")]
    Unauthorized,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Wrap a store failure with context.
    pub(crate) fn store(err: anyhow::Error, context: &'static str) -> Self {
        Self::Store(err.context(context))
    }
}
