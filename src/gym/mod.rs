//! Membership approval, session credentials and daily workout tracking.
//!
//! Flow Overview: members sign up and wait in `pending` until the operator approves
//! them. Approved members log in for a signed session credential, complete
//! exercises from the catalog (once per exercise per UTC day, one star each), and
//! the [`scheduler::DailyResetScheduler`] wipes completions and stars every night.

pub mod catalog;
pub mod credential;
pub mod directory;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod model;
pub mod password;
pub mod scheduler;

pub use catalog::{Catalog, Exercise, ExerciseLevel};
pub use credential::{CredentialCodec, DEFAULT_TOKEN_TTL, SessionClaims};
pub use directory::AccountDirectory;
pub use error::{Error, Result};
pub use gate::{
    ADMIN_SUBJECT, AccessGate, LoginGrant, OperatorCredentials, Principal, require_admin,
    require_user,
};
pub use ledger::CompletionLedger;
pub use model::{
    Account, AccountStats, ApprovalState, CompletionRecord, DayWindow, PaymentState,
    STARS_PER_COMPLETION,
};
pub use scheduler::{DailyResetScheduler, ResetReport, ResetTime};
