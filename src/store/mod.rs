//! Persistence seam for accounts and completion records.
//!
//! Both backends enforce the two uniqueness rules inside a single operation:
//! usernames/emails are unique across accounts, and an account completes a
//! given exercise at most once per UTC day.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::gym::model::{
    Account, AccountFilter, ApprovalState, CompletionRecord, DayWindow, PaymentState,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Outcome when attempting to insert a new account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    Conflict,
}

/// Outcome of the conditional completion insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Record stored and the owner's star counter incremented.
    Recorded,
    AlreadyCompleted,
    UnknownAccount,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_account(&self, account: &Account) -> Result<InsertOutcome>;

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// All accounts, oldest first.
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Apply whichever states are given. Returns `false` when the account does not exist.
    async fn update_account_states(
        &self,
        id: Uuid,
        approval: Option<ApprovalState>,
        payment: Option<PaymentState>,
    ) -> Result<bool>;

    /// Delete an account and its completion records. Returns `false` when nothing was removed.
    async fn delete_account(&self, id: Uuid) -> Result<bool>;

    async fn reset_all_stars(&self) -> Result<u64>;

    async fn reset_all_payments(&self) -> Result<u64>;

    async fn count_accounts(&self, filter: AccountFilter) -> Result<i64>;

    /// Insert `record` unless the same account/exercise pair already has a record
    /// inside `window`; on success the owner's counter grows by the record's stars.
    async fn insert_completion_once(
        &self,
        record: &CompletionRecord,
        window: DayWindow,
    ) -> Result<CompletionOutcome>;

    async fn completions_in(&self, account_id: Uuid, window: DayWindow)
    -> Result<Vec<CompletionRecord>>;

    async fn clear_completions(&self) -> Result<u64>;

    /// Liveness check for `/health`.
    async fn ping(&self) -> Result<()>;
}
