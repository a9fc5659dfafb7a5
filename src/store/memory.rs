//! In-process store used for tests and for local runs without a database.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CompletionOutcome, InsertOutcome, Store};
use crate::gym::model::{
    Account, AccountFilter, ApprovalState, CompletionRecord, DayWindow, PaymentState,
};

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    completions: Vec<CompletionRecord>,
}

/// Every mutation happens under one write lock, so each trait call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_account(&self, account: &Account) -> Result<InsertOutcome> {
        let mut inner = self.inner.write().await;
        let taken = inner.accounts.values().any(|existing| {
            existing.username == account.username || existing.email == account.email
        });
        if taken || inner.accounts.contains_key(&account.id) {
            return Ok(InsertOutcome::Conflict);
        }
        inner.accounts.insert(account.id, account.clone());
        Ok(InsertOutcome::Created)
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.inner.read().await.accounts.get(&id).cloned())
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .find(|account| account.username == username)
            .cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let inner = self.inner.read().await;
        let mut accounts: Vec<Account> = inner.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(accounts)
    }

    async fn update_account_states(
        &self,
        id: Uuid,
        approval: Option<ApprovalState>,
        payment: Option<PaymentState>,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(account) = inner.accounts.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(approval) = approval {
            account.approval = approval;
        }
        if let Some(payment) = payment {
            account.payment = payment;
        }
        Ok(true)
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.accounts.remove(&id).is_some();
        inner.completions.retain(|record| record.account_id != id);
        Ok(removed)
    }

    async fn reset_all_stars(&self) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut touched = 0;
        for account in inner.accounts.values_mut() {
            account.total_stars = 0;
            touched += 1;
        }
        Ok(touched)
    }

    async fn reset_all_payments(&self) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut touched = 0;
        for account in inner.accounts.values_mut() {
            account.payment = PaymentState::Unpaid;
            touched += 1;
        }
        Ok(touched)
    }

    async fn count_accounts(&self, filter: AccountFilter) -> Result<i64> {
        let inner = self.inner.read().await;
        let count = inner
            .accounts
            .values()
            .filter(|account| filter.matches(account))
            .count();
        Ok(i64::try_from(count)?)
    }

    async fn insert_completion_once(
        &self,
        record: &CompletionRecord,
        window: DayWindow,
    ) -> Result<CompletionOutcome> {
        let mut inner = self.inner.write().await;
        if !inner.accounts.contains_key(&record.account_id) {
            return Ok(CompletionOutcome::UnknownAccount);
        }
        let duplicate = inner.completions.iter().any(|existing| {
            existing.account_id == record.account_id
                && existing.exercise_id == record.exercise_id
                && window.contains(existing.completed_at)
        });
        if duplicate {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }
        inner.completions.push(record.clone());
        if let Some(account) = inner.accounts.get_mut(&record.account_id) {
            account.total_stars += record.stars_earned;
        }
        Ok(CompletionOutcome::Recorded)
    }

    async fn completions_in(
        &self,
        account_id: Uuid,
        window: DayWindow,
    ) -> Result<Vec<CompletionRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .completions
            .iter()
            .filter(|record| record.account_id == account_id && window.contains(record.completed_at))
            .cloned()
            .collect())
    }

    async fn clear_completions(&self) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let cleared = inner.completions.len();
        inner.completions.clear();
        Ok(u64::try_from(cleared)?)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
