//! Member accounts: signup, credential checks and administrator bookkeeping.

use regex::Regex;
use std::{fmt, sync::Arc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
    error::{Error, Result},
    model::{Account, AccountFilter, AccountStats, ApprovalState, PaymentState},
    password,
};
use crate::store::{InsertOutcome, Store};

#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct AccountDirectory {
    store: Arc<dyn Store>,
}

impl fmt::Debug for AccountDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountDirectory").finish_non_exhaustive()
    }
}

impl AccountDirectory {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a `pending`, `unpaid` account with zero stars.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] for a blank username/password or a malformed email,
    /// [`Error::Conflict`] when the username or email is already registered.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Account> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidInput("username is required".to_string()));
        }
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(Error::InvalidInput("invalid email address".to_string()));
        }
        if password.is_empty() {
            return Err(Error::InvalidInput("password is required".to_string()));
        }

        let hash = hash_blocking(password.to_string()).await?;
        let account = Account::new(username.to_string(), email, hash);

        match self
            .store
            .insert_account(&account)
            .await
            .map_err(|err| Error::store(err, "register account"))?
        {
            InsertOutcome::Created => {
                info!(account_id = %account.id, "account registered");
                Ok(account)
            }
            InsertOutcome::Conflict => Err(Error::Conflict),
        }
    }

    /// Check a username/password pair. Approval is only consulted once the password matches.
    ///
    /// # Errors
    /// [`Error::InvalidCredential`] for an unknown user or wrong password,
    /// [`Error::NotApproved`] for a `pending` or `rejected` account.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn authenticate_credentials(&self, username: &str, password: &str) -> Result<Account> {
        let account = self
            .store
            .account_by_username(username.trim())
            .await
            .map_err(|err| Error::store(err, "lookup account"))?
            .ok_or(Error::InvalidCredential)?;

        if !verify_blocking(password.to_string(), account.password_hash.clone()).await? {
            debug!("password mismatch");
            return Err(Error::InvalidCredential);
        }

        if !account.is_approved() {
            return Err(Error::NotApproved);
        }

        Ok(account)
    }

    /// # Errors
    /// [`Error::NotFound`] when no such account exists.
    pub async fn get(&self, account_id: Uuid) -> Result<Account> {
        self.find(account_id).await?.ok_or(Error::NotFound)
    }

    /// Like [`Self::get`] but without turning absence into an error.
    ///
    /// # Errors
    /// Store failures only.
    pub async fn find(&self, account_id: Uuid) -> Result<Option<Account>> {
        self.store
            .account_by_id(account_id)
            .await
            .map_err(|err| Error::store(err, "lookup account"))
    }

    /// # Errors
    /// Store failures only.
    pub async fn list(&self) -> Result<Vec<Account>> {
        self.store
            .list_accounts()
            .await
            .map_err(|err| Error::store(err, "list accounts"))
    }

    /// # Errors
    /// [`Error::NotFound`] when no such account exists.
    pub async fn set_approval(&self, account_id: Uuid, state: ApprovalState) -> Result<()> {
        self.update(account_id, Some(state), None).await
    }

    /// # Errors
    /// [`Error::NotFound`] when no such account exists.
    pub async fn set_payment(&self, account_id: Uuid, state: PaymentState) -> Result<()> {
        self.update(account_id, None, Some(state)).await
    }

    /// Apply whichever states are supplied; with neither this only checks existence.
    ///
    /// # Errors
    /// [`Error::NotFound`] when no such account exists.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        account_id: Uuid,
        approval: Option<ApprovalState>,
        payment: Option<PaymentState>,
    ) -> Result<()> {
        if approval.is_none() && payment.is_none() {
            return self.get(account_id).await.map(|_| ());
        }
        let found = self
            .store
            .update_account_states(account_id, approval, payment)
            .await
            .map_err(|err| Error::store(err, "update account"))?;
        if !found {
            return Err(Error::NotFound);
        }
        info!("account updated");
        Ok(())
    }

    /// Remove an account and its completion records. Missing accounts are not an error.
    ///
    /// # Errors
    /// Store failures only.
    #[instrument(skip(self))]
    pub async fn delete(&self, account_id: Uuid) -> Result<()> {
        let removed = self
            .store
            .delete_account(account_id)
            .await
            .map_err(|err| Error::store(err, "delete account"))?;
        if removed {
            info!("account deleted");
        } else {
            debug!("delete of unknown account ignored");
        }
        Ok(())
    }

    /// # Errors
    /// Store failures only.
    pub async fn reset_all_counters(&self) -> Result<u64> {
        self.store
            .reset_all_stars()
            .await
            .map_err(|err| Error::store(err, "reset star counters"))
    }

    /// Mark every account `unpaid`.
    ///
    /// # Errors
    /// Store failures only.
    pub async fn reset_all_payments(&self) -> Result<u64> {
        let touched = self
            .store
            .reset_all_payments()
            .await
            .map_err(|err| Error::store(err, "reset payments"))?;
        info!(accounts = touched, "payment states reset");
        Ok(touched)
    }

    /// # Errors
    /// Store failures only.
    pub async fn stats(&self) -> Result<AccountStats> {
        Ok(AccountStats {
            total: self.count(AccountFilter::All).await?,
            pending: self
                .count(AccountFilter::Approval(ApprovalState::Pending))
                .await?,
            approved: self
                .count(AccountFilter::Approval(ApprovalState::Approved))
                .await?,
            paid: self
                .count(AccountFilter::Payment(PaymentState::Paid))
                .await?,
        })
    }

    async fn count(&self, filter: AccountFilter) -> Result<i64> {
        self.store
            .count_accounts(filter)
            .await
            .map_err(|err| Error::store(err, "count accounts"))
    }
}

// Argon2 is CPU bound; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|err| Error::Store(err.into()))?
        .map_err(Error::Store)
}

async fn verify_blocking(password: String, stored_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &stored_hash))
        .await
        .map_err(|err| Error::Store(err.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn directory() -> AccountDirectory {
        AccountDirectory::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn email_validation() {
        assert!(valid_email("alice@example.com"));
        assert!(!valid_email("alice"));
        assert!(!valid_email("alice@example"));
        assert!(!valid_email("al ice@example.com"));
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[tokio::test]
    async fn register_starts_pending_unpaid() -> anyhow::Result<()> {
        let directory = directory();
        let account = directory
            .register("alice", "alice@example.com", "pw1")
            .await?;
        assert_eq!(account.approval, ApprovalState::Pending);
        assert_eq!(account.payment, PaymentState::Unpaid);
        assert_eq!(account.total_stars, 0);
        assert_ne!(account.password_hash, "pw1");
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_duplicates() -> anyhow::Result<()> {
        let directory = directory();
        directory
            .register("alice", "alice@example.com", "pw1")
            .await?;
        assert!(matches!(
            directory.register("alice", "other@example.com", "pw").await,
            Err(Error::Conflict)
        ));
        assert!(matches!(
            directory.register("bob", "ALICE@example.com", "pw").await,
            Err(Error::Conflict)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn register_validates_input() {
        let directory = directory();
        for (username, email, password) in [
            ("  ", "a@b.io", "pw"),
            ("alice", "not-an-email", "pw"),
            ("alice", "a@b.io", ""),
        ] {
            assert!(matches!(
                directory.register(username, email, password).await,
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn pending_account_cannot_authenticate_until_approved() -> anyhow::Result<()> {
        let directory = directory();
        let account = directory
            .register("alice", "alice@example.com", "pw1")
            .await?;

        assert!(matches!(
            directory.authenticate_credentials("alice", "pw1").await,
            Err(Error::NotApproved)
        ));
        assert!(matches!(
            directory.authenticate_credentials("alice", "wrong").await,
            Err(Error::InvalidCredential)
        ));
        assert!(matches!(
            directory.authenticate_credentials("nobody", "pw1").await,
            Err(Error::InvalidCredential)
        ));

        directory
            .set_approval(account.id, ApprovalState::Approved)
            .await?;
        let authenticated = directory.authenticate_credentials("alice", "pw1").await?;
        assert_eq!(authenticated.id, account.id);

        directory
            .set_approval(account.id, ApprovalState::Rejected)
            .await?;
        assert!(matches!(
            directory.authenticate_credentials("alice", "pw1").await,
            Err(Error::NotApproved)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn admin_mutations_report_missing_accounts() {
        let directory = directory();
        let missing = Uuid::new_v4();
        assert!(matches!(
            directory.set_payment(missing, PaymentState::Paid).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(
            directory.update(missing, None, None).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(directory.get(missing).await, Err(Error::NotFound)));
        assert!(directory.delete(missing).await.is_ok());
    }

    #[tokio::test]
    async fn stats_and_payment_reset() -> anyhow::Result<()> {
        let directory = directory();
        let alice = directory
            .register("alice", "alice@example.com", "pw1")
            .await?;
        let bob = directory.register("bob", "bob@example.com", "pw2").await?;
        directory
            .update(alice.id, Some(ApprovalState::Approved), Some(PaymentState::Paid))
            .await?;
        directory.set_payment(bob.id, PaymentState::Paid).await?;

        let stats = directory.stats().await?;
        assert_eq!(
            stats,
            AccountStats {
                total: 2,
                pending: 1,
                approved: 1,
                paid: 2,
            }
        );

        assert_eq!(directory.reset_all_payments().await?, 2);
        assert_eq!(directory.stats().await?.paid, 0);
        assert_eq!(directory.list().await?.len(), 2);
        Ok(())
    }
}
