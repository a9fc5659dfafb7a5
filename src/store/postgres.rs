//! `PostgreSQL` backend.
//!
//! Queries are issued with runtime-checked `sqlx::query` and wrapped in a
//! `db.query` span so they show up in traces next to the HTTP request.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::time::Duration;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use super::{CompletionOutcome, InsertOutcome, Store};
use crate::gym::model::{
    Account, AccountFilter, ApprovalState, CompletionRecord, DayWindow, PaymentState,
};

const SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const ACCOUNT_COLUMNS: &str =
    "id, username, email, password_hash, status, payment_status, total_stars, created_at";

macro_rules! db_span {
    ($operation:expr, $statement:expr) => {
        info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = $operation,
            db.statement = $statement
        )
    };
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and apply the schema.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable or the schema cannot be applied.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .instrument(db_span!("DDL", "sql/schema.sql"))
            .await
            .context("failed to apply database schema")?;
        info!("database schema is up to date");
        Ok(())
    }
}

fn account_from_row(row: &PgRow) -> Result<Account> {
    let status: String = row.try_get("status")?;
    let payment_status: String = row.try_get("payment_status")?;
    Ok(Account {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        approval: status.parse::<ApprovalState>().map_err(|err| anyhow!(err))?,
        payment: payment_status
            .parse::<PaymentState>()
            .map_err(|err| anyhow!(err))?,
        total_stars: row.try_get("total_stars")?,
        created_at: row.try_get("created_at")?,
    })
}

fn completion_from_row(row: &PgRow) -> Result<CompletionRecord> {
    Ok(CompletionRecord {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        exercise_id: row.try_get("exercise_id")?,
        completed_at: row.try_get("completed_at")?,
        stars_earned: row.try_get("stars_earned")?,
    })
}

fn has_sqlstate(err: &sqlx::Error, sqlstate: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == sqlstate),
        _ => false,
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_sqlstate(err, "23505")
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    has_sqlstate(err, "23503")
}

#[async_trait]
impl Store for PgStore {
    async fn insert_account(&self, account: &Account) -> Result<InsertOutcome> {
        let query = r"
            INSERT INTO accounts
                (id, username, email, password_hash, status, payment_status, total_stars, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ";
        let result = sqlx::query(query)
            .bind(account.id)
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.approval.as_str())
            .bind(account.payment.as_str())
            .bind(account.total_stars)
            .bind(account.created_at)
            .execute(&self.pool)
            .instrument(db_span!("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert account"),
        }
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span!("SELECT", query.as_str()))
            .await
            .context("failed to lookup account by id")?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(db_span!("SELECT", query.as_str()))
            .await
            .context("failed to lookup account by username")?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at, username");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(db_span!("SELECT", query.as_str()))
            .await
            .context("failed to list accounts")?;
        rows.iter().map(account_from_row).collect()
    }

    async fn update_account_states(
        &self,
        id: Uuid,
        approval: Option<ApprovalState>,
        payment: Option<PaymentState>,
    ) -> Result<bool> {
        // COALESCE keeps the stored value for whichever state was not supplied.
        let query = r"
            UPDATE accounts
            SET status = COALESCE($2, status),
                payment_status = COALESCE($3, payment_status)
            WHERE id = $1
        ";
        let result = sqlx::query(query)
            .bind(id)
            .bind(approval.map(ApprovalState::as_str))
            .bind(payment.map(PaymentState::as_str))
            .execute(&self.pool)
            .instrument(db_span!("UPDATE", query))
            .await
            .context("failed to update account states")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool> {
        // completions rows go with it via ON DELETE CASCADE.
        let query = "DELETE FROM accounts WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span!("DELETE", query))
            .await
            .context("failed to delete account")?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_all_stars(&self) -> Result<u64> {
        let query = "UPDATE accounts SET total_stars = 0";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span!("UPDATE", query))
            .await
            .context("failed to reset star counters")?;
        Ok(result.rows_affected())
    }

    async fn reset_all_payments(&self) -> Result<u64> {
        let query = "UPDATE accounts SET payment_status = 'unpaid'";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span!("UPDATE", query))
            .await
            .context("failed to reset payment states")?;
        Ok(result.rows_affected())
    }

    async fn count_accounts(&self, filter: AccountFilter) -> Result<i64> {
        let (query, value) = match filter {
            AccountFilter::All => ("SELECT COUNT(*) AS total FROM accounts", None),
            AccountFilter::Approval(state) => (
                "SELECT COUNT(*) AS total FROM accounts WHERE status = $1",
                Some(state.as_str()),
            ),
            AccountFilter::Payment(state) => (
                "SELECT COUNT(*) AS total FROM accounts WHERE payment_status = $1",
                Some(state.as_str()),
            ),
        };
        let mut statement = sqlx::query(query);
        if let Some(value) = value {
            statement = statement.bind(value);
        }
        let row = statement
            .fetch_one(&self.pool)
            .instrument(db_span!("SELECT", query))
            .await
            .context("failed to count accounts")?;
        Ok(row.try_get("total")?)
    }

    async fn insert_completion_once(
        &self,
        record: &CompletionRecord,
        window: DayWindow,
    ) -> Result<CompletionOutcome> {
        // Insert and star increment commit together; the unique index on
        // (account_id, exercise_id, completed_on) arbitrates concurrent attempts.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin completion transaction")?;

        let query = r"
            INSERT INTO completions
                (id, account_id, exercise_id, completed_at, completed_on, stars_earned)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (account_id, exercise_id, completed_on) DO NOTHING
            RETURNING id
        ";
        let inserted = sqlx::query(query)
            .bind(record.id)
            .bind(record.account_id)
            .bind(&record.exercise_id)
            .bind(record.completed_at)
            .bind(window.date())
            .bind(record.stars_earned)
            .fetch_optional(&mut *tx)
            .instrument(db_span!("INSERT", query))
            .await;

        if let Some(outcome) = rejected_insert(inserted)? {
            // Dropping `tx` rolls back as well.
            if let Err(err) = tx.rollback().await {
                debug!("completion rollback failed: {err}");
            }
            return Ok(outcome);
        }

        let query = "UPDATE accounts SET total_stars = total_stars + $2 WHERE id = $1";
        sqlx::query(query)
            .bind(record.account_id)
            .bind(record.stars_earned)
            .execute(&mut *tx)
            .instrument(db_span!("UPDATE", query))
            .await
            .context("failed to increment star counter")?;

        tx.commit().await.context("commit completion transaction")?;

        Ok(CompletionOutcome::Recorded)
    }

    async fn completions_in(
        &self,
        account_id: Uuid,
        window: DayWindow,
    ) -> Result<Vec<CompletionRecord>> {
        let query = r"
            SELECT id, account_id, exercise_id, completed_at, stars_earned
            FROM completions
            WHERE account_id = $1 AND completed_at >= $2 AND completed_at < $3
            ORDER BY completed_at
        ";
        let rows = sqlx::query(query)
            .bind(account_id)
            .bind(window.start())
            .bind(window.end())
            .fetch_all(&self.pool)
            .instrument(db_span!("SELECT", query))
            .await
            .context("failed to list completions")?;
        rows.iter().map(completion_from_row).collect()
    }

    async fn clear_completions(&self) -> Result<u64> {
        let query = "DELETE FROM completions";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span!("DELETE", query))
            .await
            .context("failed to clear completions")?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        let query = "SELECT 1";
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span!("SELECT", query))
            .await
            .context("database ping failed")?;
        Ok(())
    }
}

/// Outcome of a completion insert that recorded nothing, or `None` when a row was inserted.
fn rejected_insert<T>(
    inserted: Result<Option<T>, sqlx::Error>,
) -> Result<Option<CompletionOutcome>> {
    match inserted {
        Ok(Some(_)) => Ok(None),
        Ok(None) => Ok(Some(CompletionOutcome::AlreadyCompleted)),
        Err(err) if is_foreign_key_violation(&err) => Ok(Some(CompletionOutcome::UnknownAccount)),
        Err(err) => Err(err).context("failed to insert completion"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::{borrow::Cow, error::Error as StdError, fmt};

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(TestDbError { code: Some(code) }))
    }

    #[test]
    fn sqlstate_classification() {
        assert!(is_unique_violation(&db_error("23505")));
        assert!(!is_unique_violation(&db_error("23503")));
        assert!(is_foreign_key_violation(&db_error("23503")));
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::Database(Box::new(
            TestDbError { code: None }
        ))));
    }

    #[test]
    fn rejected_insert_outcomes() -> Result<()> {
        assert_eq!(rejected_insert(Ok(Some(())))?, None);
        assert_eq!(
            rejected_insert::<()>(Ok(None))?,
            Some(CompletionOutcome::AlreadyCompleted)
        );
        assert_eq!(
            rejected_insert::<()>(Err(db_error("23503")))?,
            Some(CompletionOutcome::UnknownAccount)
        );
        assert!(rejected_insert::<()>(Err(db_error("23505"))).is_err());
        assert!(rejected_insert::<()>(Err(sqlx::Error::PoolTimedOut)).is_err());
        Ok(())
    }

    fn canonicalize_sql(sql: &str) -> String {
        sql.chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| ch.to_ascii_lowercase())
            .collect()
    }

    #[test]
    fn schema_enforces_daily_uniqueness_and_cascade() {
        let canonical = canonicalize_sql(SCHEMA);
        assert!(canonical.contains("oncompletions(account_id,exercise_id,completed_on)"));
        assert!(canonical.contains("createuniqueindexifnotexistscompletions_once_per_day"));
        assert!(canonical.contains("referencesaccounts(id)ondeletecascade"));
        assert!(canonical.contains("createuniqueindexifnotexistsaccounts_username_key"));
        assert!(canonical.contains("createuniqueindexifnotexistsaccounts_email_key"));
    }

    #[test]
    fn schema_is_idempotent() {
        let canonical = canonicalize_sql(SCHEMA);
        assert!(!canonical.contains("createtableaccounts("));
        assert!(!canonical.contains("createtablecompletions("));
        assert!(!canonical.contains("droptable"));
    }
}
