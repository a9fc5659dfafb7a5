//! Daily exercise completions and the star rewards they earn.

use std::{fmt, sync::Arc};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
    catalog::Catalog,
    error::{Error, Result},
    model::{CompletionRecord, DayWindow},
};
use crate::store::{CompletionOutcome, Store};

#[derive(Clone)]
pub struct CompletionLedger {
    store: Arc<dyn Store>,
    catalog: Arc<Catalog>,
}

impl fmt::Debug for CompletionLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionLedger")
            .field("exercises", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl CompletionLedger {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, catalog: Arc<Catalog>) -> Self {
        Self { store, catalog }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Record that `account_id` finished `exercise_id` at `now` and return the stars earned.
    ///
    /// # Errors
    /// [`Error::NotFound`] for an exercise outside the catalog or an unknown account,
    /// [`Error::AlreadyCompleted`] when the pair was already recorded on the same UTC day.
    #[instrument(skip(self, now))]
    pub async fn record_completion(
        &self,
        account_id: Uuid,
        exercise_id: &str,
        now: OffsetDateTime,
    ) -> Result<i64> {
        if self.catalog.find(exercise_id).is_none() {
            return Err(Error::NotFound);
        }

        let record = CompletionRecord::new(account_id, exercise_id, now);
        let outcome = self
            .store
            .insert_completion_once(&record, DayWindow::containing(now))
            .await
            .map_err(|err| Error::store(err, "record completion"))?;

        match outcome {
            CompletionOutcome::Recorded => {
                info!(stars = record.stars_earned, "exercise completed");
                Ok(record.stars_earned)
            }
            CompletionOutcome::AlreadyCompleted => {
                debug!("exercise already completed today");
                Err(Error::AlreadyCompleted)
            }
            CompletionOutcome::UnknownAccount => Err(Error::NotFound),
        }
    }

    /// Records for `account_id` on the UTC day containing `now`.
    ///
    /// # Errors
    /// Store failures only.
    pub async fn todays_completions(
        &self,
        account_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<CompletionRecord>> {
        self.store
            .completions_in(account_id, DayWindow::containing(now))
            .await
            .map_err(|err| Error::store(err, "list completions"))
    }

    /// Erase every completion record.
    ///
    /// # Errors
    /// Store failures only.
    pub async fn clear_all(&self) -> Result<u64> {
        self.store
            .clear_completions()
            .await
            .map_err(|err| Error::store(err, "clear completions"))
    }
}
