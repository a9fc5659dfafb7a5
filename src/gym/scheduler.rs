//! Nightly reset: wipe the day's completions and zero every star counter.

use std::{fmt, str::FromStr, sync::Arc};
use time::{Duration, OffsetDateTime, Time, UtcOffset};
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{error, info};

use super::{directory::AccountDirectory, ledger::CompletionLedger};

/// Wall-clock instant (UTC) at which the reset fires each day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResetTime(Time);

impl ResetTime {
    /// # Errors
    /// Returns an error when `hour`/`minute` are out of range.
    pub fn new(hour: u8, minute: u8) -> Result<Self, String> {
        Time::from_hms(hour, minute, 0)
            .map(Self)
            .map_err(|err| format!("invalid reset time: {err}"))
    }

    #[must_use]
    pub fn time(self) -> Time {
        self.0
    }
}

impl Default for ResetTime {
    fn default() -> Self {
        Self(time::macros::time!(23:59))
    }
}

impl FromStr for ResetTime {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = value
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got {value:?}"))?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(format!("expected HH:MM, got {value:?}"));
        }
        let hour = hour
            .parse::<u8>()
            .map_err(|_| format!("invalid hour in {value:?}"))?;
        let minute = minute
            .parse::<u8>()
            .map_err(|_| format!("invalid minute in {value:?}"))?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for ResetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

/// First reset instant strictly after `now`.
#[must_use]
pub fn next_reset_after(now: OffsetDateTime, at: ResetTime) -> OffsetDateTime {
    let target = now.to_offset(UtcOffset::UTC).replace_time(at.time());
    if now >= target {
        target + Duration::DAY
    } else {
        target
    }
}

/// What one reset cycle managed to do. `None` marks a failed step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub completions_cleared: Option<u64>,
    pub counters_reset: Option<u64>,
}

impl ResetReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completions_cleared.is_some() && self.counters_reset.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct DailyResetScheduler {
    ledger: CompletionLedger,
    directory: AccountDirectory,
    reset_at: ResetTime,
    next_reset: Arc<watch::Sender<Option<OffsetDateTime>>>,
}

impl DailyResetScheduler {
    #[must_use]
    pub fn new(ledger: CompletionLedger, directory: AccountDirectory, reset_at: ResetTime) -> Self {
        let (next_reset, _) = watch::channel(None);
        Self {
            ledger,
            directory,
            reset_at,
            next_reset: Arc::new(next_reset),
        }
    }

    #[must_use]
    pub fn reset_at(&self) -> ResetTime {
        self.reset_at
    }

    /// Instant the running loop is waiting for; `None` until [`Self::spawn`] has started.
    #[must_use]
    pub fn next_reset(&self) -> Option<OffsetDateTime> {
        *self.next_reset.borrow()
    }

    /// Watch the scheduled instant; it changes each time the loop picks a new target.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<OffsetDateTime>> {
        self.next_reset.subscribe()
    }

    /// Clear completions, then zero counters. The second step runs even when the first fails.
    pub async fn run_cycle(&self) -> ResetReport {
        let completions_cleared = match self.ledger.clear_all().await {
            Ok(cleared) => Some(cleared),
            Err(err) => {
                error!("daily reset failed to clear completions: {err:#}");
                None
            }
        };

        let counters_reset = match self.directory.reset_all_counters().await {
            Ok(touched) => Some(touched),
            Err(err) => {
                error!("daily reset failed to zero star counters: {err:#}");
                None
            }
        };

        let report = ResetReport {
            completions_cleared,
            counters_reset,
        };
        if report.is_complete() {
            info!(
                completions = completions_cleared.unwrap_or_default(),
                accounts = counters_reset.unwrap_or_default(),
                "daily reset completed"
            );
        }
        report
    }

    /// Run the sleep-then-reset loop until the process exits.
    pub fn spawn(self) -> JoinHandle<()> {
        self.spawn_with_clock(OffsetDateTime::now_utc)
    }

    /// Same loop, reading wall-clock time from `clock`.
    pub fn spawn_with_clock<C>(self, clock: C) -> JoinHandle<()>
    where
        C: Fn() -> OffsetDateTime + Send + 'static,
    {
        tokio::spawn(async move {
            info!(reset_at = %self.reset_at, "daily reset scheduler started");
            let mut last_target: Option<OffsetDateTime> = None;

            loop {
                let now = clock();
                // Never fire twice for the same target if the wall clock lags the timer.
                let reference = last_target.map_or(now, |previous| now.max(previous));
                let target = next_reset_after(reference, self.reset_at);
                let wait = std::time::Duration::try_from(target - now).unwrap_or_default();
                info!(next_reset = %target, "daily reset scheduled");
                self.next_reset.send_replace(Some(target));

                sleep(wait).await;

                let report = self.run_cycle().await;
                if !report.is_complete() {
                    error!(?report, "daily reset finished with failures");
                }
                last_target = Some(target);
            }
        })
    }
}
