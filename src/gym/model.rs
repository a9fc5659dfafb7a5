//! Account and completion records shared by the directory, ledger and stores.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use time::{Duration, OffsetDateTime, Time};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stars granted for a single completed exercise.
pub const STARS_PER_COMPLETION: i64 = 1;

/// Gate on whether a registered account may log in at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for ApprovalState {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown approval state: {other}")),
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Unpaid,
    Paid,
}

impl PaymentState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
        }
    }
}

impl FromStr for PaymentState {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            other => Err(format!("unknown payment state: {other}")),
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gym member as persisted by the store.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub approval: ApprovalState,
    pub payment: PaymentState,
    pub total_stars: i64,
    pub created_at: OffsetDateTime,
}

impl Account {
    /// Fresh signup: `pending`, `unpaid`, zero stars.
    #[must_use]
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            approval: ApprovalState::Pending,
            payment: PaymentState::Unpaid,
            total_stars: 0,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.approval == ApprovalState::Approved
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("approval", &self.approval)
            .field("payment", &self.payment)
            .field("total_stars", &self.total_stars)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// One completed exercise for one member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRecord {
    pub id: Uuid,
    pub account_id: Uuid,
    pub exercise_id: String,
    pub completed_at: OffsetDateTime,
    pub stars_earned: i64,
}

impl CompletionRecord {
    #[must_use]
    pub fn new(account_id: Uuid, exercise_id: &str, completed_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            exercise_id: exercise_id.to_string(),
            completed_at,
            stars_earned: STARS_PER_COMPLETION,
        }
    }
}

/// Half-open `[midnight, next midnight)` interval in UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayWindow {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl DayWindow {
    /// The UTC calendar day containing `instant`.
    #[must_use]
    pub fn containing(instant: OffsetDateTime) -> Self {
        let start = instant.to_offset(time::UtcOffset::UTC).replace_time(Time::MIDNIGHT);
        Self {
            start,
            end: start + Duration::DAY,
        }
    }

    #[must_use]
    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    #[must_use]
    pub fn date(&self) -> time::Date {
        self.start.date()
    }

    #[must_use]
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Filters for counting accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountFilter {
    All,
    Approval(ApprovalState),
    Payment(PaymentState),
}

impl AccountFilter {
    #[must_use]
    pub fn matches(self, account: &Account) -> bool {
        match self {
            Self::All => true,
            Self::Approval(state) => account.approval == state,
            Self::Payment(state) => account.payment == state,
        }
    }
}

/// Headcounts shown on the admin dashboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub paid: i64,
}
