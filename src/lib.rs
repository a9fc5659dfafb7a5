//! # Silver Gym
//!
//! Membership approval and daily workout tracking for a single gym.
//!
//! ## Accounts and approval
//!
//! Members sign up with a username, email and password. New accounts start
//! `pending`/`unpaid` and cannot log in until the operator approves them.
//! The operator is not a stored account: it logs in with configured
//! credentials and receives a token carrying an admin claim.
//!
//! ## Completions and stars
//!
//! An approved member may complete each catalog exercise once per UTC day.
//! Every recorded completion earns one star on the member's running counter.
//! The uniqueness rule is enforced by the store (a unique index in Postgres,
//! a single write lock in memory), so concurrent duplicates produce exactly
//! one success.
//!
//! ## Daily reset
//!
//! A background task wakes at the configured wall-clock time (UTC), clears
//! every completion record and zeroes every star counter. The operator can
//! trigger the same cycle on demand.

pub mod api;
pub mod cli;
pub mod gym;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
