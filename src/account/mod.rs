//! Account authentication: records, lockout decisions, and persistence.
//!
//! Split deliberately in two layers:
//! - `lockout`: the pure decision function. Takes the stored record, the
//!   submitted password, and an injected timestamp; returns the outcome and
//!   the next record. No store, no clock, no side effects.
//! - `store`: SQLite-backed accounts + sessions. Owns the fetch → decide →
//!   persist sequence under a single connection lock so concurrent attempts
//!   against one account can never lose counter updates.
//!
//! ## Design Decisions
//! - Passwords are hashed with PBKDF2-HMAC-SHA256 (PHC strings) — a slow,
//!   salted KDF, never a bare general-purpose hash.
//! - Sessions use opaque random tokens, SHA-256 hashed for storage, with a
//!   server-side TTL. No JWT dependency.
//! - Lock expiry is evaluated lazily at the next login attempt; there is no
//!   background unlock timer.

pub mod lockout;
pub mod password;
pub mod store;

use thiserror::Error;

pub use lockout::{evaluate_login, LoginOutcome, LOCK_DURATION_SECS, MAX_FAILED_ATTEMPTS};
pub use store::{AccountStore, Session};

/// A persisted account record.
///
/// `failed_attempts` and `locked_until` are only ever mutated by persisting
/// the result of [`evaluate_login`]; while unlocked the counter stays below
/// [`MAX_FAILED_ATTEMPTS`], and reaching the threshold always co-occurs with
/// a fresh `locked_until`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// UUIDv4, assigned at creation, immutable.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unique lookup key (case-insensitive in the store).
    pub email: String,
    /// Opaque PHC credential string.
    pub password_hash: String,
    /// Consecutive wrong-password count since the last success or lock.
    pub failed_attempts: u32,
    /// Lock deadline as Unix-epoch seconds; `None` means not locked. A value
    /// in the past means the lock has expired but not yet been cleared by an
    /// evaluated login.
    pub locked_until: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Errors from the account store.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("an account with this email already exists")]
    DuplicateEmail,
    #[error("no account with this email")]
    AccountNotFound,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}
