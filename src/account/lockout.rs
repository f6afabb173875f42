//! Login lockout decision logic.
//!
//! `evaluate_login` is the whole brains of the login flow: given the stored
//! account record, the submitted password, and the evaluation timestamp, it
//! decides the outcome and produces the next account state. It performs no
//! I/O and reads no clock — the caller injects `now` and persists the
//! returned record, which keeps every transition unit-testable.
//!
//! Per-account state machine:
//! - `Unlocked(n)` --wrong password--> `Unlocked(n+1)` while `n+1 < 3`
//! - `Unlocked(2)` --wrong password--> `Locked(now + 10m)` (counter resets)
//! - `Unlocked(n)` --correct password--> `Unlocked(0)`
//! - `Locked(t)`, `now < t` --any attempt--> `Locked(t)`, password never checked
//! - `Locked(t)`, `now >= t` --any attempt--> treated as a fresh `Unlocked(0)`
//!   attempt in the same call

use super::Account;

/// Consecutive wrong-password attempts that trigger a lock.
pub const MAX_FAILED_ATTEMPTS: u32 = 3;

/// How long a lock lasts, in seconds (10 minutes).
pub const LOCK_DURATION_SECS: i64 = 10 * 60;

/// Result of one login evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Password verified; counters cleared.
    Success,
    /// Password rejected; failure counted (and possibly a lock set).
    WrongPassword,
    /// Account is locked; the password was not examined.
    Locked,
}

/// Evaluate one login attempt against a stored account record.
///
/// `verify` is the opaque password-verification capability
/// (`verify(plaintext, stored_hash) -> bool`). It is only invoked when the
/// account is not currently locked, so no hash computation happens (and no
/// timing signal leaks) during an active lock.
///
/// Returns the outcome plus the updated record. The caller is responsible
/// for persisting the record; on `Locked` it is returned unchanged.
///
/// Note the threshold check runs *after* incrementing: the third consecutive
/// failure is the call that sets the lock, and that call itself still
/// returns `WrongPassword` — the lock takes effect for subsequent attempts.
pub fn evaluate_login<F>(
    account: &Account,
    password: &str,
    now: i64,
    verify: F,
) -> (LoginOutcome, Account)
where
    F: FnOnce(&str, &str) -> bool,
{
    if let Some(locked_until) = account.locked_until {
        if now < locked_until {
            return (LoginOutcome::Locked, account.clone());
        }
    }

    let mut updated = account.clone();

    // An expired lock is resolved here, not by a background job: the attempt
    // proceeds as if the account were a fresh Unlocked(0).
    if updated.locked_until.is_some() {
        updated.locked_until = None;
        updated.failed_attempts = 0;
    }

    if !verify(password, &account.password_hash) {
        updated.failed_attempts += 1;
        if updated.failed_attempts >= MAX_FAILED_ATTEMPTS {
            updated.locked_until = Some(now + LOCK_DURATION_SECS);
            updated.failed_attempts = 0;
        }
        return (LoginOutcome::WrongPassword, updated);
    }

    updated.failed_attempts = 0;
    updated.locked_until = None;
    (LoginOutcome::Success, updated)
}
