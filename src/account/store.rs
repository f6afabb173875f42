//! SQLite-backed account and session store.
//!
//! Tables:
//! - `accounts`: id, name, email (unique), password_hash, lockout state
//! - `sessions`: token_hash, account_id, expires_at
//!
//! The store owns a single `Mutex<Connection>`. [`AccountStore::login`]
//! holds that lock across the whole fetch → [`evaluate_login`] → persist
//! sequence, which serializes concurrent attempts per account (and across
//! accounts) — two racing wrong-password attempts can never both read the
//! same counter and lose an increment, and a racing success can never be
//! overwritten by a stale failure.

use parking_lot::Mutex;
use rand::RngCore;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::lockout::{evaluate_login, LoginOutcome};
use super::password::{hash_password, verify_password};
use super::{Account, AccountError};

/// Default session duration: 24 hours (seconds).
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 3600;

/// Token byte length before hex encoding (32 bytes = 64 hex chars).
const TOKEN_BYTES: usize = 32;

/// An active session.
#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: String,
    pub expires_at: i64,
}

/// SQLite-backed account store.
pub struct AccountStore {
    conn: Mutex<Connection>,
    session_ttl_secs: u64,
}

impl AccountStore {
    /// Open (or create) the account database at the given path.
    pub fn open(db_path: &Path, session_ttl_secs: Option<u64>) -> Result<Self, AccountError> {
        let conn = Connection::open(db_path)?;

        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                failed_attempts INTEGER NOT NULL DEFAULT 0,
                locked_until INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token_hash TEXT PRIMARY KEY,
                account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_account ON sessions(account_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            session_ttl_secs: session_ttl_secs.unwrap_or(DEFAULT_SESSION_TTL_SECS),
        })
    }

    // ── Accounts ────────────────────────────────────────────────────

    /// Create a new account in the initial unlocked state.
    ///
    /// Inputs are assumed pre-validated by the caller (non-empty name,
    /// well-formed email, password policy); uniqueness is enforced here via
    /// the `UNIQUE COLLATE NOCASE` constraint.
    pub fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, AccountError> {
        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password_hash: hash_password(password)?,
            failed_attempts: 0,
            locked_until: None,
            created_at: epoch_secs(),
            updated_at: epoch_secs(),
        };

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO accounts (id, name, email, password_hash, failed_attempts, locked_until, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                account.id,
                account.name,
                account.email,
                account.password_hash,
                account.failed_attempts,
                account.locked_until,
                account.created_at,
                account.updated_at,
            ],
        );

        match result {
            Ok(_) => Ok(account),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(AccountError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up an account by email (case-insensitive).
    pub fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let conn = self.conn.lock();
        Self::query_by_email(&conn, email)
    }

    /// Look up an account by id.
    pub fn get_account(&self, id: &str) -> Result<Option<Account>, AccountError> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
            rusqlite::params![id],
            map_account,
        );
        match row {
            Ok(account) => Ok(Some(account)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Evaluate a login attempt and persist the resulting account state.
    ///
    /// The connection lock is held for the entire read-modify-write, so the
    /// decision always runs against the freshest persisted record. `now` is
    /// injected rather than read here to keep outcomes reproducible in tests.
    ///
    /// Returns the outcome with the updated record, or
    /// [`AccountError::AccountNotFound`] when no account matches the email —
    /// that case never reaches the decision logic.
    pub fn login(
        &self,
        email: &str,
        password: &str,
        now: i64,
    ) -> Result<(LoginOutcome, Account), AccountError> {
        let conn = self.conn.lock();

        let Some(account) = Self::query_by_email(&conn, email)? else {
            return Err(AccountError::AccountNotFound);
        };

        let (outcome, mut updated) = evaluate_login(&account, password, now, verify_password);

        // A locked rejection leaves the record byte-for-byte as it was; only
        // evaluated attempts are written back.
        if outcome != LoginOutcome::Locked {
            updated.updated_at = now;
            conn.execute(
                "UPDATE accounts
                 SET failed_attempts = ?1, locked_until = ?2, updated_at = ?3
                 WHERE id = ?4",
                rusqlite::params![
                    updated.failed_attempts,
                    updated.locked_until,
                    updated.updated_at,
                    updated.id,
                ],
            )?;
        }

        if updated.locked_until != account.locked_until {
            if let Some(until) = updated.locked_until {
                tracing::warn!(
                    account_id = %updated.id,
                    locked_until = until,
                    "account locked after repeated failed login attempts"
                );
            }
        }

        Ok((outcome, updated))
    }

    /// Count registered accounts.
    pub fn account_count(&self) -> Result<u64, AccountError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn query_by_email(conn: &Connection, email: &str) -> Result<Option<Account>, AccountError> {
        let row = conn.query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1 COLLATE NOCASE"),
            rusqlite::params![email.trim()],
            map_account,
        );
        match row {
            Ok(account) => Ok(Some(account)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// Create a session for an authenticated account.
    /// Returns the plaintext token (only revealed once; storage keeps the hash).
    pub fn create_session(&self, account_id: &str) -> Result<String, AccountError> {
        let token = generate_token();
        let token_hash = hash_token(&token);
        let now = epoch_secs();
        let expires_at = now + self.session_ttl_secs as i64;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (token_hash, account_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![token_hash, account_id, now, expires_at],
        )?;

        Ok(token)
    }

    /// Validate a session token.
    /// Returns `None` if the token is unknown or expired.
    pub fn validate_session(&self, token: &str) -> Option<Session> {
        let token_hash = hash_token(token);
        let now = epoch_secs();

        let conn = self.conn.lock();
        conn.query_row(
            "SELECT account_id, expires_at FROM sessions
             WHERE token_hash = ?1 AND expires_at > ?2",
            rusqlite::params![token_hash, now],
            |row| {
                Ok(Session {
                    account_id: row.get(0)?,
                    expires_at: row.get(1)?,
                })
            },
        )
        .ok()
    }

    /// Revoke a session by token. Returns whether a session was removed.
    pub fn revoke_session(&self, token: &str) -> Result<bool, AccountError> {
        let token_hash = hash_token(token);
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE token_hash = ?1",
            rusqlite::params![token_hash],
        )?;
        Ok(deleted > 0)
    }

    /// Remove expired session rows.
    pub fn cleanup_expired_sessions(&self) -> Result<u64, AccountError> {
        let now = epoch_secs();
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            rusqlite::params![now],
        )?;
        Ok(deleted as u64)
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, name, email, password_hash, failed_attempts, locked_until, created_at, updated_at";

fn map_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        failed_attempts: row.get(4)?,
        locked_until: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Generate a random session token (hex-encoded).
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a session token (SHA-256, single pass — tokens are already high-entropy).
fn hash_token(token: &str) -> String {
    let mut h = Sha256::new();
    h.update(token.as_bytes());
    hex::encode(h.finalize())
}

/// Current Unix epoch in seconds.
pub fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::lockout::{LOCK_DURATION_SECS, MAX_FAILED_ATTEMPTS};
    use tempfile::TempDir;

    fn test_store() -> (TempDir, AccountStore) {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("accounts.db");
        let store = AccountStore::open(&db_path, Some(3600)).unwrap();
        (tmp, store)
    }

    fn seeded(store: &AccountStore) -> Account {
        store
            .create_account("Alice", "alice@example.com", "hunter2!")
            .unwrap()
    }

    #[test]
    fn create_and_find_by_email() {
        let (_tmp, store) = test_store();
        let created = seeded(&store);

        assert_eq!(created.failed_attempts, 0);
        assert_eq!(created.locked_until, None);

        let found = store.find_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "Alice");
    }

    #[test]
    fn find_is_case_insensitive() {
        let (_tmp, store) = test_store();
        seeded(&store);
        assert!(store.find_by_email("ALICE@Example.COM").unwrap().is_some());
    }

    #[test]
    fn duplicate_email_rejected_without_mutation() {
        let (_tmp, store) = test_store();
        let original = seeded(&store);

        let result = store.create_account("Impostor", "alice@example.com", "different1");
        assert!(matches!(result, Err(AccountError::DuplicateEmail)));

        // Case-insensitive uniqueness too.
        let result = store.create_account("Impostor", "ALICE@example.com", "different1");
        assert!(matches!(result, Err(AccountError::DuplicateEmail)));

        let stored = store.find_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(stored.name, original.name);
        assert_eq!(stored.password_hash, original.password_hash);
        assert_eq!(store.account_count().unwrap(), 1);
    }

    #[test]
    fn login_success_with_correct_password() {
        let (_tmp, store) = test_store();
        let created = seeded(&store);

        let now = epoch_secs();
        let (outcome, account) = store.login("alice@example.com", "hunter2!", now).unwrap();
        assert_eq!(outcome, LoginOutcome::Success);
        assert_eq!(account.id, created.id);
        assert_eq!(account.failed_attempts, 0);
    }

    #[test]
    fn login_unknown_email_is_account_not_found() {
        let (_tmp, store) = test_store();
        let result = store.login("ghost@example.com", "whatever1", epoch_secs());
        assert!(matches!(result, Err(AccountError::AccountNotFound)));
    }

    #[test]
    fn three_wrong_passwords_lock_the_account() {
        let (_tmp, store) = test_store();
        seeded(&store);
        let now = epoch_secs();

        let (outcome, account) = store.login("alice@example.com", "wrong", now).unwrap();
        assert_eq!(outcome, LoginOutcome::WrongPassword);
        assert_eq!(account.failed_attempts, 1);

        let (outcome, account) = store.login("alice@example.com", "wrong", now).unwrap();
        assert_eq!(outcome, LoginOutcome::WrongPassword);
        assert_eq!(account.failed_attempts, 2);

        // Third failure sets the lock; the call itself still reports
        // WrongPassword.
        let (outcome, account) = store.login("alice@example.com", "wrong", now).unwrap();
        assert_eq!(outcome, LoginOutcome::WrongPassword);
        assert_eq!(account.failed_attempts, 0);
        assert_eq!(account.locked_until, Some(now + LOCK_DURATION_SECS));

        // Persisted, not just returned.
        let stored = store.find_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(stored.locked_until, Some(now + LOCK_DURATION_SECS));

        // Fourth attempt is refused even with the correct password.
        let (outcome, _) = store.login("alice@example.com", "hunter2!", now + 1).unwrap();
        assert_eq!(outcome, LoginOutcome::Locked);
    }

    #[test]
    fn locked_attempt_leaves_record_untouched() {
        let (_tmp, store) = test_store();
        seeded(&store);
        let now = epoch_secs();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            store.login("alice@example.com", "wrong", now).unwrap();
        }
        let before = store.find_by_email("alice@example.com").unwrap().unwrap();

        store.login("alice@example.com", "wrong", now + 5).unwrap();
        let after = store.find_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn expired_lock_allows_login_and_clears_state() {
        let (_tmp, store) = test_store();
        seeded(&store);
        let now = epoch_secs();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            store.login("alice@example.com", "wrong", now).unwrap();
        }

        let after_expiry = now + LOCK_DURATION_SECS + 1;
        let (outcome, account) = store
            .login("alice@example.com", "hunter2!", after_expiry)
            .unwrap();
        assert_eq!(outcome, LoginOutcome::Success);
        assert_eq!(account.failed_attempts, 0);
        assert_eq!(account.locked_until, None);

        let stored = store.find_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(stored.locked_until, None);
    }

    #[test]
    fn get_account_by_id() {
        let (_tmp, store) = test_store();
        let created = seeded(&store);

        let fetched = store.get_account(&created.id).unwrap().unwrap();
        assert_eq!(fetched.email, "alice@example.com");
        assert!(store.get_account("nonexistent-id").unwrap().is_none());
    }

    #[test]
    fn session_create_validate_revoke() {
        let (_tmp, store) = test_store();
        let created = seeded(&store);

        let token = store.create_session(&created.id).unwrap();
        assert!(!token.is_empty());

        let session = store.validate_session(&token).unwrap();
        assert_eq!(session.account_id, created.id);

        assert!(store.revoke_session(&token).unwrap());
        assert!(store.validate_session(&token).is_none());
        assert!(!store.revoke_session(&token).unwrap());
    }

    #[test]
    fn session_invalid_token_returns_none() {
        let (_tmp, store) = test_store();
        assert!(store.validate_session("bogus_token_value").is_none());
    }

    #[test]
    fn expired_sessions_are_rejected_and_cleaned_up() {
        let tmp = TempDir::new().unwrap();
        let store = AccountStore::open(&tmp.path().join("accounts.db"), Some(0)).unwrap();
        let created = store
            .create_account("Bob", "bob@example.com", "secret1")
            .unwrap();

        // TTL of zero: expired the moment it is created.
        let token = store.create_session(&created.id).unwrap();
        assert!(store.validate_session(&token).is_none());

        assert_eq!(store.cleanup_expired_sessions().unwrap(), 1);
        assert_eq!(store.cleanup_expired_sessions().unwrap(), 0);
    }

    #[test]
    fn account_count_tracks_registrations() {
        let (_tmp, store) = test_store();
        assert_eq!(store.account_count().unwrap(), 0);
        seeded(&store);
        assert_eq!(store.account_count().unwrap(), 1);
    }

    #[test]
    fn login_updates_bookkeeping_timestamp() {
        let (_tmp, store) = test_store();
        let created = seeded(&store);

        let later = created.updated_at + 100;
        store.login("alice@example.com", "wrong", later).unwrap();
        let stored = store.find_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(stored.updated_at, later);
        assert_eq!(stored.created_at, created.created_at);
    }
}
