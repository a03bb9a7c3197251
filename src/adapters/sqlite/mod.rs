//! SQLite adapter: Implementation of CredentialStore.
//!
//! Provides local persistence for registered users.
//!
//! # Security
//!
//! Passwords are hashed before they reach the database:
//! - Argon2id with a random per-user salt (PHC string in `password`)
//! - Legacy unsalted SHA-256 rows still verify and are upgraded on login
//!
//! # Concurrency
//!
//! The connection is protected by a `Mutex`. Username uniqueness is enforced
//! by the `PRIMARY KEY` constraint inside the INSERT itself, so two
//! registrations racing for one name (even through separate connections to
//! the same file) cannot both succeed.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::domain::credential::{self, CredentialError, HashParams};
use crate::domain::{User, TIMESTAMP_FORMAT};
use crate::ports::CredentialStore;

/// How long a writer waits on another connection's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Credential store unavailable: {0}")]
    Unavailable(String),

    #[error("Username already exists: {0}")]
    DuplicateUser(String),

    #[error("Password hashing failed: {0}")]
    Credential(#[from] CredentialError),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StorageError {
    /// Lock contention and open failures mean the store is unreachable right
    /// now, not that the request was wrong.
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen) => {
                Self::Unavailable(e.to_string())
            }
            _ => Self::Database(e),
        }
    }
}

/// SQLite credential store.
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
    hash_params: HashParams,
}

impl SqliteCredentialStore {
    /// Open (or create) the user database at `path`.
    ///
    /// # Errors
    /// Returns `Unavailable` if the database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(StorageError::Unavailable(format!(
                    "directory {} does not exist",
                    parent.display()
                )));
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_connection(conn)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Mutex::new(conn),
            hash_params: HashParams::default(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Override the Argon2 cost parameters used for new hashes.
    #[must_use]
    pub fn with_hash_params(mut self, params: HashParams) -> Self {
        self.hash_params = params;
        self
    }

    /// Override how long a writer waits on another connection's lock.
    ///
    /// # Errors
    /// Returns error if the connection rejects the setting.
    pub fn with_busy_timeout(self, timeout: Duration) -> Result<Self, StorageError> {
        {
            let conn = self.conn()?;
            conn.busy_timeout(timeout)?;
        }
        Ok(self)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".into()))
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    fn stored_hash(&self, username: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let hash = conn
            .query_row(
                "SELECT password FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// Replace a legacy digest with a salted hash after a successful login.
    fn upgrade_hash(&self, username: &str, password: &str) -> Result<(), StorageError> {
        let new_hash = credential::hash_password(password, &self.hash_params)?;
        let conn = self.conn()?;
        conn.execute(
            "UPDATE users SET password = ?1 WHERE username = ?2",
            params![new_hash, username],
        )?;
        tracing::info!("Upgraded legacy password hash");
        Ok(())
    }
}

impl CredentialStore for SqliteCredentialStore {
    type Error = StorageError;

    fn register(
        &self,
        username: &str,
        password: &str,
        name: &str,
        email: &str,
    ) -> Result<(), Self::Error> {
        // Hash before taking the lock; Argon2 is deliberately slow.
        let password_hash = credential::hash_password(password, &self.hash_params)?;
        let created_at = Utc::now().format(TIMESTAMP_FORMAT).to_string();

        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO users (username, password, name, email, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![username, password_hash, name, email, created_at],
        );

        match inserted {
            Ok(_) => {
                tracing::info!("Registered new user");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                tracing::debug!("Registration rejected: username taken");
                Err(StorageError::DuplicateUser(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn verify(&self, username: &str, password: &str) -> Result<bool, Self::Error> {
        let Some(stored) = self.stored_hash(username)? else {
            credential::dummy_verify(password, &self.hash_params);
            return Ok(false);
        };

        let ok = match credential::verify_password(password, &stored) {
            Ok(ok) => ok,
            Err(CredentialError::InvalidFormat) => {
                tracing::warn!("Stored password hash has an unrecognized format");
                false
            }
            Err(e) => return Err(e.into()),
        };

        if ok && credential::needs_rehash(&stored) {
            if let Err(e) = self.upgrade_hash(username, password) {
                tracing::warn!("Failed to upgrade legacy password hash: {e}");
            }
        }

        Ok(ok)
    }

    fn find_user(&self, username: &str) -> Result<Option<User>, Self::Error> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                "SELECT username, password, name, email, created_at FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((username, password_hash, display_name, email, created_at_str)) = row else {
            return Ok(None);
        };

        let created_at = User::parse_created_at(&created_at_str).ok_or_else(|| {
            StorageError::Corrupt(format!("unparseable created_at {created_at_str:?}"))
        })?;

        Ok(Some(User {
            username,
            password_hash,
            display_name,
            email,
            created_at,
        }))
    }

    fn count_users(&self) -> Result<usize, Self::Error> {
        let conn = self.conn()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

        Ok(usize::try_from(count).unwrap_or(0))
    }
}
