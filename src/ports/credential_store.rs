//! Credential store port: Trait for user persistence.
//!
//! This trait abstracts the storage backend (SQLite) from the auth service.

use crate::domain::User;

/// Trait for credential storage operations.
///
/// Implementations hash passwords themselves; plaintext never reaches the
/// backing store.
pub trait CredentialStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert a new user.
    ///
    /// Uniqueness of `username` must be enforced by the backend in the same
    /// atomic operation as the insert.
    ///
    /// # Errors
    /// Returns a duplicate-user error if `username` is taken, or a storage
    /// error if the backend fails.
    fn register(
        &self,
        username: &str,
        password: &str,
        name: &str,
        email: &str,
    ) -> Result<(), Self::Error>;

    /// Check a username/password pair.
    ///
    /// # Returns
    /// `false` both for unknown users and wrong passwords.
    ///
    /// # Errors
    /// Returns error only if the backend fails.
    fn verify(&self, username: &str, password: &str) -> Result<bool, Self::Error>;

    /// Load a user's profile.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn find_user(&self, username: &str) -> Result<Option<User>, Self::Error>;

    /// Number of registered users.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count_users(&self) -> Result<usize, Self::Error>;
}
