//! Registered user profile and registration input.

use chrono::{DateTime, NaiveDateTime, Utc};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Storage format of `created_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A registered user as held by the credential store.
///
/// `Debug` never prints the password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub(crate) password_hash: String,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Render `created_at` in the stored text format.
    #[must_use]
    pub fn created_at_text(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Parse a stored `created_at` value.
    ///
    /// Accepts the storage format and RFC 3339.
    #[must_use]
    pub fn parse_created_at(text: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(text)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
            })
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Fields collected by the registration form.
///
/// Password fields are wiped on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct RegistrationForm {
    #[zeroize(skip)]
    pub name: String,
    #[zeroize(skip)]
    pub username: String,
    #[zeroize(skip)]
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Check the form before anything is stored.
    ///
    /// # Errors
    /// Returns a user-facing message for the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let blank = |s: &str| s.trim().is_empty();
        if blank(&self.name) || blank(&self.username) || blank(&self.email) || self.password.is_empty()
        {
            return Err("Please fill in all fields.".to_string());
        }
        if self.password != self.confirm_password {
            return Err("Passwords do not match.".to_string());
        }
        Ok(())
    }
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
