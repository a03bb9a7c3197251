//! Authentication service: registration, login and logout.
//!
//! Wraps a [`CredentialStore`] and the explicit [`Session`] that replaces
//! global "logged in" state.

use std::sync::Arc;

use crate::adapters::StorageError;
use crate::domain::{RegistrationForm, Session, User};
use crate::ports::CredentialStore;
use crate::{Result, SleepInsightError};

fn store_error<E: Into<StorageError>>(e: E) -> SleepInsightError {
    let e: StorageError = e.into();
    e.into()
}

/// Service for user registration and login.
pub struct AuthService<S>
where
    S: CredentialStore,
{
    store: Arc<S>,
}

impl<S> AuthService<S>
where
    S: CredentialStore,
    S::Error: Into<StorageError>,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Register a new user from the submitted form.
    ///
    /// # Errors
    /// Returns `Validation` for an incomplete or mismatched form (nothing is
    /// stored), `DuplicateUser` if the username is taken, and
    /// `StoreUnavailable` if the store cannot be reached.
    pub fn register(&self, form: &RegistrationForm) -> Result<()> {
        form.validate().map_err(SleepInsightError::Validation)?;

        let username = form.username.trim();
        self.store
            .register(username, &form.password, form.name.trim(), form.email.trim())
            .map_err(store_error)?;

        tracing::info!("Registered user {}", username);
        Ok(())
    }

    /// Verify credentials and mark the session as logged in.
    ///
    /// # Errors
    /// Returns `InvalidCredentials` for an unknown user or wrong password
    /// (the two are indistinguishable), or a store error.
    pub fn login(&self, session: &mut Session, username: &str, password: &str) -> Result<()> {
        let username = username.trim();
        let ok = self
            .store
            .verify(username, password)
            .map_err(store_error)?;

        if !ok {
            tracing::warn!("Failed login attempt");
            return Err(SleepInsightError::InvalidCredentials);
        }

        session.sign_in(username);
        tracing::info!("User {} logged in", username);
        Ok(())
    }

    pub fn logout(&self, session: &mut Session) {
        if let Some(username) = session.username() {
            tracing::info!("User {} logged out", username);
        }
        session.sign_out();
    }

    /// Profile metadata for a registered user.
    ///
    /// # Errors
    /// Returns error if the store operation fails.
    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.store
            .find_user(username)
            .map_err(store_error)
    }

    /// Number of registered users.
    ///
    /// # Errors
    /// Returns error if the store operation fails.
    pub fn user_count(&self) -> Result<usize> {
        self.store
            .count_users()
            .map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteCredentialStore;
    use crate::domain::credential::HashParams;
    use crate::domain::Page;

    fn create_test_service() -> AuthService<SqliteCredentialStore> {
        let store = SqliteCredentialStore::in_memory()
            .expect("Should create db")
            .with_hash_params(HashParams::insecure_fast());
        AuthService::new(Arc::new(store))
    }

    fn form(username: &str, password: &str) -> RegistrationForm {
        RegistrationForm {
            name: "Grace Hopper".into(),
            username: username.into(),
            email: "grace@example.com".into(),
            password: password.into(),
            confirm_password: password.into(),
        }
    }

    #[test]
    fn test_register_then_login() {
        let auth = create_test_service();
        auth.register(&form("grace", "cobol-1959")).expect("register");

        let mut session = Session::new();
        session.navigate(Page::Login);
        auth.login(&mut session, "grace", "cobol-1959").expect("login");
        assert_eq!(session.require_user(), Ok("grace"));
        assert_eq!(session.page(), Page::Home);

        auth.logout(&mut session);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_wrong_password_and_unknown_user_look_the_same() {
        let auth = create_test_service();
        auth.register(&form("grace", "cobol-1959")).expect("register");

        let mut session = Session::new();
        let wrong = auth.login(&mut session, "grace", "fortran").unwrap_err();
        let unknown = auth.login(&mut session, "alan", "cobol-1959").unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, SleepInsightError::InvalidCredentials));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_duplicate_registration() {
        let auth = create_test_service();
        auth.register(&form("grace", "first")).expect("register");

        let err = auth.register(&form("grace", "second")).unwrap_err();
        assert!(matches!(err, SleepInsightError::DuplicateUser(ref u) if u == "grace"));
        assert!(err.is_recoverable());

        let mut session = Session::new();
        assert!(auth.login(&mut session, "grace", "first").is_ok());
        assert_eq!(auth.user_count().expect("count"), 1);
    }

    #[test]
    fn test_invalid_form_is_not_stored() {
        let auth = create_test_service();

        let mut mismatched = form("grace", "one");
        mismatched.confirm_password = "two".into();
        let err = auth.register(&mismatched).unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match.");

        let mut blank = form("grace", "one");
        blank.name = String::new();
        assert!(matches!(
            auth.register(&blank),
            Err(SleepInsightError::Validation(_))
        ));

        assert_eq!(auth.user_count().expect("count"), 0);
    }

    #[test]
    fn test_find_user_profile() {
        let auth = create_test_service();
        auth.register(&form("grace", "cobol-1959")).expect("register");

        let user = auth.find_user("grace").expect("lookup").expect("exists");
        assert_eq!(user.display_name, "Grace Hopper");
        assert_eq!(user.email, "grace@example.com");
        assert!(auth.find_user("alan").expect("lookup").is_none());
    }
}
