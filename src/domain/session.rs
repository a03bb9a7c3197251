//! Per-client session state.
//!
//! Holds who is logged in and which page the client is on. Handlers receive
//! it explicitly; the credential store and the orchestrator never see it.

/// Pages a client can be on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Page {
    #[default]
    Home,
    Login,
    Register,
    Predict,
}

/// Session state for one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    username: Option<String>,
    page: Page,
}

/// Returned when an operation needs a logged-in session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Please login to access the prediction tool")]
pub struct NotAuthenticated;

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(&self) -> Page {
        self.page
    }

    pub fn navigate(&mut self, page: Page) {
        self.page = page;
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    /// The logged-in user.
    ///
    /// # Errors
    /// Returns `NotAuthenticated` for an anonymous session.
    pub fn require_user(&self) -> Result<&str, NotAuthenticated> {
        self.username().ok_or(NotAuthenticated)
    }

    /// Mark the session as logged in and send it home.
    pub(crate) fn sign_in(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
        self.page = Page::Home;
    }

    /// Clear the user and send the session home.
    pub fn sign_out(&mut self) {
        self.username = None;
        self.page = Page::Home;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_anonymous() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert_eq!(session.page(), Page::Home);
        assert_eq!(session.require_user(), Err(NotAuthenticated));
    }

    #[test]
    fn test_sign_in_and_out() {
        let mut session = Session::new();
        session.navigate(Page::Login);
        session.sign_in("ada");
        assert_eq!(session.require_user(), Ok("ada"));
        assert_eq!(session.page(), Page::Home);

        session.navigate(Page::Predict);
        session.sign_out();
        assert!(session.username().is_none());
        assert_eq!(session.page(), Page::Home);
    }
}
