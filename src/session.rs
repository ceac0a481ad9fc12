//! Session gate: whether the remote service accepted our login.

use async_trait::async_trait;

use crate::error::{Error, Locked, Result};

/// Login outcome for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No outcome delivered yet.
    #[default]
    Unknown,
    Authenticated,
    /// Terminal for the session; nothing may run.
    Rejected,
}

/// Username and password for the remote service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Performs the login handshake with the remote service.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns whether the service accepted the credentials, e.g. `false` when
    /// the account lacks the entitlement required to download.
    async fn login(&self, credentials: &Credentials) -> Result<bool>;
}

/// Tracks the one login outcome of a session and gates operations on it.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    state: AuthState,
}

impl SessionGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> AuthState {
        self.state
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Delivers the login outcome. A session resolves exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionAlreadyResolved`] if an outcome was already
    /// delivered.
    pub fn resolve(&mut self, accepted: bool) -> Result<AuthState> {
        if self.state != AuthState::Unknown {
            return Err(Error::SessionAlreadyResolved);
        }
        self.state = if accepted {
            AuthState::Authenticated
        } else {
            AuthState::Rejected
        };
        Ok(self.state)
    }

    /// Runs the login handshake and resolves the gate with its outcome. A
    /// failed handshake counts as a rejected login.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionAlreadyResolved`] without contacting the
    /// service if an outcome was already delivered.
    pub async fn authenticate(
        &mut self,
        authenticator: &dyn Authenticator,
        credentials: &Credentials,
    ) -> Result<AuthState> {
        if self.state != AuthState::Unknown {
            return Err(Error::SessionAlreadyResolved);
        }
        let accepted = login_outcome(authenticator, credentials).await;
        self.resolve(accepted)
    }

    /// Fails unless the session is authenticated.
    ///
    /// # Errors
    ///
    /// Returns the [`Locked`] reason when the gate is closed.
    pub const fn check(&self) -> std::result::Result<(), Locked> {
        match self.state {
            AuthState::Authenticated => Ok(()),
            AuthState::Unknown => Err(Locked::NotAuthenticated),
            AuthState::Rejected => Err(Locked::SessionRejected),
        }
    }
}

/// Calls the authenticator and folds handshake errors into a rejection.
async fn login_outcome(authenticator: &dyn Authenticator, credentials: &Credentials) -> bool {
    match authenticator.login(credentials).await {
        Ok(accepted) => {
            if accepted {
                log::info!("Login successful");
            } else {
                log::error!("Login rejected for {}", credentials.username);
            }
            accepted
        }
        Err(e) => {
            log::error!("Login failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockAuthenticator {
        outcome: Option<bool>,
        calls: AtomicUsize,
    }

    impl MockAuthenticator {
        fn new(outcome: Option<bool>) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Authenticator for MockAuthenticator {
        async fn login(&self, _credentials: &Credentials) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.outcome
                .ok_or_else(|| Error::Login("connection reset".to_string()))
        }
    }

    fn creds() -> Credentials {
        Credentials::new("user", "hunter2")
    }

    #[test]
    fn starts_unknown_and_closed() {
        let gate = SessionGate::new();
        assert_eq!(gate.state(), AuthState::Unknown);
        assert!(!gate.is_open());
        assert_eq!(gate.check(), Err(Locked::NotAuthenticated));
    }

    #[test]
    fn resolves_exactly_once() {
        let mut gate = SessionGate::new();
        assert_eq!(gate.resolve(true).unwrap(), AuthState::Authenticated);
        assert!(gate.is_open());
        assert!(matches!(gate.resolve(false), Err(Error::SessionAlreadyResolved)));
        assert!(gate.is_open());
    }

    #[test]
    fn rejection_is_terminal() {
        let mut gate = SessionGate::new();
        gate.resolve(false).unwrap();
        assert_eq!(gate.check(), Err(Locked::SessionRejected));
        assert!(gate.resolve(true).is_err());
        assert_eq!(gate.state(), AuthState::Rejected);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let shown = format!("{:?}", creds());
        assert!(shown.contains("user"));
        assert!(!shown.contains("hunter2"));
    }

    #[tokio::test]
    async fn authenticate_accepted() {
        let auth = MockAuthenticator::new(Some(true));
        let mut gate = SessionGate::new();
        let state = gate.authenticate(&auth, &creds()).await.unwrap();
        assert_eq!(state, AuthState::Authenticated);
    }

    #[tokio::test]
    async fn authenticate_handshake_error_rejects() {
        let auth = MockAuthenticator::new(None);
        let mut gate = SessionGate::new();
        let state = gate.authenticate(&auth, &creds()).await.unwrap();
        assert_eq!(state, AuthState::Rejected);
    }

    #[tokio::test]
    async fn second_authenticate_does_not_contact_service() {
        let auth = MockAuthenticator::new(Some(false));
        let mut gate = SessionGate::new();
        gate.authenticate(&auth, &creds()).await.unwrap();
        assert!(gate.authenticate(&auth, &creds()).await.is_err());
        assert_eq!(auth.calls.load(Ordering::Relaxed), 1);
    }
}
