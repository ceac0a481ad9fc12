//! Error types for the tracklist-dl library.

use thiserror::Error;

/// Reason an operation was refused by the session gate or the run lock.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locked {
    /// No login outcome has been delivered yet.
    #[error("not logged in")]
    NotAuthenticated,
    /// The login was rejected; the session stays disabled.
    #[error("login was rejected for this session")]
    SessionRejected,
    /// A run is in progress and the selection may not be edited.
    #[error("a download run is in progress")]
    RunInProgress,
}

/// Errors that can occur while curating or downloading a selection.
#[derive(Error, Debug)]
pub enum Error {
    /// Pasted text is not a recognised catalog link.
    #[error("Not a catalog link: {0}")]
    InvalidLink(String),

    /// Catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// A single item download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// The login handshake itself failed (not a rejected login).
    #[error("Login failed: {0}")]
    Login(String),

    /// The session gate already received its one login outcome.
    #[error("Session outcome was already delivered")]
    SessionAlreadyResolved,

    /// Operation refused by the gate or the run lock.
    #[error("Operation not allowed: {0}")]
    Locked(#[from] Locked),

    /// The orchestrator service has shut down.
    #[error("Download service is no longer running")]
    ServiceStopped,

    /// Download was cancelled.
    #[error("Download cancelled")]
    Cancelled,

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized.
    #[error("Could not write configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}

/// A specialized `Result` type for tracklist-dl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_converts_into_error() {
        let err: Error = Locked::RunInProgress.into();
        assert!(matches!(err, Error::Locked(Locked::RunInProgress)));
        assert_eq!(
            err.to_string(),
            "Operation not allowed: a download run is in progress"
        );
    }

    #[test]
    fn locked_reasons_display() {
        assert_eq!(Locked::NotAuthenticated.to_string(), "not logged in");
        assert_eq!(
            Locked::SessionRejected.to_string(),
            "login was rejected for this session"
        );
    }

    #[test]
    fn invalid_link_message_keeps_input() {
        let err = Error::InvalidLink("https://example.com".to_string());
        assert_eq!(err.to_string(), "Not a catalog link: https://example.com");
    }
}
